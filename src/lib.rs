//! Refresh Cache - A self-expiring, per-key refreshable in-memory cache
//!
//! Every entry carries its own expiration deadline and refresh ticker. An
//! indexed store on top keeps records ordered by last update and re-fetches
//! them from their origin whenever they come due.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod origin;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheConfig, ExpiringCache, Key};
pub use config::Config;
pub use error::{CacheError, Result};
pub use origin::HttpFetcher;
pub use store::{Fetcher, IndexedStore, Record, StoreOptions};
pub use tasks::spawn_error_logger;
