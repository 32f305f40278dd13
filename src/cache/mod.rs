//! Cache Module
//!
//! Provides the self-expiring, per-key refreshable in-memory cache.

mod entry;
mod expiring;
mod schedule;
mod stats;


// Re-export public types
pub use entry::{Deadline, Expiry};
pub use expiring::{CacheConfig, ExpiringCache};
pub use stats::CacheStats;

/// Integer key identifying a cached value.
pub type Key = u64;
