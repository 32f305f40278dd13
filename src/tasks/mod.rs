//! Background Tasks Module
//!
//! Long-running tasks that consume the cache's event streams.
//!
//! # Tasks
//! - Refresh listener: re-fetches records whose refresh interval elapsed
//! - Warm-up: fills the store from the origin's listing on start
//! - Error logger: drains an error stream into the log

mod errors;
mod refresh;
mod warmup;

pub use errors::spawn_error_logger;
pub use refresh::spawn_refresh_listener;
pub use warmup::spawn_warm_up;
