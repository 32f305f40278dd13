//! Store Module
//!
//! An ordered, self-refreshing view over the expiring cache.

mod fetcher;
mod indexed;

pub use fetcher::{Fetcher, Record};
pub use indexed::{IndexedStore, StoreOptions};
