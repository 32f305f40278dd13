//! Fetcher Contract
//!
//! The origin capability an [`IndexedStore`](super::IndexedStore) refreshes
//! from, and the record shape it indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::cache::Key;

// == Record ==
/// A value the store can key and order.
pub trait Record: Send + Sync + 'static {
    /// Identity used as the cache key.
    fn key(&self) -> Key;

    /// Last modification time, used to order the index.
    /// `None` means the record cannot be ordered.
    fn updated_at(&self) -> Option<DateTime<Utc>>;
}

// == Fetcher ==
/// Retrieves records from their origin.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    type Value: Record;

    /// Fetches the current version of one record.
    async fn fetch_one(&self, key: Key) -> anyhow::Result<Self::Value>;

    /// Streams records discovered across up to `max_pages` listing pages
    /// into `results`, as they are produced.
    ///
    /// May fail partway; records already sent stay valid.
    async fn fetch_many(
        &self,
        max_pages: usize,
        results: mpsc::Sender<Self::Value>,
    ) -> anyhow::Result<()>;
}
