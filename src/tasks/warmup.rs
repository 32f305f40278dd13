//! Warm-up Task
//!
//! Fills an [`IndexedStore`] from the origin's listing pages on start.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::CacheError;
use crate::store::{Fetcher, IndexedStore, Record};

/// Spawns a task that streams up to `pages` listing pages from the origin
/// and upserts each record as it arrives.
///
/// A listing failure is forwarded to the store's error stream; records
/// already stored are kept.
pub fn spawn_warm_up<F: Fetcher>(store: Arc<IndexedStore<F>>, pages: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting warm-up with {} pages per listing", pages);

        let (tx, mut rx) = mpsc::channel::<F::Value>(1);

        let fetch = store.fetcher().fetch_many(pages, tx);
        let store_all = async {
            let mut stored = 0usize;
            while let Some(value) = rx.recv().await {
                let key = value.key();
                match store.upsert(value).await {
                    Ok(_) => {
                        stored += 1;
                        debug!(key, "warm-up - record fetched and stored");
                    }
                    Err(err) => store.forward(err).await,
                }
            }
            stored
        };

        let (fetched, stored) = tokio::join!(fetch, store_all);
        if let Err(err) = fetched {
            store.forward(CacheError::FetchFailed(err)).await;
        }

        info!("Warm-up finished: {} records stored", stored);
    })
}
