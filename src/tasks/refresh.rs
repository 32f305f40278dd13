//! Refresh Listener Task
//!
//! Consumes the cache's refresh-due and expiration streams on behalf of an
//! [`IndexedStore`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Key;
use crate::error::CacheError;
use crate::store::{Fetcher, IndexedStore};

/// Spawns the store's refresh listener.
///
/// For every refresh-due key the record is fetched again and upserted,
/// which refreshes both the value and its index position. Fetch failures
/// and cache expirations go to the store's error stream. The task ends once
/// the cache closes its streams on terminate.
pub fn spawn_refresh_listener<F: Fetcher>(
    store: Arc<IndexedStore<F>>,
    mut notify: mpsc::Receiver<Key>,
    mut expired: mpsc::Receiver<CacheError>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting refresh listener");

        loop {
            tokio::select! {
                key = notify.recv() => {
                    let Some(key) = key else { break };
                    refresh(&store, key).await;
                }
                err = expired.recv() => {
                    let Some(err) = err else { break };
                    if let CacheError::EntryExpired { key } = err {
                        store.forget(key).await;
                    }
                    store.forward(err).await;
                }
            }
        }

        info!("Refresh listener stopped");
    })
}

async fn refresh<F: Fetcher>(store: &IndexedStore<F>, key: Key) {
    let value = match store.fetcher().fetch_one(key).await {
        Ok(value) => value,
        Err(err) => {
            store.forward(CacheError::FetchFailed(err)).await;
            return;
        }
    };

    match store.upsert(value).await {
        Ok(_) => debug!(key, "update notification - record fetched and updated"),
        Err(err) => store.forward(err).await,
    }
}
