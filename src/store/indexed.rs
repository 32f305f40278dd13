//! Indexed Store Module
//!
//! Keeps an ordered index over the records held in an [`ExpiringCache`] and
//! refreshes them from a [`Fetcher`] whenever the cache reports them due.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fetcher::{Fetcher, Record};
use crate::cache::{ExpiringCache, Key};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_refresh_listener, spawn_warm_up};

// == Store Options ==
/// Start-up options for an [`IndexedStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Listing pages to fetch on start; 0 disables warm-up
    pub warm_up_pages: usize,
    /// Capacity of the store error stream
    pub error_buffer: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            warm_up_pages: 0,
            error_buffer: 16,
        }
    }
}

// == Indexed Store ==
/// Records cached by key, listed newest first.
///
/// The index holds keys only and always dereferences through the cache, so
/// it may briefly name a key the cache no longer has; such keys are skipped
/// when listing.
///
/// A background listener turns refresh-due keys into origin fetches and
/// forwards cache expirations onto [`IndexedStore::errors`]. Call
/// [`IndexedStore::terminate`] to stop it.
pub struct IndexedStore<F: Fetcher> {
    cache: Arc<ExpiringCache<Arc<F::Value>>>,
    fetcher: F,
    /// Keys ordered by `updated_at`, oldest first
    index: RwLock<Vec<Key>>,
    errors_tx: mpsc::Sender<CacheError>,
    errors_rx: Mutex<Option<mpsc::Receiver<CacheError>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<F: Fetcher> IndexedStore<F> {
    // == Constructor ==
    /// Builds the store on top of `cache` and starts its refresh listener
    /// (and the warm-up, if requested).
    ///
    /// Claims both of the cache's event streams; fails with
    /// [`CacheError::StreamClaimed`] if either was already taken.
    pub fn start(
        cache: Arc<ExpiringCache<Arc<F::Value>>>,
        fetcher: F,
        options: StoreOptions,
    ) -> Result<Arc<Self>> {
        let notify = cache.notify()?;
        let expired = cache.errors()?;
        let (errors_tx, errors_rx) = mpsc::channel(options.error_buffer.max(1));

        let store = Arc::new(Self {
            cache,
            fetcher,
            index: RwLock::new(Vec::new()),
            errors_tx,
            errors_rx: Mutex::new(Some(errors_rx)),
            tasks: Mutex::new(Vec::new()),
        });

        let mut tasks = vec![spawn_refresh_listener(Arc::clone(&store), notify, expired)];
        if options.warm_up_pages > 0 {
            tasks.push(spawn_warm_up(Arc::clone(&store), options.warm_up_pages));
        }
        *store.tasks.lock().unwrap_or_else(PoisonError::into_inner) = tasks;

        Ok(store)
    }

    /// The wrapped cache.
    pub fn cache(&self) -> &ExpiringCache<Arc<F::Value>> {
        &self.cache
    }

    pub(crate) fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // == Upsert ==
    /// Caches `value` under its own key, indexes the key if it is new, and
    /// re-sorts the index.
    pub async fn upsert(&self, value: F::Value) -> Result<Arc<F::Value>> {
        let key = value.key();
        let value = Arc::new(value);
        self.cache.set(key, Arc::clone(&value)).await?;

        let mut index = self.index.write().await;
        if !index.contains(&key) {
            index.push(key);
        }
        // The value may have changed even for a known key.
        self.reindex(&mut index).await;

        Ok(value)
    }

    /// Stable sort by `updated_at`, oldest first.
    ///
    /// Keys missing from the cache and records without a timestamp sort as
    /// the oldest; the latter are reported as [`CacheError::TypeMismatch`].
    async fn reindex(&self, index: &mut Vec<Key>) {
        let values = self.cache.peek_many(index.as_slice()).await;

        let mut ordered: Vec<_> = index
            .iter()
            .zip(values)
            .map(|(&key, value)| {
                let updated_at = value.and_then(|value| {
                    let updated_at = value.updated_at();
                    if updated_at.is_none() {
                        self.report(CacheError::TypeMismatch { key });
                    }
                    updated_at
                });
                (updated_at, key)
            })
            .collect();
        ordered.sort_by_key(|(updated_at, _)| *updated_at);

        index.clear();
        index.extend(ordered.into_iter().map(|(_, key)| key));
    }

    // == Get Or Fetch ==
    /// Returns the cached record, or fetches, stores and returns it.
    ///
    /// Fetch errors come back as [`CacheError::FetchFailed`] with the
    /// fetcher's message intact.
    pub async fn get_or_fetch(&self, key: Key) -> Result<Arc<F::Value>> {
        if let Some(value) = self.cache.get(key).await {
            return Ok(value);
        }

        debug!(key, "cache miss, fetching from origin");
        let value = self.fetcher.fetch_one(key).await?;
        self.upsert(value).await
    }

    // == List ==
    /// Returns up to `limit` records, newest first, skipping the `offset`
    /// newest.
    ///
    /// `limit == 0` yields an empty list. An `offset` past the end of the
    /// index fails with [`CacheError::OffsetOutOfRange`]. Indexed keys no
    /// longer in the cache are skipped before `limit` applies, so a page is
    /// only short when the index runs out. Listed records get a keep-alive
    /// read.
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Arc<F::Value>>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let candidates: Vec<Key> = {
            let index = self.index.read().await;
            if offset > index.len() {
                return Err(CacheError::OffsetOutOfRange {
                    offset,
                    len: index.len(),
                });
            }
            index.iter().rev().skip(offset).copied().collect()
        };

        let keys: Vec<Key> = candidates
            .iter()
            .zip(self.cache.peek_many(&candidates).await)
            .filter_map(|(&key, value)| value.map(|_| key))
            .take(limit)
            .collect();

        Ok(self
            .cache
            .get_many(&keys)
            .await
            .into_iter()
            .flatten()
            .collect())
    }

    // == Remove ==
    /// Drops `key` from the index and the cache.
    pub async fn remove(&self, key: Key) -> Result<()> {
        let mut index = self.index.write().await;
        let position = index
            .iter()
            .position(|&indexed| indexed == key)
            .ok_or(CacheError::NotFound(key))?;
        index.remove(position);
        self.cache.delete(key).await;
        Ok(())
    }

    /// Drops an expired key from the index unless it was stored again.
    pub(crate) async fn forget(&self, key: Key) {
        let mut index = self.index.write().await;
        if self.cache.peek(key).await.is_none() {
            index.retain(|&indexed| indexed != key);
        }
    }

    /// Number of indexed keys.
    pub async fn index_len(&self) -> usize {
        self.index.read().await.len()
    }

    // == Errors ==
    /// Hands out the store error stream: fetch failures, forwarded cache
    /// expirations and ordering problems. Single consumer.
    pub fn errors(&self) -> Result<mpsc::Receiver<CacheError>> {
        self.errors_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CacheError::StreamClaimed("store errors"))
    }

    /// Sends onto the error stream, waiting for room.
    pub(crate) async fn forward(&self, err: CacheError) {
        let _ = self.errors_tx.send(err).await;
    }

    /// Sends onto the error stream without waiting; used while the index
    /// lock is held.
    fn report(&self, err: CacheError) {
        if let Err(err) = self.errors_tx.try_send(err) {
            warn!("store error stream full, dropping: {}", err.into_inner());
        }
    }

    // == Terminate ==
    /// Terminates the cache, then stops the store's background tasks.
    pub async fn terminate(&self) {
        self.cache.terminate().await;

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task.abort();
            let _ = task.await;
        }

        info!("store terminated");
    }
}
