//! Expiring Cache Module
//!
//! Key-value storage where every entry carries its own expiration deadline
//! and refresh ticker, driven by a dedicated background task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinSet;
use tokio::time::Duration;
use tracing::{debug, info};

use super::entry::{Deadline, Entry};
use super::schedule::Schedule;
use super::stats::{CacheStats, StatsRecorder};
use super::Key;
use crate::error::{CacheError, Result};

// == Stream Capacities ==
/// Refresh notifications are handed over one at a time.
const NOTIFY_BUFFER: usize = 1;

/// One slot so an expiring task never deadlocks against its own removal.
const EXPIRED_BUFFER: usize = 1;

// == Cache Config ==
/// Immutable cache-wide settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Time-to-live after the last read
    pub expiration: Duration,
    /// Period between refresh notifications for one key
    pub refresh_interval: Duration,
}

impl CacheConfig {
    pub fn new(expiration: Duration, refresh_interval: Duration) -> Self {
        Self {
            expiration,
            refresh_interval,
        }
    }

    /// Rejects zero durations.
    pub fn validate(&self) -> Result<()> {
        if self.expiration.is_zero() {
            return Err(CacheError::InvalidConfig(
                "expiration must be greater than zero".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "refresh interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// == Shared State ==
/// State reachable from both the cache handle and the schedule tasks.
pub(crate) struct Shared<V> {
    state: RwLock<State<V>>,
    pub stats: StatsRecorder,
}

struct State<V> {
    entries: HashMap<Key, Entry<V>>,
    /// Every schedule task not yet reaped, including those whose entry was
    /// already replaced or expired.
    tasks: JoinSet<()>,
    notify_tx: Option<mpsc::Sender<Key>>,
    errors_tx: Option<mpsc::Sender<CacheError>>,
    terminated: bool,
}

impl<V: Clone> Shared<V> {
    /// Extends the entry's deadline and clones its value, recording the
    /// outcome. Must be called with the state lock held.
    fn keep_alive(&self, entry: Option<&Entry<V>>) -> Option<V> {
        match entry {
            Some(entry) if entry.deadline.extend() => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }
}

impl<V> Shared<V> {
    /// Removes `key` only if it still belongs to the given generation.
    pub async fn remove_generation(&self, key: Key, generation: u64) -> bool {
        let mut state = self.state.write().await;
        match state.entries.get(&key) {
            Some(entry) if entry.generation == generation => {
                state.entries.remove(&key);
                true
            }
            _ => false,
        }
    }
}

// == Expiring Cache ==
/// In-memory cache whose entries expire unless read, and periodically
/// announce themselves as due for refresh.
///
/// Every `set` spawns one schedule task for the key. Replacing or deleting
/// the key cancels that task under the exclusive lock before the key is
/// reused, so a key never has two live tasks.
///
/// Refresh-due keys arrive on [`ExpiringCache::notify`]; expirations arrive
/// as [`CacheError::EntryExpired`] on [`ExpiringCache::errors`]. Both streams
/// must be drained for the lifetime of the cache.
pub struct ExpiringCache<V> {
    shared: Arc<Shared<V>>,
    config: CacheConfig,
    generation: AtomicU64,
    notify_rx: Mutex<Option<mpsc::Receiver<Key>>>,
    errors_rx: Mutex<Option<mpsc::Receiver<CacheError>>>,
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache with the given configuration.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_BUFFER);
        let (errors_tx, errors_rx) = mpsc::channel(EXPIRED_BUFFER);

        Ok(Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State {
                    entries: HashMap::new(),
                    tasks: JoinSet::new(),
                    notify_tx: Some(notify_tx),
                    errors_tx: Some(errors_tx),
                    terminated: false,
                }),
                stats: StatsRecorder::default(),
            }),
            config,
            generation: AtomicU64::new(0),
            notify_rx: Mutex::new(Some(notify_rx)),
            errors_rx: Mutex::new(Some(errors_rx)),
        })
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    // == Set ==
    /// Inserts or replaces the entry for `key`.
    ///
    /// A previous entry's task is cancelled first. The new entry gets a fresh
    /// deadline, a fresh refresh ticker and its own task.
    ///
    /// Fails with [`CacheError::Terminated`] after [`ExpiringCache::terminate`].
    pub async fn set(&self, key: Key, value: V) -> Result<()> {
        let mut state = self.shared.state.write().await;
        if state.terminated {
            return Err(CacheError::Terminated);
        }

        if let Some(previous) = state.entries.remove(&key) {
            debug!(key, generation = previous.generation, "replacing entry");
            previous.cancel();
        }
        while state.tasks.try_join_next().is_some() {}

        let (notify, errors) = match (&state.notify_tx, &state.errors_tx) {
            (Some(notify), Some(errors)) => (notify.clone(), errors.clone()),
            _ => return Err(CacheError::Terminated),
        };

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let deadline = Arc::new(Deadline::new(self.config.expiration));
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let schedule = Schedule {
            key,
            generation,
            refresh_interval: self.config.refresh_interval,
            deadline: Arc::clone(&deadline),
            cancel: cancel_rx,
            notify,
            errors,
            shared: Arc::downgrade(&self.shared),
        };
        state.tasks.spawn(schedule.run());

        state
            .entries
            .insert(key, Entry::new(value, generation, deadline, cancel_tx));

        Ok(())
    }

    // == Get ==
    /// Returns the value for `key` and pushes its deadline to
    /// `now + expiration`.
    ///
    /// The reset happens under the shared lock on the entry found there, so
    /// it cannot touch an entry that is being replaced or removed. An entry
    /// whose deadline already fired reads as absent.
    pub async fn get(&self, key: Key) -> Option<V> {
        let state = self.shared.state.read().await;
        self.shared.keep_alive(state.entries.get(&key))
    }

    // == Peek ==
    /// Returns the value for `key` without extending its deadline.
    pub async fn peek(&self, key: Key) -> Option<V> {
        let state = self.shared.state.read().await;
        state
            .entries
            .get(&key)
            .filter(|entry| !entry.deadline.has_fired())
            .map(|entry| entry.value.clone())
    }

    // == Batch Reads ==
    /// Keep-alive read of several keys under one shared lock.
    pub async fn get_many(&self, keys: &[Key]) -> Vec<Option<V>> {
        let state = self.shared.state.read().await;
        keys.iter()
            .map(|key| self.shared.keep_alive(state.entries.get(key)))
            .collect()
    }

    /// Non-extending read of several keys under one shared lock.
    pub async fn peek_many(&self, keys: &[Key]) -> Vec<Option<V>> {
        let state = self.shared.state.read().await;
        keys.iter()
            .map(|key| {
                state
                    .entries
                    .get(key)
                    .filter(|entry| !entry.deadline.has_fired())
                    .map(|entry| entry.value.clone())
            })
            .collect()
    }

    // == Delete ==
    /// Cancels the entry's task and removes the key.
    ///
    /// Returns `true` if an entry was removed, `false` if the key was absent.
    pub async fn delete(&self, key: Key) -> bool {
        let mut state = self.shared.state.write().await;
        match state.entries.remove(&key) {
            Some(entry) => {
                debug!(key, generation = entry.generation, "entry deleted");
                entry.cancel();
                true
            }
            None => false,
        }
    }

    // == Length ==
    /// Returns the current number of live entries.
    pub async fn len(&self) -> usize {
        self.shared.state.read().await.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.len().await;
        self.shared.stats.snapshot(total_entries)
    }

    // == Streams ==
    /// Hands out the refresh-due stream. It yields one key per refresh tick
    /// per live entry and ends after [`ExpiringCache::terminate`].
    ///
    /// The stream has a single consumer; a second call fails with
    /// [`CacheError::StreamClaimed`].
    pub fn notify(&self) -> Result<mpsc::Receiver<Key>> {
        self.notify_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CacheError::StreamClaimed("notify"))
    }

    /// Hands out the expiration stream, one [`CacheError::EntryExpired`] per
    /// entry that reached its deadline. Ends after [`ExpiringCache::terminate`].
    pub fn errors(&self) -> Result<mpsc::Receiver<CacheError>> {
        self.errors_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CacheError::StreamClaimed("errors"))
    }

    // == Terminate ==
    /// Stops every schedule task, drops all entries and closes both streams.
    ///
    /// Returns only once every task has exited, so nothing is produced on
    /// either stream afterwards. Calling it again is a no-op.
    pub async fn terminate(&self) {
        let mut state = self.shared.state.write().await;
        if state.terminated {
            return;
        }
        state.terminated = true;

        for (_, entry) in state.entries.drain() {
            entry.cancel();
        }
        let stopped = state.tasks.len();

        // A task may be parked on a full stream or on this very lock, so
        // abort rather than wait for it to notice the cancel signal. This
        // also reaches tasks whose entry is already gone but which have not
        // finished reporting its expiration.
        state.tasks.shutdown().await;

        state.notify_tx = None;
        state.errors_tx = None;

        info!(stopped, "cache terminated");
    }
}
