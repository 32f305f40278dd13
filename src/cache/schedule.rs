//! Entry Schedule Task
//!
//! One background task per live entry. It emits a refresh notification on
//! every interval tick, removes the entry when its deadline elapses, and
//! stops as soon as its cancel signal fires. Whichever happens first wins.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::entry::{Deadline, Expiry};
use super::expiring::Shared;
use super::Key;
use crate::error::CacheError;

/// Everything a schedule task owns for the lifetime of one entry.
pub(crate) struct Schedule<V> {
    pub key: Key,
    pub generation: u64,
    pub refresh_interval: Duration,
    pub deadline: Arc<Deadline>,
    pub cancel: oneshot::Receiver<()>,
    pub notify: mpsc::Sender<Key>,
    pub errors: mpsc::Sender<CacheError>,
    pub shared: Weak<Shared<V>>,
}

impl<V> Schedule<V>
where
    V: Send + Sync + 'static,
{
    // == Run ==
    /// Drives the entry until it expires or is cancelled.
    pub async fn run(self) {
        let Schedule {
            key,
            generation,
            refresh_interval,
            deadline,
            mut cancel,
            notify,
            errors,
            shared,
        } = self;

        let mut ticker = time::interval_at(Instant::now() + refresh_interval, refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut wake_at = deadline.at();

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!(key, generation, "schedule cancelled");
                    return;
                }
                _ = time::sleep_until(wake_at) => {
                    match deadline.poll_expired() {
                        Expiry::Rearm(at) => wake_at = at,
                        Expiry::Fired => {
                            expire(key, generation, &shared, &errors).await;
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    // Blocks until the listener receives the key. A stalled
                    // listener stalls this entry's cadence.
                    tokio::select! {
                        biased;
                        _ = &mut cancel => {
                            debug!(key, generation, "schedule cancelled while notifying");
                            return;
                        }
                        sent = notify.send(key) => {
                            if sent.is_err() {
                                return;
                            }
                            if let Some(shared) = shared.upgrade() {
                                shared.stats.record_refresh();
                            }
                            debug!(key, "refresh due");
                        }
                    }
                }
            }
        }
    }
}

/// Removes the entry if it is still ours, then reports the expiration.
async fn expire<V>(
    key: Key,
    generation: u64,
    shared: &Weak<Shared<V>>,
    errors: &mpsc::Sender<CacheError>,
) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let removed = shared.remove_generation(key, generation).await;
    if !removed {
        return;
    }
    shared.stats.record_expiration();
    drop(shared);

    info!(key, "entry expired");
    let _ = errors.send(CacheError::EntryExpired { key }).await;
}
