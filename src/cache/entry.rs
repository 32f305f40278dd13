//! Cache Entry Module
//!
//! Defines a live cache entry and the expiration deadline it shares with
//! its background schedule task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

// == Deadline ==
/// Expiration deadline of a single entry.
///
/// Readers push the deadline forward with [`Deadline::extend`]; the schedule
/// task checks it with [`Deadline::poll_expired`] whenever its timer wakes.
/// Both go through the same mutex, so a reset can never land on an entry
/// whose deadline has already fired.
#[derive(Debug)]
pub struct Deadline {
    ttl: Duration,
    state: Mutex<DeadlineState>,
}

#[derive(Debug)]
struct DeadlineState {
    at: Instant,
    fired: bool,
}

/// Outcome of checking a deadline after its timer woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The deadline elapsed; the entry must be removed.
    Fired,
    /// A keep-alive read moved the deadline; sleep until the new instant.
    Rearm(Instant),
}

impl Deadline {
    // == Constructor ==
    /// Creates a deadline that elapses `ttl` from now.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(DeadlineState {
                at: Instant::now() + ttl,
                fired: false,
            }),
        }
    }

    // == Extend ==
    /// Resets the deadline to `now + ttl`.
    ///
    /// Returns `false` once the deadline has fired, in which case the entry
    /// is being removed and must be treated as absent.
    pub fn extend(&self) -> bool {
        let mut state = self.lock();
        if state.fired {
            return false;
        }
        state.at = Instant::now() + self.ttl;
        true
    }

    /// Current deadline instant.
    pub fn at(&self) -> Instant {
        self.lock().at
    }

    /// Whether the deadline has fired.
    pub fn has_fired(&self) -> bool {
        self.lock().fired
    }

    // == Poll Expired ==
    /// Marks the deadline fired if it has elapsed, otherwise reports the
    /// instant to sleep until.
    pub fn poll_expired(&self) -> Expiry {
        let mut state = self.lock();
        if state.fired || Instant::now() >= state.at {
            state.fired = true;
            Expiry::Fired
        } else {
            Expiry::Rearm(state.at)
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeadlineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Entry ==
/// A cached value plus the signal that stops its schedule task.
///
/// The task itself is owned by the cache's task set, which outlives the
/// entry so that expiring and replaced tasks can still be awaited.
#[derive(Debug)]
pub(crate) struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Unique per `set`; lets a schedule task recognise its own entry
    pub generation: u64,
    /// Deadline shared with the schedule task
    pub deadline: Arc<Deadline>,
    cancel: oneshot::Sender<()>,
}

impl<V> Entry<V> {
    pub fn new(
        value: V,
        generation: u64,
        deadline: Arc<Deadline>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            value,
            generation,
            deadline,
            cancel,
        }
    }

    // == Cancel ==
    /// Signals the schedule task to stop.
    ///
    /// The signal is fire-and-forget: the task observes it on its next wake-up.
    pub fn cancel(self) {
        // The receiver is gone if the task already exited.
        let _ = self.cancel.send(());
    }
}
