//! Debounced emission scheduling
//!
//! Coalesces bursts of notifications per `(stage, type name)` key:
//! - Scheduling under a key cancels whatever is pending under that key
//! - Only the most recently scheduled emission for a key ever runs
//! - Keys are independent of each other
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch::tasks::{DebounceKey, DebounceScheduler};
//! use std::time::Duration;
//!
//! let scheduler = DebounceScheduler::new();
//! let key = DebounceKey::new(Stage::Success, "SEARCH_OK");
//!
//! // Only the second emission runs, 200ms after it was scheduled
//! scheduler.schedule(key.clone(), Some(Duration::from_millis(200)), || emit("a"));
//! scheduler.schedule(key, Some(Duration::from_millis(200)), || emit("b"));
//!
//! // No interval: runs right away
//! scheduler.schedule(DebounceKey::new(Stage::Start, "SEARCH"), None, || emit("c"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::action::Stage;

/// Identifies a debounced emission for replacement.
///
/// Emissions with the same key are mutually exclusive - scheduling a new one
/// cancels the pending one.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DebounceKey {
    /// Lifecycle stage.
    pub stage: Stage,
    /// Resolved type name.
    pub type_name: String,
}

impl DebounceKey {
    /// Create a new debounce key.
    pub fn new(stage: Stage, type_name: impl Into<String>) -> Self {
        Self {
            stage,
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug)]
struct Pending {
    id: u64,
    token: CancellationToken,
}

/// Per-key timer table for debounced emissions.
///
/// Owned by a single middleware instance; two instances never cancel each
/// other's emissions. Dropping the scheduler cancels everything pending.
#[derive(Debug)]
pub struct DebounceScheduler {
    timers: Arc<Mutex<HashMap<DebounceKey, Pending>>>,
    next_id: AtomicU64,
    root: CancellationToken,
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    /// Schedule `emit` under `key`.
    ///
    /// Any emission pending under the same key is cancelled first. Without an
    /// interval (or with a zero one) `emit` runs immediately on the caller's
    /// turn; otherwise it runs on a spawned task once the interval elapses,
    /// unless superseded. Deferred emissions require a Tokio runtime.
    pub fn schedule<F>(&self, key: DebounceKey, interval: Option<Duration>, emit: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.cancel(&key) {
            tracing::debug!(
                stage = %key.stage,
                type_name = %key.type_name,
                "Superseded pending emission"
            );
        }

        let Some(interval) = interval.filter(|d| !d.is_zero()) else {
            emit();
            return;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        self.timers.lock().insert(
            key.clone(),
            Pending {
                id,
                token: token.clone(),
            },
        );

        tracing::debug!(
            stage = %key.stage,
            type_name = %key.type_name,
            ?interval,
            "Debouncing emission"
        );

        let timers = Arc::clone(&self.timers);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }

            // The table is authoritative: fire only if still the current entry.
            {
                let mut timers = timers.lock();
                match timers.get(&key) {
                    Some(pending) if pending.id == id => {
                        timers.remove(&key);
                    }
                    _ => return,
                }
            }
            emit();
        });
    }

    /// Cancel the emission pending under `key`.
    ///
    /// Returns `true` if one was pending.
    pub fn cancel(&self, key: &DebounceKey) -> bool {
        match self.timers.lock().remove(key) {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending emission.
    pub fn cancel_all(&self) {
        for (_, pending) in self.timers.lock().drain() {
            pending.token.cancel();
        }
    }

    /// Check if an emission is pending under `key`.
    pub fn is_pending(&self, key: &DebounceKey) -> bool {
        self.timers.lock().contains_key(key)
    }

    /// Number of pending emissions.
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
