//! Test utilities for promise-dispatch middleware
//!
//! - [`TestStore`]: a [`StoreApi`] with settable state that records dispatches
//! - [`RecordingSink`]: a downstream sink capturing forwarded notifications
//! - [`CallLog`]: records local callback and hook invocations
//! - [`TestHarness`]: all of the above wired to a middleware
//! - Assertion macros for verifying forwarded notifications by type name
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch::testing::TestHarness;
//!
//! let mut harness = TestHarness::new(PromiseMiddleware::default());
//!
//! harness
//!     .dispatch(Action::new().with("types", vec!["S", "OK", "KO"]).with("promise", op))?
//!     .settled()
//!     .await;
//!
//! let forwarded = harness.drain_forwarded();
//! assert_forwarded!(forwarded, "S");
//! assert_forwarded!(forwarded, "OK");
//! assert_not_forwarded!(forwarded, "KO");
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::error::Result;
use crate::store::{Chain, Handled, Middleware, Next, StoreApi};
use crate::value::{Callback, Value};

/// In-memory [`StoreApi`] for tests.
#[derive(Debug, Default)]
pub struct TestStore {
    state: Mutex<Value>,
    dispatched: Mutex<Vec<Action>>,
}

impl TestStore {
    /// Create a store holding `state`.
    pub fn new(state: impl Into<Value>) -> Self {
        Self {
            state: Mutex::new(state.into()),
            dispatched: Mutex::new(Vec::new()),
        }
    }

    /// Replace the state.
    pub fn set_state(&self, state: impl Into<Value>) {
        *self.state.lock() = state.into();
    }

    /// Actions dispatched through [`StoreApi::dispatch`] so far.
    pub fn dispatched(&self) -> Vec<Action> {
        self.dispatched.lock().clone()
    }
}

impl StoreApi for TestStore {
    fn get_state(&self) -> Value {
        self.state.lock().clone()
    }

    fn dispatch(&self, action: Action) {
        self.dispatched.lock().push(action);
    }
}

/// Downstream sink recording everything forwarded to it.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Action>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A [`Next`] feeding this sink.
    pub fn next(&self) -> Next {
        let tx = self.tx.clone();
        Arc::new(move |action: Action| {
            let _ = tx.send(action);
        })
    }

    /// Drain everything forwarded so far, in order.
    pub fn drain(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(action) = self.rx.try_recv() {
            actions.push(action);
        }
        actions
    }
}

/// Records invocations of callbacks created from it.
///
/// Each call is stored with the label given to [`callback`](Self::callback),
/// in invocation order across all callbacks of the log.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, Action)>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback recording its payload under `label`.
    pub fn callback(&self, label: impl Into<String>) -> Callback {
        let calls = Arc::clone(&self.calls);
        let label = label.into();
        Callback::new(move |payload| calls.lock().push((label.clone(), payload.clone())))
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<(String, Action)> {
        self.calls.lock().clone()
    }

    /// Payloads recorded under `label`.
    pub fn calls_for(&self, label: &str) -> Vec<Action> {
        self.calls
            .lock()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Labels in invocation order.
    pub fn labels(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(l, _)| l.clone()).collect()
    }

    /// Number of recorded calls.
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Middleware wired to a [`TestStore`] and a [`RecordingSink`].
pub struct TestHarness<M> {
    /// The store operations see.
    pub store: Arc<TestStore>,
    sink: RecordingSink,
    chain: Chain<M>,
}

impl<M: Middleware + Clone> TestHarness<M> {
    /// Wire `middleware` to a fresh store and sink.
    pub fn new(middleware: M) -> Self {
        Self::with_store(middleware, TestStore::default())
    }

    /// Wire `middleware` to the given store and a fresh sink.
    pub fn with_store(middleware: M, store: TestStore) -> Self {
        let store = Arc::new(store);
        let sink = RecordingSink::new();
        let api: Arc<dyn StoreApi> = store.clone();
        let chain = middleware.apply(api).next(sink.next());
        Self { store, sink, chain }
    }

    /// Dispatch an action through the middleware.
    pub fn dispatch(&self, action: Action) -> Result<Handled> {
        self.chain.dispatch(action)
    }

    /// Drain everything forwarded to the sink so far.
    pub fn drain_forwarded(&mut self) -> Vec<Action> {
        self.sink.drain()
    }

    /// Type names of everything forwarded so far (drains the sink).
    pub fn drain_types(&mut self) -> Vec<String> {
        self.drain_forwarded()
            .iter()
            .map(|a| a.type_name().unwrap_or_default().to_string())
            .collect()
    }

    /// The middleware under test.
    pub fn middleware(&self) -> &M {
        self.chain.middleware()
    }
}

/// Pause tokio time (requires the `testing-time` feature).
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Resume tokio time (requires the `testing-time` feature).
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Advance paused tokio time, letting due debounced emissions run.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: std::time::Duration) {
    tokio::time::advance(duration).await;
    tokio::task::yield_now().await;
}

/// Assert that a notification with the given type name was forwarded.
///
/// # Example
///
/// ```ignore
/// let forwarded = harness.drain_forwarded();
/// assert_forwarded!(forwarded, "LOAD_OK");
/// ```
#[macro_export]
macro_rules! assert_forwarded {
    ($actions:expr, $type_name:expr) => {
        assert!(
            $actions.iter().any(|a| a.type_name() == Some($type_name)),
            "Expected notification `{}` to be forwarded, but got: {:?}",
            $type_name,
            $actions.iter().map(|a| a.type_name()).collect::<Vec<_>>()
        );
    };
}

/// Assert that no notification with the given type name was forwarded.
#[macro_export]
macro_rules! assert_not_forwarded {
    ($actions:expr, $type_name:expr) => {
        assert!(
            !$actions.iter().any(|a| a.type_name() == Some($type_name)),
            "Expected notification `{}` NOT to be forwarded, but it was: {:?}",
            $type_name,
            $actions.iter().map(|a| a.type_name()).collect::<Vec<_>>()
        );
    };
}

/// Find the first forwarded notification with the given type name.
#[macro_export]
macro_rules! find_forwarded {
    ($actions:expr, $type_name:expr) => {
        $actions.iter().find(|a| a.type_name() == Some($type_name))
    };
}

/// Count forwarded notifications with the given type name.
#[macro_export]
macro_rules! count_forwarded {
    ($actions:expr, $type_name:expr) => {
        $actions
            .iter()
            .filter(|a| a.type_name() == Some($type_name))
            .count()
    };
}
