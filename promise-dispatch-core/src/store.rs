//! Middleware protocol between the host store and the middleware
//!
//! The host supplies a [`StoreApi`] and a downstream sink ([`Next`]); the
//! middleware never builds either itself. Binding is curried the way Redux
//! middleware is:
//!
//! ```ignore
//! let chain = middleware.apply(store).next(sink);
//! chain.dispatch(action)?;
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::action::Action;
use crate::error::Result;
use crate::value::Value;

/// Downstream sink receiving forwarded actions and notifications.
pub type Next = Arc<dyn Fn(Action) + Send + Sync>;

/// Store capabilities exposed to operations.
pub trait StoreApi: Send + Sync {
    /// Snapshot of the current state.
    fn get_state(&self) -> Value;

    /// Dispatch an action from the top of the middleware chain.
    fn dispatch(&self, action: Action);
}

/// Argument handed to every operation and function.
///
/// Carries the store API plus the additional data fixed when the middleware
/// was constructed.
#[derive(Clone)]
pub struct OperationContext {
    store: Arc<dyn StoreApi>,
    extra: Arc<Action>,
}

impl OperationContext {
    /// Create a context over a store and additional data.
    pub fn new(store: Arc<dyn StoreApi>, extra: Arc<Action>) -> Self {
        Self { store, extra }
    }

    /// Snapshot of the store state.
    pub fn get_state(&self) -> Value {
        self.store.get_state()
    }

    /// Dispatch an action through the store.
    pub fn dispatch(&self, action: Action) {
        self.store.dispatch(action);
    }

    /// One field of the additional data.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.extra.get(field)
    }

    /// All additional data.
    pub fn extra(&self) -> &Action {
        &self.extra
    }

    /// The underlying store API.
    pub fn store(&self) -> &Arc<dyn StoreApi> {
        &self.store
    }
}

impl std::fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

/// What happened to a dispatched action.
#[derive(Debug)]
pub enum Handled {
    /// Not handled by the middleware; forwarded to the sink unchanged.
    Forwarded,
    /// Handled synchronously. Debounced notifications may still be pending.
    Completed,
    /// An operation is in flight; the handle completes after its success or
    /// error stage has been processed.
    Pending(JoinHandle<()>),
}

impl Handled {
    /// Whether the action was passed through untouched.
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Handled::Forwarded)
    }

    /// Wait until the action's operation has settled.
    ///
    /// A panic raised by an observer on the operation's task is resumed on
    /// the caller.
    pub async fn settled(self) {
        if let Handled::Pending(handle) = self {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }
    }
}

/// Middleware intercepting actions on their way to the sink.
pub trait Middleware: Send + Sync {
    /// Handle one action.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`](crate::ConfigurationError) when the
    /// action is malformed; nothing has been emitted in that case.
    fn handle(&self, store: &Arc<dyn StoreApi>, next: &Next, action: Action) -> Result<Handled>;

    /// Bind the middleware to a store (first curried layer).
    fn apply(&self, store: Arc<dyn StoreApi>) -> Bound<Self>
    where
        Self: Clone + Sized,
    {
        Bound {
            middleware: self.clone(),
            store,
        }
    }
}

/// Middleware bound to a store, waiting for its downstream sink.
#[derive(Clone)]
pub struct Bound<M> {
    middleware: M,
    store: Arc<dyn StoreApi>,
}

impl<M: Middleware + Clone> Bound<M> {
    /// Attach the downstream sink (second curried layer).
    pub fn next(&self, next: Next) -> Chain<M> {
        Chain {
            middleware: self.middleware.clone(),
            store: Arc::clone(&self.store),
            next,
        }
    }
}

/// Fully bound middleware, ready to receive actions.
#[derive(Clone)]
pub struct Chain<M> {
    middleware: M,
    store: Arc<dyn StoreApi>,
    next: Next,
}

impl<M: Middleware> Chain<M> {
    /// Handle one action (third curried layer).
    ///
    /// # Errors
    ///
    /// See [`Middleware::handle`].
    pub fn dispatch(&self, action: Action) -> Result<Handled> {
        self.middleware.handle(&self.store, &self.next, action)
    }

    /// The bound middleware.
    pub fn middleware(&self) -> &M {
        &self.middleware
    }
}
