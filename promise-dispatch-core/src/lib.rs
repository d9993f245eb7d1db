//! Core types for promise-dispatch
//!
//! This crate provides a Redux-style middleware that turns actions carrying an
//! asynchronous operation (or a synchronous function) into a lifecycle of
//! notifications: **start**, then **success** or **error**.
//!
//! # Core Concepts
//!
//! - **Action**: a loosely-typed field map, the unit flowing through the chain
//! - **Config**: which action fields the middleware reads, plus global hooks
//! - **Descriptor**: what an action asks for, validated before anything runs
//! - **Matcher**: decides which notifications a global hook observes
//! - **DebounceScheduler**: coalesces bursts per `(stage, type name)`
//!
//! # Basic Example
//!
//! ```ignore
//! use promise_dispatch_core::prelude::*;
//!
//! let middleware = PromiseMiddleware::new(
//!     Action::new().with("api", "https://example.test"),
//!     Config::default().with_hook(GlobalHook::on(action_types::ERROR, report)),
//! );
//! let chain = middleware.apply(store).next(sink);
//!
//! chain
//!     .dispatch(
//!         Action::new()
//!             .with("types", vec!["LOAD", "LOAD_OK", "LOAD_ERR"])
//!             .with("promise", Operation::new(|ctx| async move { load(ctx).await }))
//!             .with("id", 7),
//!     )?
//!     .settled()
//!     .await;
//! ```
//!
//! # Field Conventions
//!
//! By default the middleware reads `promise`, `function`, `types`, `callbacks`
//! and `debounce`. Staged fields accept a three-element list (`[start,
//! success, error]`) or a map keyed by `start`/`success`/`error`. All of these
//! names are configurable through [`Config`].

pub mod action;
pub mod config;
pub mod error;
pub mod hooks;
pub mod matcher;
pub mod middleware;
pub mod schema;
pub mod store;
pub mod tasks;
pub mod testing;
pub mod value;

// Data model exports
pub use action::{Action, Stage, ERROR_FIELD, RESULT_FIELD, TYPE_FIELD};
pub use value::{Callback, Function, Operation, OperationFuture, Value};

// Configuration exports
pub use config::{Config, StageNames};
pub use error::{ConfigurationError, Result};
pub use schema::{resolve, Descriptor, Invocation, Staged};

// Hook exports
pub use hooks::{GlobalHook, HookDispatcher};
pub use matcher::{action_types, glob_match, ActionType, Matcher, Predicate};

// Middleware exports
pub use middleware::PromiseMiddleware;
pub use store::{Bound, Chain, Handled, Middleware, Next, OperationContext, StoreApi};
pub use tasks::{DebounceKey, DebounceScheduler};

// Testing exports
pub use testing::{CallLog, RecordingSink, TestHarness, TestStore};

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, Stage};
    pub use crate::config::{Config, StageNames};
    pub use crate::error::ConfigurationError;
    pub use crate::hooks::GlobalHook;
    pub use crate::matcher::{action_types, ActionType, Matcher, Predicate};
    pub use crate::middleware::PromiseMiddleware;
    pub use crate::store::{Handled, Middleware, Next, OperationContext, StoreApi};
    pub use crate::value::{Callback, Function, Operation, Value};
}
