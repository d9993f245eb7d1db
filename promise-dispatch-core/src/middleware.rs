//! Lifecycle expansion middleware
//!
//! [`PromiseMiddleware`] intercepts actions carrying an operation (async) or a
//! function (sync) and expands each into lifecycle notifications:
//!
//! 1. **start**, before the operation runs
//! 2. **success** with the `result`, or **error** with the `error`
//!
//! Actions carrying neither are forwarded untouched.
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch::prelude::*;
//!
//! let middleware = PromiseMiddleware::new(Action::new(), Config::default());
//! let chain = middleware.apply(store).next(sink);
//!
//! chain.dispatch(
//!     Action::new()
//!         .with("types", vec!["LOAD", "LOAD_OK", "LOAD_ERR"])
//!         .with("promise", Operation::new(|ctx| async move { fetch(ctx).await }))
//!         .with("id", 7),
//! )?;
//! // sink receives { type: "LOAD", id: 7 }
//! // then         { type: "LOAD_OK", id: 7, result: .. }
//! ```
//!
//! # Stage emission
//!
//! When a stage has a type name, its notification goes through the debounce
//! scheduler and, once emitted, reaches the sink, then matching global hooks,
//! then the action's local callback. Without a type name nothing is forwarded
//! and only the local callback runs, except that an untyped success with a
//! local callback also reaches global hooks (with no `type` field). Success
//! falls back to the action's literal `type`; start and error do not.
//!
//! # Failure boundary
//!
//! Only the function's own `Err` is routed into the error stage. A panic in a
//! hook, callback or the sink propagates to the caller and is never reported
//! as an operation error.

use std::sync::Arc;
use std::time::Duration;

use crate::action::{Action, Stage, ERROR_FIELD, RESULT_FIELD, TYPE_FIELD};
use crate::config::Config;
use crate::error::Result;
use crate::hooks::HookDispatcher;
use crate::schema::{self, Descriptor, Invocation, Staged};
use crate::store::{Handled, Middleware, Next, OperationContext, StoreApi};
use crate::tasks::{DebounceKey, DebounceScheduler};
use crate::value::{Callback, Value};

struct Shared {
    config: Config,
    extra: Arc<Action>,
    hooks: HookDispatcher,
    debounce: DebounceScheduler,
}

/// Middleware expanding operations into start/success/error notifications.
///
/// Cheap to clone; clones share configuration and the debounce timer table.
#[derive(Clone)]
pub struct PromiseMiddleware {
    shared: Arc<Shared>,
}

impl Default for PromiseMiddleware {
    fn default() -> Self {
        Self::new(Action::new(), Config::default())
    }
}

impl std::fmt::Debug for PromiseMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromiseMiddleware")
            .field("config", &self.shared.config)
            .field("extra", &self.shared.extra)
            .field("pending_emissions", &self.shared.debounce.pending())
            .finish()
    }
}

impl PromiseMiddleware {
    /// Create a middleware.
    ///
    /// `additional_data` is merged into the argument of every operation and
    /// function invocation.
    pub fn new(additional_data: Action, config: Config) -> Self {
        let hooks = HookDispatcher::new(config.hooks.clone());
        Self {
            shared: Arc::new(Shared {
                config,
                extra: Arc::new(additional_data),
                hooks,
                debounce: DebounceScheduler::new(),
            }),
        }
    }

    /// Create a middleware with default configuration.
    pub fn with_config(config: Config) -> Self {
        Self::new(Action::new(), config)
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Debounce timer table of this instance.
    pub fn scheduler(&self) -> &DebounceScheduler {
        &self.shared.debounce
    }

    fn handles(&self, action: &Action) -> bool {
        let config = &self.shared.config;
        action.is_set(&config.operation_field) || action.is_set(&config.function_field)
    }
}

impl Middleware for PromiseMiddleware {
    fn handle(&self, store: &Arc<dyn StoreApi>, next: &Next, action: Action) -> Result<Handled> {
        if !self.handles(&action) {
            tracing::debug!(action = ?action.type_name(), "Passing action through");
            next(action);
            return Ok(Handled::Forwarded);
        }

        let descriptor = schema::resolve(&self.shared.config, action)?;
        let names = Stage::ALL.map(|stage| descriptor.type_name(stage).map(str::to_string));
        let Descriptor {
            invocation,
            callbacks,
            debounce,
            rest,
            ..
        } = descriptor;

        tracing::debug!(
            start = ?names[0],
            success = ?names[1],
            error = ?names[2],
            "Expanding action"
        );

        let expansion = Arc::new(Expansion {
            shared: Arc::clone(&self.shared),
            next: Arc::clone(next),
            names,
            callbacks,
            debounce,
            rest,
        });

        expansion.emit(Stage::Start, expansion.rest.clone());

        let ctx = OperationContext::new(Arc::clone(store), Arc::clone(&self.shared.extra));
        match invocation {
            Invocation::Async { operation, side } => {
                if let Some(side) = side {
                    // Runs for side effects only; never drives the lifecycle.
                    if let Err(error) = side.call(ctx.clone()) {
                        tracing::warn!(
                            field = %self.shared.config.function_field,
                            error = ?error.to_json(),
                            "Function run alongside an operation failed"
                        );
                    }
                }
                let pending = operation.call(ctx);
                let handle = tokio::spawn(async move {
                    match pending.await {
                        Ok(result) => expansion.succeed(result),
                        Err(error) => expansion.fail(error),
                    }
                });
                Ok(Handled::Pending(handle))
            }
            Invocation::Sync(function) => {
                // Failure boundary covers the function call only.
                let outcome = function.call(ctx);
                match outcome {
                    Ok(result) => expansion.succeed(result),
                    Err(error) => expansion.fail(error),
                }
                Ok(Handled::Completed)
            }
        }
    }
}

/// Per-action emission state, shared with the operation's task.
struct Expansion {
    shared: Arc<Shared>,
    next: Next,
    /// Resolved type name per stage, indexed by [`Stage::index`].
    names: [Option<String>; 3],
    callbacks: Staged<Callback>,
    debounce: Staged<Duration>,
    rest: Action,
}

impl Expansion {
    fn succeed(&self, result: Value) {
        self.emit(Stage::Success, self.rest.clone().with(RESULT_FIELD, result));
    }

    fn fail(&self, error: Value) {
        self.emit(Stage::Error, self.rest.clone().with(ERROR_FIELD, error));
    }

    /// Emit one stage. `payload` is what the local callback receives; the
    /// notification is the payload plus `type`.
    fn emit(&self, stage: Stage, payload: Action) {
        let callback = self.callbacks.get(stage).cloned();

        let Some(type_name) = self.names[stage.index()].clone() else {
            if let Some(callback) = callback {
                // An untyped success with a local callback still reaches global hooks.
                if stage == Stage::Success {
                    tracing::debug!(
                        %stage,
                        "Stage has no type name, notifying hooks and local callback"
                    );
                    self.shared.hooks.dispatch(stage, &payload);
                } else {
                    tracing::debug!(%stage, "Stage has no type name, invoking local callback only");
                }
                callback.call(&payload);
            }
            return;
        };

        let next = Arc::clone(&self.next);
        let hooks = self.shared.hooks.clone();
        let key = DebounceKey::new(stage, type_name.clone());
        let interval = self.debounce.get(stage).copied();

        self.shared.debounce.schedule(key, interval, move || {
            let notification = payload.clone().with(TYPE_FIELD, type_name);
            tracing::debug!(%stage, type_name = ?notification.type_name(), "Emitting notification");
            next(notification.clone());
            hooks.dispatch(stage, &notification);
            if let Some(callback) = callback {
                callback.call(&payload);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallLog, TestHarness};
    use crate::value::{Function, Operation};

    fn resolves(value: &'static str) -> Operation {
        Operation::new(move |_| async move { Ok(Value::from(value)) })
    }

    fn rejects(value: &'static str) -> Operation {
        Operation::new(move |_| async move { Err(Value::from(value)) })
    }

    #[test]
    fn test_pass_through() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());
        let action = Action::typed("PLAIN").with("payload", "P");

        let handled = harness.dispatch(action.clone()).unwrap();

        assert!(handled.is_forwarded());
        assert_eq!(harness.drain_forwarded(), vec![action]);
    }

    #[test]
    fn test_falsy_operation_field_passes_through() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());
        let action = Action::typed("PLAIN").with("promise", Value::Null);

        assert!(harness.dispatch(action).unwrap().is_forwarded());
        assert_eq!(harness.drain_forwarded().len(), 1);
    }

    #[tokio::test]
    async fn test_async_start_then_success() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());

        let handled = harness
            .dispatch(
                Action::new()
                    .with("types", vec!["START", "SUCCESS", "ERROR"])
                    .with("promise", resolves("R"))
                    .with("payload", "P"),
            )
            .unwrap();
        handled.settled().await;

        assert_eq!(
            harness.drain_forwarded(),
            vec![
                Action::typed("START").with("payload", "P"),
                Action::typed("SUCCESS").with("payload", "P").with("result", "R"),
            ]
        );
    }

    #[tokio::test]
    async fn test_async_rejection_emits_error() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());

        harness
            .dispatch(
                Action::new()
                    .with("types", Value::from(serde_json::json!([null, "SUCCESS", "ERROR"])))
                    .with("promise", rejects("boom")),
            )
            .unwrap()
            .settled()
            .await;

        assert_eq!(
            harness.drain_forwarded(),
            vec![Action::typed("ERROR").with("error", "boom")]
        );
    }

    #[test]
    fn test_sync_function_success_and_error() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());

        harness
            .dispatch(
                Action::new()
                    .with("types", vec!["S", "OK", "KO"])
                    .with("function", Function::new(|_| Ok(Value::from(1)))),
            )
            .unwrap();
        harness
            .dispatch(
                Action::new()
                    .with("types", vec!["S", "OK", "KO"])
                    .with("function", Function::new(|_| Err(Value::from("thrown")))),
            )
            .unwrap();

        let forwarded = harness.drain_forwarded();
        let types: Vec<_> = forwarded.iter().map(|a| a.type_name().unwrap_or("")).collect();
        assert_eq!(types, vec!["S", "OK", "S", "KO"]);
        assert_eq!(forwarded[3].get("error"), Some(&Value::from("thrown")));
    }

    #[test]
    fn test_local_callback_without_type_name() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());
        let log = CallLog::new();

        harness
            .dispatch(
                Action::new()
                    .with("types", Value::from(serde_json::json!(["S", null, null])))
                    .with("callbacks", vec![Value::Null, Value::Null, log.callback("error").into()])
                    .with("function", Function::new(|_| Err(Value::from("e")))),
            )
            .unwrap();

        // no error type: not forwarded, callback still fires
        assert_eq!(harness.drain_forwarded(), vec![Action::typed("S")]);
        assert_eq!(log.calls(), vec![("error".to_string(), Action::new().with("error", "e"))]);
    }

    #[test]
    fn test_callback_panic_is_not_routed_to_error_stage() {
        let mut harness = TestHarness::new(PromiseMiddleware::default());
        let exploding = Callback::new(|_| panic!("observer failure"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            harness.dispatch(
                Action::new()
                    .with("types", vec!["S", "OK", "KO"])
                    .with("callbacks", vec![Value::Null, exploding.into()])
                    .with("function", Function::new(|_| Ok(Value::Null))),
            )
        }));

        assert!(result.is_err());
        let types: Vec<_> = harness
            .drain_forwarded()
            .iter()
            .filter_map(|a| a.type_name().map(str::to_string))
            .collect();
        assert_eq!(types, vec!["S", "OK"]);
    }
}
