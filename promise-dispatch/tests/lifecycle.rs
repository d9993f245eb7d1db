//! End-to-end lifecycle expansion through the curried middleware chain.

use std::sync::Arc;

use parking_lot::Mutex;

use promise_dispatch::prelude::*;
use promise_dispatch::{assert_forwarded, assert_not_forwarded, RecordingSink};
use serde_json::json;

/// Ordered log shared between the test and its operations.
#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<String>>>);

impl Recorded {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn resolves(value: impl Into<Value> + Clone + Send + Sync + 'static) -> Operation {
    Operation::new(move |_| {
        let value = value.clone().into();
        async move { Ok(value) }
    })
}

fn rejects(value: impl Into<Value> + Clone + Send + Sync + 'static) -> Operation {
    Operation::new(move |_| {
        let value = value.clone().into();
        async move { Err(value) }
    })
}

#[tokio::test]
async fn test_start_carries_rest_and_success_adds_result() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    harness
        .dispatch(
            Action::new()
                .with("types", vec!["START", "SUCCESS", "ERROR"])
                .with("promise", resolves("R"))
                .with("payload", "P")
                .with("meta", Value::from(json!({ "page": 2 }))),
        )
        .unwrap()
        .settled()
        .await;

    let forwarded = harness.drain_forwarded();
    assert_eq!(forwarded.len(), 2);
    assert_eq!(
        forwarded[0].to_json(),
        json!({ "type": "START", "payload": "P", "meta": { "page": 2 } })
    );
    assert_eq!(
        forwarded[1].to_json(),
        json!({ "type": "SUCCESS", "payload": "P", "meta": { "page": 2 }, "result": "R" })
    );
    assert_not_forwarded!(forwarded, "ERROR");
}

#[tokio::test]
async fn test_rejection_emits_error_with_rest() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    harness
        .dispatch(
            Action::new()
                .with("types", vec!["START", "SUCCESS", "ERROR"])
                .with("promise", rejects(Value::from(json!({ "status": 500 }))))
                .with("payload", "P"),
        )
        .unwrap()
        .settled()
        .await;

    let forwarded = harness.drain_forwarded();
    assert_eq!(
        forwarded.iter().map(|a| a.to_json()).collect::<Vec<_>>(),
        vec![
            json!({ "type": "START", "payload": "P" }),
            json!({ "type": "ERROR", "payload": "P", "error": { "status": 500 } }),
        ]
    );
}

#[tokio::test]
async fn test_literal_type_is_success_name_only() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    harness
        .dispatch(Action::typed("LOADED").with("promise", resolves(1)))
        .unwrap()
        .settled()
        .await;
    harness
        .dispatch(Action::typed("LOADED").with("promise", rejects("nope")))
        .unwrap()
        .settled()
        .await;

    // no start name, no error name: only the success is forwarded
    let forwarded = harness.drain_forwarded();
    assert_eq!(
        forwarded,
        vec![Action::typed("LOADED").with("result", 1)]
    );
}

#[tokio::test]
async fn test_types_success_wins_over_literal_type() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    harness
        .dispatch(
            Action::typed("LITERAL")
                .with("types", Value::from(json!({ "start": "S" })))
                .with("promise", resolves("R")),
        )
        .unwrap()
        .settled()
        .await;
    harness
        .dispatch(
            Action::typed("LITERAL")
                .with("types", vec!["S", "OK", "KO"])
                .with("promise", resolves("R")),
        )
        .unwrap()
        .settled()
        .await;

    let types = harness.drain_types();
    assert_eq!(types, vec!["S", "LITERAL", "S", "OK"]);
}

#[tokio::test]
async fn test_operation_receives_store_and_additional_data() {
    let store = TestStore::new(Value::from(json!({ "count": 3 })));
    let middleware = PromiseMiddleware::new(
        Action::new().with("api", "https://example.test"),
        Config::default(),
    );
    let mut harness = TestHarness::with_store(middleware, store);

    let operation = Operation::new(|ctx: OperationContext| async move {
        ctx.dispatch(Action::typed("NESTED"));
        let api = ctx.get("api").cloned().unwrap_or_default();
        Ok(Value::from(json!({ "api": api.to_json(), "state": ctx.get_state().to_json() })))
    });

    harness
        .dispatch(Action::typed("DONE").with("promise", operation))
        .unwrap()
        .settled()
        .await;

    let forwarded = harness.drain_forwarded();
    assert_eq!(
        forwarded[0].get("result").map(Value::to_json),
        Some(json!({ "api": "https://example.test", "state": { "count": 3 } }))
    );
    assert_eq!(harness.store.dispatched(), vec![Action::typed("NESTED")]);
}

#[test]
fn test_sync_function_runs_on_dispatch() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    let handled = harness
        .dispatch(
            Action::new()
                .with("types", vec!["S", "OK", "KO"])
                .with("function", Function::new(|_| Ok(Value::from(42))))
                .with("id", 1),
        )
        .unwrap();

    assert!(matches!(handled, Handled::Completed));
    let forwarded = harness.drain_forwarded();
    assert_eq!(
        forwarded,
        vec![
            Action::typed("S").with("id", 1),
            Action::typed("OK").with("id", 1).with("result", 42),
        ]
    );
}

#[test]
fn test_sync_function_error_becomes_error_notification() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    harness
        .dispatch(
            Action::new()
                .with("types", vec!["S", "OK", "KO"])
                .with("function", Function::new(|_| Err(Value::from("thrown")))),
        )
        .unwrap();

    let forwarded = harness.drain_forwarded();
    assert_forwarded!(forwarded, "KO");
    assert_not_forwarded!(forwarded, "OK");
    assert_eq!(forwarded[1].get("error"), Some(&Value::from("thrown")));
}

#[tokio::test]
async fn test_side_function_runs_before_operation_and_is_discarded() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());
    let order = Recorded::default();

    let side = {
        let order = order.clone();
        Function::new(move |_| {
            order.push("function");
            Ok(Value::from("ignored"))
        })
    };
    let operation = {
        let order = order.clone();
        Operation::new(move |_| {
            order.push("operation");
            async { Ok(Value::from("from operation")) }
        })
    };

    harness
        .dispatch(
            Action::new()
                .with("types", vec!["S", "OK", "KO"])
                .with("function", side)
                .with("promise", operation),
        )
        .unwrap()
        .settled()
        .await;

    assert_eq!(order.entries(), vec!["function", "operation"]);
    let forwarded = harness.drain_forwarded();
    assert_eq!(forwarded[1].get("result"), Some(&Value::from("from operation")));
}

#[tokio::test]
async fn test_failing_side_function_does_not_stop_operation() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());

    harness
        .dispatch(
            Action::new()
                .with("types", vec!["S", "OK", "KO"])
                .with("function", Function::new(|_| Err(Value::from("side failed"))))
                .with("promise", resolves("R")),
        )
        .unwrap()
        .settled()
        .await;

    assert_eq!(harness.drain_types(), vec!["S", "OK"]);
}

#[tokio::test]
async fn test_local_callbacks_run_after_sink_and_hooks() {
    let sink = RecordingSink::new();
    let order = Recorded::default();

    let hook = {
        let order = order.clone();
        GlobalHook::always(move |n| order.push(format!("hook:{}", n.type_name().unwrap_or("-"))))
    };
    let callback = |label: &'static str| {
        let order = order.clone();
        Callback::new(move |payload: &Action| {
            assert!(payload.type_name().is_none());
            order.push(format!("local:{label}"));
        })
    };
    let recording_next: Next = {
        let order = order.clone();
        let inner = sink.next();
        Arc::new(move |action: Action| {
            order.push(format!("sink:{}", action.type_name().unwrap_or("-")));
            inner(action);
        })
    };

    let middleware = PromiseMiddleware::with_config(Config::default().with_hook(hook));
    let chain = middleware
        .apply(Arc::new(TestStore::default()))
        .next(recording_next);

    chain
        .dispatch(
            Action::new()
                .with("types", vec!["S", "OK", "KO"])
                .with(
                    "callbacks",
                    vec![Value::from(callback("start")), Value::from(callback("success"))],
                )
                .with("promise", resolves("R")),
        )
        .unwrap()
        .settled()
        .await;

    assert_eq!(
        order.entries(),
        vec![
            "sink:S",
            "hook:S",
            "local:start",
            "sink:OK",
            "hook:OK",
            "local:success",
        ]
    );
}

#[tokio::test]
async fn test_start_is_forwarded_before_operation_runs() {
    let sink = RecordingSink::new();
    let order = Recorded::default();

    let recording_next: Next = {
        let order = order.clone();
        let inner = sink.next();
        Arc::new(move |action: Action| {
            order.push(format!("sink:{}", action.type_name().unwrap_or("-")));
            inner(action);
        })
    };
    let operation = {
        let order = order.clone();
        Operation::new(move |_| {
            order.push("operation");
            async { Ok(Value::from("R")) }
        })
    };

    let chain = PromiseMiddleware::default()
        .apply(Arc::new(TestStore::default()))
        .next(recording_next);

    chain
        .dispatch(
            Action::new()
                .with("types", vec!["S", "OK", "KO"])
                .with("promise", operation),
        )
        .unwrap()
        .settled()
        .await;

    assert_eq!(order.entries(), vec!["sink:S", "operation", "sink:OK"]);
}

#[tokio::test]
async fn test_callbacks_by_name_fire_without_type_names() {
    let mut harness = TestHarness::new(PromiseMiddleware::default());
    let log = CallLog::new();

    let mut callbacks = std::collections::BTreeMap::new();
    callbacks.insert("start".to_string(), Value::from(log.callback("start")));
    callbacks.insert("error".to_string(), Value::from(log.callback("error")));

    harness
        .dispatch(
            Action::typed("ONLY_SUCCESS")
                .with("callbacks", callbacks)
                .with("promise", rejects("E"))
                .with("payload", "P"),
        )
        .unwrap()
        .settled()
        .await;

    assert!(harness.drain_forwarded().is_empty());
    assert_eq!(
        log.calls(),
        vec![
            ("start".to_string(), Action::new().with("payload", "P")),
            (
                "error".to_string(),
                Action::new().with("payload", "P").with("error", "E")
            ),
        ]
    );
}

#[test]
fn test_plain_actions_pass_through_untouched() {
    let log = CallLog::new();
    let config = Config::default().with_hook(GlobalHook::Always(log.callback("hook")));
    let mut harness = TestHarness::new(PromiseMiddleware::with_config(config));
    let plain = Action::typed("PLAIN").with("types", vec!["A", "B", "C"]);

    let handled = harness.dispatch(plain.clone()).unwrap();

    assert!(handled.is_forwarded());
    assert_eq!(harness.drain_forwarded(), vec![plain]);
    assert_eq!(log.count(), 0, "hooks only observe emitted notifications");
}

#[test]
fn test_independent_instances_do_not_share_state() {
    let first = Recorded::default();
    let second = Recorded::default();
    let hook = |log: &Recorded| {
        let log = log.clone();
        GlobalHook::always(move |_| log.push("seen"))
    };

    let a = TestHarness::new(PromiseMiddleware::with_config(
        Config::default().with_hook(hook(&first)),
    ));
    let b = TestHarness::new(PromiseMiddleware::with_config(
        Config::default().with_hook(hook(&second)),
    ));

    a.dispatch(Action::typed("X").with("function", Function::new(|_| Ok(Value::Null))))
        .unwrap();

    assert_eq!(first.entries().len(), 1);
    assert!(second.entries().is_empty());
    drop(b);
}
