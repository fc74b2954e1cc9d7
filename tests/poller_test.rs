//! Operation polling: fixed-interval waits that end only on a terminal
//! state, with operation errors returned as values.

mod helpers;

use std::time::Duration;

use helpers::{operation, ScriptedOperations};

use automl_predict::models::operation::OperationError;
use automl_predict::services::poller::OperationPoller;

const OP: &str = "projects/p/locations/us-central1/operations/op-1";

#[tokio::test]
async fn wait_for_polls_until_done() {
    let source = ScriptedOperations::for_operation(vec![
        operation(OP, false),
        operation(OP, false),
        operation(OP, true),
    ]);
    let poller = OperationPoller::with_interval(&source, Duration::from_millis(10));

    let result = poller.wait_for("p", "op-1").await.unwrap();

    assert!(result.done);
    assert_eq!(result.short_id(), "op-1");
    assert_eq!(source.polls(), 3);
}

#[tokio::test]
async fn wait_for_returns_failed_operations_as_values() {
    let mut failed = operation(OP, true);
    failed.error = Some(OperationError {
        code: 13,
        message: "training aborted".to_string(),
    });
    let source = ScriptedOperations::for_operation(vec![operation(OP, false), failed]);
    let poller = OperationPoller::with_interval(&source, Duration::from_millis(10));

    let result = poller.wait_for("p", "op-1").await.unwrap();

    let error = result.error.expect("error must be preserved");
    assert_eq!(error.code, 13);
    assert_eq!(error.message, "training aborted");
}

#[tokio::test]
async fn wait_for_all_returns_once_nothing_is_pending() {
    let other = "projects/p/locations/us-central1/operations/op-2";
    let source = ScriptedOperations::for_active(vec![
        vec![operation(OP, false), operation(other, true)],
        vec![operation(OP, false)],
        vec![operation(OP, true)],
    ]);
    let poller = OperationPoller::with_interval(&source, Duration::from_millis(10));

    poller.wait_for_all("p").await.unwrap();

    assert_eq!(source.polls(), 3);
}

#[tokio::test]
async fn wait_for_all_with_no_operations_returns_immediately() {
    let source = ScriptedOperations::for_active(vec![Vec::new()]);
    let poller = OperationPoller::with_interval(&source, Duration::from_millis(10));

    poller.wait_for_all("p").await.unwrap();

    assert_eq!(source.polls(), 1);
}
