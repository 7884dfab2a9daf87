//! Integration tests for discarding completions of abandoned submissions.

mod common;

use crossway_app::{Resolution, SubmitDecision, WorkflowController, run_submission};
use crossway_ui::WorkflowState;

#[tokio::test]
async fn stale_resolution_tests_completion_after_reselection_is_discarded() {
    let transport = common::ScriptedTransport::answering(200, common::EXAMPLE_RESPONSE);
    let client = common::client_with(transport.clone());
    let mut controller = WorkflowController::new();

    controller.select_files(common::selection_of(4));
    let SubmitDecision::Dispatch(abandoned) = controller.request_submit() else {
        panic!("four videos should dispatch");
    };

    let newer = common::selection_of(3);
    controller.select_files(newer.clone());
    assert!(!controller.is_busy());

    let late = run_submission(&client, abandoned).await;
    assert_eq!(controller.resolve(late), Resolution::Stale);
    assert_eq!(controller.state(), &WorkflowState::Selecting { selection: newer });
}

#[tokio::test]
async fn stale_resolution_tests_only_latest_ticket_applies() {
    let transport = common::ScriptedTransport::answering(200, r#"{"error":"model failed"}"#);
    let client = common::client_with(transport.clone());
    let mut controller = WorkflowController::new();

    controller.select_files(common::selection_of(4));
    let SubmitDecision::Dispatch(first) = controller.request_submit() else {
        panic!("four videos should dispatch");
    };
    controller.select_files(common::selection_of(4));
    let SubmitDecision::Dispatch(second) = controller.request_submit() else {
        panic!("four videos should dispatch");
    };
    assert!(second.generation() > first.generation());

    let first_done = run_submission(&client, first).await;
    let second_done = run_submission(&client, second).await;

    assert_eq!(controller.resolve(first_done), Resolution::Stale);
    assert!(controller.is_busy());
    assert_eq!(controller.resolve(second_done.clone()), Resolution::Applied);
    assert_eq!(controller.state().name(), "failed");

    // A duplicate delivery after resolution is also stale.
    assert_eq!(controller.resolve(second_done), Resolution::Stale);
    assert_eq!(transport.request_count(), 2);
}
