//! Integration tests for upload failure classification.

mod common;

use crossway_core::validate_selection;
use crossway_upload::{
    FailureClass, SubmissionOutcome, UploadError, classify_upload_error,
};

#[test]
fn upload_error_classification_tests_distinguish_failure_sources() {
    assert_eq!(
        classify_upload_error(&UploadError::Server(503)),
        FailureClass::Status
    );
    assert_eq!(
        classify_upload_error(&UploadError::Client(400)),
        FailureClass::Status
    );
    assert_eq!(
        classify_upload_error(&UploadError::Timeout),
        FailureClass::Timeout
    );
    assert_eq!(
        classify_upload_error(&UploadError::MalformedBody("eof".to_string())),
        FailureClass::MalformedBody
    );
}

#[tokio::test]
async fn upload_error_classification_tests_malformed_body_keeps_detail() {
    let transport = common::ScriptedTransport::answering(200, "not json");
    let client = common::client_with(transport);
    let videos = validate_selection(&common::selection_of(4)).expect("four videos");

    let SubmissionOutcome::Failed(failure) = client.submit(&videos).await else {
        panic!("malformed body must fail");
    };
    assert_eq!(failure.class, FailureClass::MalformedBody);
    assert!(failure.detail.contains("malformed response body"));
}
