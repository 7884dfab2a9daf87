//! Integration tests for the service health probe.

mod common;

use crossway_upload::UploadError;

#[tokio::test]
async fn service_ping_tests_accepts_2xx_and_reports_others() {
    let healthy = common::client_with(common::ScriptedTransport::answering(200, "pong"));
    healthy.ping().await.expect("2xx should be healthy");

    let failing = common::client_with(common::ScriptedTransport::answering(502, ""));
    assert_eq!(failing.ping().await, Err(UploadError::Server(502)));

    let down = common::client_with(common::ScriptedTransport::failing(UploadError::Timeout));
    assert_eq!(down.ping().await, Err(UploadError::Timeout));
}
