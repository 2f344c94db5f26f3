//! Health endpoint tests.

mod common;

use common::TestHarness;
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "crm");
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let harness = TestHarness::new();

    harness.server.get("/health").await.assert_status_ok();
    harness.server.get("/companies").await.assert_status_unauthorized();
}
