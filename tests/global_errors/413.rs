//! tests/global_errors/413.rs
//! Ensures that a payload over MAX_REQUEST_BODY_SIZE triggers 413.

#[path = "../mod.rs"]
mod common;

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_413_when_payload_exceeds_global_limit() {
    let publisher = Arc::new(common::RecordingPublisher::default());
    let base_url: String = common::spawn_app(&[("MAX_REQUEST_BODY_SIZE", "1024")], publisher.clone());

    let oversized_payload: String = format!(r#"{{"content":"{}"}}"#, "X".repeat(2048));

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/publish", base_url))
        .header("content-type", "application/json")
        .body(oversized_payload)
        .send()
        .await
        .expect("Failed to send large request.");

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "PAYLOAD_TOO_LARGE");
    assert_eq!(json["code"], 413);
    assert!(publisher.published().is_empty());
}
