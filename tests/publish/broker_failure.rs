//! tests/publish/broker_failure.rs
//! A broker that refuses the message surfaces as a 500.

#[path = "../mod.rs"]
mod common;

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn unconfirmed_publish_returns_500() {
    let publisher = Arc::new(common::RecordingPublisher::failing());
    let base_url: String = common::spawn_app(&[], publisher);

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/publish", base_url))
        .json(&json!({ "content": "text me to confirm" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "INTERNAL_SERVER_ERROR");
    assert_eq!(
        json["messages"][0],
        "Failed to publish message: Broker did not confirm message for sms_medium_queue"
    );
}
