//! tests/publish/validation.rs
//! Bad bodies are refused before anything reaches the broker.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn out_of_range_fields_return_422() {
    let (base_url, publisher) = common::spawn_default_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/publish", base_url))
        .json(&json!({ "content": "", "timeout": 500 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "UNPROCESSABLE_ENTITY");
    assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn missing_content_returns_422() {
    let (base_url, publisher) = common::spawn_default_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/publish", base_url))
        .json(&json!({ "priority": "high" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn unparseable_body_returns_400() {
    let (base_url, publisher) = common::spawn_default_app();

    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}/publish", base_url))
        .header("content-type", "application/json")
        .body("{\"content\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 400);
    assert!(json["messages"][0]
        .as_str()
        .unwrap()
        .starts_with("Malformed request body"));
    assert!(publisher.published().is_empty());
}
