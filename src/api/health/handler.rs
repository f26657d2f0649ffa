// Liveness endpoint probed by the container health check

use serde_json::json;
use axum::http::StatusCode;

use crate::utils::response_handler::HandlerResponse;
use tracing::{instrument, debug};

/// Answers as long as the process is serving requests
#[instrument]
pub async fn liveness_handler() -> HandlerResponse {
    debug!("Liveness probe");

    HandlerResponse::new(StatusCode::OK)
        .data(json!({ "status": "alive" }))
}
