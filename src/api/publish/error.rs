//! Errors returned by the publish endpoint

use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::messaging::BrokerError;
use crate::utils::response_handler::HandlerResponse;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Invalid message: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Failed to publish message: {0}")]
    Broker(#[from] BrokerError),
}

impl PublishError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PublishError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            PublishError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PublishError::Broker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Missing fields and wrong types are validation failures; anything that
/// is not JSON at all is a malformed body
impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            PublishError::Validation(vec![err.to_string()])
        } else {
            PublishError::MalformedBody(err.to_string())
        }
    }
}

impl IntoResponse for PublishError {
    fn into_response(self) -> Response {
        let status: StatusCode = self.status_code();

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let messages: Vec<String> = match self {
            PublishError::Validation(violations) => violations,
            other => vec![other.to_string()],
        };

        HandlerResponse::new(status)
            .data(json!({ "error": status.canonical_reason() }))
            .messages(messages)
            .into_response()
    }
}
