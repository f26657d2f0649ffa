// Classifies an incoming message and hands it to the broker

use serde_json::json;
use axum::{http::StatusCode, extract::State, body::Bytes};

use crate::api::publish::error::PublishError;
use crate::config::state::AppState;
use crate::messaging::{message::queue_name, MessageInfo, MessageType, PublishRequest, TaskEnvelope};
use crate::utils::response_handler::HandlerResponse;
use tracing::{instrument, info};

/// `POST /publish`: validates the body, picks the queue from the content
/// and priority, and publishes a task envelope to it
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn publish_handler(
    State(state): State<AppState>,
    body: Bytes, // Raw body so parse errors map to our own status codes
) -> Result<HandlerResponse, PublishError> {
    let request: PublishRequest = serde_json::from_slice(&body)?;
    request.validate().map_err(PublishError::Validation)?;

    let message_type: MessageType = request.determine_type();
    let queue: String = queue_name(message_type, request.priority);
    let message_info: MessageInfo = request.message_info();
    let envelope: TaskEnvelope = TaskEnvelope::from_request(&request, message_type);

    state.publisher.publish(&queue, &envelope).await?;

    info!(queue = %queue, task_id = %envelope.id, info = ?message_info, "Published message");

    Ok(HandlerResponse::new(StatusCode::OK)
        .data(json!({
            "message": format!("{message_type} message published successfully"),
            "queue": &queue,
            "task_id": &envelope.id,
            "info": message_info,
        }))
        .message(format!("Queued on {queue}")))
}
