// Publish route definitions

use axum::{routing::post, Router};

use crate::config::state::AppState;
use super::handler;

pub fn publish_routes() -> Router<AppState> {
    Router::new()
        .route("/publish", post(handler::publish_handler))
}
