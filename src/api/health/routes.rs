// Health route definitions

use axum::{routing::get, Router};

use crate::config::state::AppState;
use super::handler;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::liveness_handler))
}
