// Start of file: src/main.rs

// Publisher: HTTP front that classifies messages and queues them on RabbitMQ.

use axum::{serve, Router};
use tokio::net::TcpListener;

use message_dispatch::config::{
    environment::{self, EnvironmentVariables},
    state::AppState,
};
use message_dispatch::core::{logging::init_tracing, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing first so configuration warnings are not lost
    environment::load_dotenv();
    init_tracing(&std::env::var("LOG_FORMAT").unwrap_or_default());

    let env: EnvironmentVariables = EnvironmentVariables::load()?;
    let state: AppState = AppState::with_broker(env);
    state.initialize().await;

    let app: Router = server::create_app(state.clone());
    let listener: TcpListener = server::setup_listener(&state.environment).await?;

    tracing::info!("Publisher listening on: {}", listener.local_addr()?);

    serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    state.shutdown().await;
    tracing::info!("Publisher stopped");

    Ok(())
}

// End of file: src/main.rs
