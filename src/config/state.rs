// Application state shared by the publisher's handlers

use std::sync::Arc;
use crate::config::environment::EnvironmentVariables;
use crate::messaging::{BrokerService, MessagePublisher};

#[derive(Debug, Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub publisher: Arc<dyn MessagePublisher>,
}

impl AppState {
    /// Creates a state around an explicit publisher
    pub fn new(environment: Arc<EnvironmentVariables>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { environment, publisher }
    }

    /// State for the publisher binary, backed by RabbitMQ
    pub fn with_broker(environment: EnvironmentVariables) -> Self {
        let environment: Arc<EnvironmentVariables> = Arc::new(environment);
        let broker: BrokerService = BrokerService::new(environment.clone());

        Self::new(environment, Arc::new(broker))
    }

    /// Connects to the broker ahead of the first request. A broker that is
    /// not up yet is only logged; publishing reconnects on demand.
    pub async fn initialize(&self) {
        match self.publisher.initialize().await {
            Ok(()) => tracing::info!("Broker initialized successfully"),
            Err(e) => tracing::warn!("Broker not reachable at startup, will retry on publish: {e}"),
        }
    }

    /// Gracefully close broker connections
    pub async fn shutdown(&self) {
        self.publisher.shutdown().await;
    }
}
