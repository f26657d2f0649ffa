//! Broker error types

use thiserror::Error;

/// Failures talking to RabbitMQ
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("RabbitMQ connection error: {0}")]
    Connection(#[source] lapin::Error),

    #[error("Failed to open channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("Failed to declare queue {queue}: {source}")]
    Declare {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("Failed to publish to {queue}: {source}")]
    Publish {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("Failed to fetch from {queue}: {source}")]
    Fetch {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("Failed to settle delivery {tag}: {source}")]
    Settle {
        tag: u64,
        #[source]
        source: lapin::Error,
    },

    #[error("Broker did not confirm message for {0}")]
    NotConfirmed(String),

    #[error("Failed to serialize task: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for BrokerError
pub type Result<T> = std::result::Result<T, BrokerError>;
