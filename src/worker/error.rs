//! Task execution errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Undecodable task body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No handler registered for task {0}")]
    UnknownTask(String),

    #[error("Message processing exceeded timeout of {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Task failed: {0}")]
    Handler(String),
}

impl TaskError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Timeout { .. } | TaskError::Handler(_))
    }
}
