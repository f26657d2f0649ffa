// Wire format of a task placed on a queue

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::messaging::message::{
    MessagePriority, MessageType, PublishRequest, DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT_SECONDS,
};

/// JSON body of every AMQP message exchanged between publisher and subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: String,
    pub id: String,
    #[serde(default = "default_args")]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub priority: MessagePriority,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default)]
    pub retries: u32,
}

fn default_args() -> Vec<Value> {
    vec![Value::Object(Map::new())]
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

impl TaskEnvelope {
    /// Builds the envelope for an already-validated request
    pub fn from_request(request: &PublishRequest, message_type: MessageType) -> Self {
        Self {
            task: message_type.task_name(),
            id: Uuid::new_v4().to_string(),
            args: vec![json!({ "content": request.content })],
            kwargs: Map::new(),
            timeout: request.timeout,
            priority: request.priority,
            metadata: request.metadata.clone(),
            retry_count: request.retry_count,
            retries: 0,
        }
    }

    pub fn decode(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// `content` of the first positional argument, empty when absent
    pub fn content(&self) -> &str {
        self.args
            .first()
            .and_then(|arg| arg.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// AMQP per-message TTL in milliseconds, as the string the protocol expects
    pub fn expiration_millis(&self) -> String {
        self.timeout.saturating_mul(1000).to_string()
    }

    pub fn can_retry(&self) -> bool {
        self.retries < self.retry_count
    }

    /// Copy of this envelope for the next attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self.clone()
        }
    }
}
