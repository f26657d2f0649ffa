// Task handlers and the name -> handler registry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::messaging::{MessageType, TaskEnvelope};
use crate::worker::error::TaskError;

/// Result reported for a finished task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

impl TaskOutcome {
    pub fn success(message_type: MessageType) -> Self {
        Self { status: "success", message_type }
    }
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, envelope: &TaskEnvelope) -> Result<TaskOutcome, TaskError>;
}

/// Delivers a message over one channel. Delivery itself is a log line;
/// real gateways plug in as their own handlers.
#[derive(Debug, Clone, Copy)]
pub struct ChannelHandler {
    message_type: MessageType,
}

impl ChannelHandler {
    pub fn new(message_type: MessageType) -> Self {
        Self { message_type }
    }
}

#[async_trait]
impl TaskHandler for ChannelHandler {
    async fn handle(&self, envelope: &TaskEnvelope) -> Result<TaskOutcome, TaskError> {
        info!(
            task_id = %envelope.id,
            channel = %self.message_type,
            content = %envelope.content(),
            "Processing {} message",
            self.message_type.as_str().to_uppercase()
        );

        Ok(TaskOutcome::success(self.message_type))
    }
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `process_{type}_message` for every message type
    pub fn with_defaults() -> Self {
        MessageType::ALL
            .iter()
            .fold(Self::new(), |registry, message_type| {
                registry.register(message_type.task_name(), ChannelHandler::new(*message_type))
            })
    }

    pub fn register(mut self, name: impl Into<String>, handler: impl TaskHandler + 'static) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.task_names())
            .finish()
    }
}
