// Message types, priorities and the validated publish request

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messaging::classifier;

pub const MIN_CONTENT_CHARS: usize = 1;
pub const MAX_CONTENT_CHARS: usize = 1000;
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_RETRY_COUNT: u32 = 10;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
const PREVIEW_CHARS: usize = 50;

/// Delivery channel a message is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Sms,
    Email,
    Whatsapp,
}

impl MessageType {
    pub const ALL: [MessageType; 3] = [MessageType::Sms, MessageType::Email, MessageType::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Sms => "sms",
            MessageType::Email => "email",
            MessageType::Whatsapp => "whatsapp",
        }
    }

    /// Name of the task the worker runs for this type
    pub fn task_name(&self) -> String {
        format!("process_{}_message", self.as_str())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    High,
    #[default]
    Medium,
    Low,
}

impl MessagePriority {
    /// Highest first, the order the worker prefers when several queues are ready
    pub const ALL: [MessagePriority; 3] =
        [MessagePriority::High, MessagePriority::Medium, MessagePriority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePriority::High => "high",
            MessagePriority::Medium => "medium",
            MessagePriority::Low => "low",
        }
    }

    /// AMQP `priority` property value
    pub fn amqp_value(&self) -> u8 {
        match self {
            MessagePriority::High => 3,
            MessagePriority::Medium => 2,
            MessagePriority::Low => 1,
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /publish`, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub content: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub priority: MessagePriority,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

impl PublishRequest {
    /// Checks every field rule and returns one message per violation
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations: Vec<String> = Vec::new();

        let chars: usize = self.content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            violations.push(format!(
                "content must be at least {MIN_CONTENT_CHARS} character long"
            ));
        }
        if chars > MAX_CONTENT_CHARS {
            violations.push(format!(
                "content must be at most {MAX_CONTENT_CHARS} characters long (got {chars})"
            ));
        }

        if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&self.timeout) {
            violations.push(format!(
                "timeout must be between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS} seconds (got {})",
                self.timeout
            ));
        }

        if self.retry_count > MAX_RETRY_COUNT {
            violations.push(format!(
                "retry_count must be at most {MAX_RETRY_COUNT} (got {})",
                self.retry_count
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn determine_type(&self) -> MessageType {
        classifier::classify(&self.content)
    }

    pub fn message_info(&self) -> MessageInfo {
        MessageInfo {
            message_type: self.determine_type(),
            priority: self.priority,
            content_length: self.content.chars().count(),
            timeout: self.timeout,
            content_preview: preview(&self.content),
        }
    }
}

/// `{type}_{priority}_queue`
pub fn queue_name(message_type: MessageType, priority: MessagePriority) -> String {
    format!("{}_{}_queue", message_type, priority)
}

/// Summary returned to the caller and written to the publish log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageInfo {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub content_length: usize,
    pub timeout: u64,
    pub content_preview: String,
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_owned()
    }
}
