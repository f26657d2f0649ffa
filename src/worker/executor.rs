// Runs one task envelope and decides how its delivery is settled

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::environment::EnvironmentVariables;
use crate::messaging::{MessagePriority, TaskEnvelope};
use crate::worker::error::TaskError;
use crate::worker::tasks::{TaskOutcome, TaskRegistry};

/// Simulated work time per priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingProfile {
    pub high_priority: Duration,
    pub default: Duration,
}

impl ProcessingProfile {
    pub fn from_env(env: &EnvironmentVariables) -> Self {
        Self {
            high_priority: env.high_priority_delay,
            default: env.default_delay,
        }
    }

    /// No simulated delay
    pub fn immediate() -> Self {
        Self {
            high_priority: Duration::ZERO,
            default: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, priority: MessagePriority) -> Duration {
        match priority {
            MessagePriority::High => self.high_priority,
            MessagePriority::Medium | MessagePriority::Low => self.default,
        }
    }
}

/// What to do with a delivery once its task has run
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Done, remove from the queue
    Ack,
    /// Publish this next attempt to the same queue, then ack this delivery
    Retry(TaskEnvelope),
    /// Drop without requeueing
    Reject,
}

impl Settlement {
    pub fn for_result(envelope: &TaskEnvelope, result: &Result<TaskOutcome, TaskError>) -> Self {
        match result {
            Ok(_) => Settlement::Ack,
            Err(e) if e.is_retryable() && envelope.can_retry() => {
                Settlement::Retry(envelope.next_attempt())
            }
            Err(_) => Settlement::Reject,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskExecutor {
    registry: TaskRegistry,
    profile: ProcessingProfile,
}

impl TaskExecutor {
    pub fn new(registry: TaskRegistry, profile: ProcessingProfile) -> Self {
        Self { registry, profile }
    }

    /// Runs the envelope's task. Simulated work and the handler together
    /// must finish within the envelope's timeout.
    pub async fn execute(&self, envelope: &TaskEnvelope) -> Result<TaskOutcome, TaskError> {
        let handler = self
            .registry
            .get(&envelope.task)
            .ok_or_else(|| TaskError::UnknownTask(envelope.task.clone()))?;

        info!(
            task_id = %envelope.id,
            task = %envelope.task,
            received_at = %Utc::now().format("%Y-%m-%d %H:%M:%S"),
            priority = %envelope.priority,
            timeout_secs = envelope.timeout,
            retries = envelope.retries,
            retry_count = envelope.retry_count,
            metadata = ?envelope.metadata,
            "Received task"
        );

        let started: Instant = Instant::now();
        let delay: Duration = self.profile.delay_for(envelope.priority);

        let work = async {
            tokio::time::sleep(delay).await;
            handler.handle(envelope).await
        };

        let outcome: TaskOutcome = tokio::time::timeout(Duration::from_secs(envelope.timeout), work)
            .await
            .map_err(|_| TaskError::Timeout { seconds: envelope.timeout })??;

        info!(
            task_id = %envelope.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Processing completed"
        );

        Ok(outcome)
    }

    /// Decodes a raw delivery body, runs it and returns the settlement
    pub async fn process(&self, body: &[u8]) -> Settlement {
        let envelope: TaskEnvelope = match TaskEnvelope::decode(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(
                    raw_body = %String::from_utf8_lossy(body),
                    "{}",
                    TaskError::from(e)
                );
                return Settlement::Reject;
            }
        };

        let result: Result<TaskOutcome, TaskError> = self.execute(&envelope).await;
        let settlement: Settlement = Settlement::for_result(&envelope, &result);

        if let Err(e) = &result {
            match &settlement {
                Settlement::Retry(next) => warn!(
                    task_id = %envelope.id,
                    attempt = next.retries,
                    retry_count = envelope.retry_count,
                    "{e}, retrying"
                ),
                _ => error!(task_id = %envelope.id, retries = envelope.retries, "{e}, giving up"),
            }
        }

        settlement
    }
}
