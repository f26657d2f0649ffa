// Queue layout shared by both sides: one durable queue per type and priority,
// bound to the default direct exchange under its own name.

use lapin::{options::QueueDeclareOptions, types::FieldTable, Channel};
use tracing::debug;

use crate::messaging::error::{BrokerError, Result};
use crate::messaging::message::{queue_name, MessagePriority, MessageType};

/// Default exchange; routing key equals queue name
pub const DEFAULT_EXCHANGE: &str = "";

/// Every queue of one priority level
pub fn queues_for(priority: MessagePriority) -> Vec<String> {
    MessageType::ALL
        .iter()
        .map(|message_type| queue_name(*message_type, priority))
        .collect()
}

/// All nine queues, highest priority first
pub fn all_queues() -> Vec<String> {
    MessagePriority::ALL
        .iter()
        .flat_map(|priority| queues_for(*priority))
        .collect()
}

/// Declares every queue as durable. Idempotent on the broker side.
pub async fn declare_queues(channel: &Channel) -> Result<()> {
    for queue in all_queues() {
        channel
            .queue_declare(
                &queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| BrokerError::Declare {
                queue: queue.clone(),
                source,
            })?;

        debug!(queue = %queue, "Declared queue");
    }

    Ok(())
}
