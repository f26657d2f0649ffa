// Broker side of the worker: pulling deliveries and settling them

use std::sync::Arc;

use async_trait::async_trait;
use lapin::{
    options::{
        BasicAckOptions, BasicGetOptions, BasicNackOptions, BasicRejectOptions,
        ConfirmSelectOptions,
    },
    Channel, Connection,
};
use tracing::debug;

use crate::messaging::{
    broker::{open_connection, publish_envelope},
    error::{BrokerError, Result},
    topology, TaskEnvelope,
};

/// One message taken from a task queue and not yet settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDelivery {
    pub queue: String,
    pub tag: u64,
    pub redelivered: bool,
    pub body: Vec<u8>,
}

/// A consumer session's view of the broker
#[async_trait]
pub trait TaskChannel: Send + Sync {
    /// Takes the next ready message from `queue`, if there is one
    async fn fetch(&self, queue: &str) -> Result<Option<TaskDelivery>>;

    async fn ack(&self, delivery: &TaskDelivery) -> Result<()>;

    /// Hands the message back to its queue
    async fn requeue(&self, delivery: &TaskDelivery) -> Result<()>;

    /// Drops the message without requeueing
    async fn reject(&self, delivery: &TaskDelivery) -> Result<()>;

    /// Publishes with confirmation
    async fn republish(&self, queue: &str, envelope: &TaskEnvelope) -> Result<()>;

    async fn close(&self);
}

/// Opens consumer sessions
#[async_trait]
pub trait TaskConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn TaskChannel>>;
}

/// Connects to RabbitMQ and declares the task queues on every session
pub struct AmqpConnector {
    uri: String,
    connection_name: String,
}

impl AmqpConnector {
    pub fn new(uri: String, connection_name: String) -> Self {
        Self { uri, connection_name }
    }
}

#[async_trait]
impl TaskConnector for AmqpConnector {
    async fn connect(&self) -> Result<Arc<dyn TaskChannel>> {
        let connection: Connection = open_connection(&self.uri, &self.connection_name).await?;
        let channel: Channel = connection.create_channel().await.map_err(BrokerError::Channel)?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(BrokerError::Channel)?;
        topology::declare_queues(&channel).await?;

        Ok(Arc::new(AmqpTaskChannel { connection, channel }))
    }
}

/// A connection with one confirm-mode channel used for both pulling and
/// republishing
pub struct AmqpTaskChannel {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl TaskChannel for AmqpTaskChannel {
    async fn fetch(&self, queue: &str) -> Result<Option<TaskDelivery>> {
        let message = self
            .channel
            .basic_get(queue, BasicGetOptions { no_ack: false })
            .await
            .map_err(|source| BrokerError::Fetch {
                queue: queue.to_owned(),
                source,
            })?;

        Ok(message.map(|message| TaskDelivery {
            queue: queue.to_owned(),
            tag: message.delivery.delivery_tag,
            redelivered: message.delivery.redelivered,
            body: message.delivery.data,
        }))
    }

    async fn ack(&self, delivery: &TaskDelivery) -> Result<()> {
        self.channel
            .basic_ack(delivery.tag, BasicAckOptions::default())
            .await
            .map_err(|source| BrokerError::Settle { tag: delivery.tag, source })
    }

    async fn requeue(&self, delivery: &TaskDelivery) -> Result<()> {
        self.channel
            .basic_nack(delivery.tag, BasicNackOptions { multiple: false, requeue: true })
            .await
            .map_err(|source| BrokerError::Settle { tag: delivery.tag, source })
    }

    async fn reject(&self, delivery: &TaskDelivery) -> Result<()> {
        self.channel
            .basic_reject(delivery.tag, BasicRejectOptions { requeue: false })
            .await
            .map_err(|source| BrokerError::Settle { tag: delivery.tag, source })
    }

    async fn republish(&self, queue: &str, envelope: &TaskEnvelope) -> Result<()> {
        publish_envelope(&self.channel, queue, envelope).await
    }

    // Unsettled deliveries go back to their queues with the channel
    async fn close(&self) {
        if let Err(e) = self.channel.close(200, "worker stopping").await {
            debug!("Failed to close consumer channel: {e}");
        }
        if let Err(e) = self.connection.close(200, "worker stopping").await {
            debug!("Failed to close RabbitMQ connection: {e}");
        }
    }
}
