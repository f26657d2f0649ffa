use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions},
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::environment::EnvironmentVariables;
use crate::messaging::envelope::TaskEnvelope;
use crate::messaging::error::{BrokerError, Result};
use crate::messaging::topology::{self, DEFAULT_EXCHANGE};

const PERSISTENT: u8 = 2;

/// Anything the publish endpoint can hand a task envelope to
#[async_trait]
pub trait MessagePublisher: Send + Sync + fmt::Debug {
    async fn publish(&self, queue: &str, envelope: &TaskEnvelope) -> Result<()>;

    /// Eager setup at startup
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) {}
}

/// Long-lived RabbitMQ connection for the publisher. Connects lazily and
/// reconnects when the previous connection dropped.
#[derive(Clone)]
pub struct BrokerService {
    uri: String,
    connection_name: String,
    connection: Arc<Mutex<Option<Arc<Connection>>>>,
}

impl fmt::Debug for BrokerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // URI carries credentials
        f.debug_struct("BrokerService")
            .field("connection_name", &self.connection_name)
            .finish_non_exhaustive()
    }
}

impl BrokerService {
    pub fn new(env: Arc<EnvironmentVariables>) -> Self {
        Self {
            uri: env.amqp_uri(),
            connection_name: format!("publisher@{}", host_label()),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the live connection, opening a new one if needed
    async fn connection(&self) -> Result<Arc<Connection>> {
        let mut guard = self.connection.lock().await;

        if let Some(conn) = guard.as_ref() {
            if conn.status().connected() {
                return Ok(conn.clone());
            }
            warn!("RabbitMQ connection lost, reconnecting");
        }

        let conn: Arc<Connection> = Arc::new(open_connection(&self.uri, &self.connection_name).await?);

        let channel: Channel = conn.create_channel().await.map_err(BrokerError::Channel)?;
        topology::declare_queues(&channel).await?;
        if let Err(e) = channel.close(200, "topology declared").await {
            debug!("Failed to close declare channel: {e}");
        }

        *guard = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl MessagePublisher for BrokerService {
    async fn publish(&self, queue: &str, envelope: &TaskEnvelope) -> Result<()> {
        let conn: Arc<Connection> = self.connection().await?;

        let channel: Channel = conn.create_channel().await.map_err(BrokerError::Channel)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(BrokerError::Channel)?;

        let result: Result<()> = publish_envelope(&channel, queue, envelope).await;

        if let Err(e) = channel.close(200, "published").await {
            debug!("Failed to close publish channel: {e}");
        }

        result
    }

    /// Connects and declares the queues
    async fn initialize(&self) -> Result<()> {
        self.connection().await?;
        info!("RabbitMQ connection established successfully");
        Ok(())
    }

    /// Closes the connection if one is open
    async fn shutdown(&self) {
        if let Some(conn) = self.connection.lock().await.take() {
            match conn.close(200, "publisher shutting down").await {
                Ok(()) => info!("RabbitMQ connection closed"),
                Err(e) => warn!("Failed to close RabbitMQ connection: {e}"),
            }
        }
    }
}

/// Opens a connection to the broker at `uri`
pub async fn open_connection(uri: &str, connection_name: &str) -> Result<Connection> {
    let properties: ConnectionProperties =
        ConnectionProperties::default().with_connection_name(connection_name.to_owned().into());

    Connection::connect(uri, properties)
        .await
        .map_err(BrokerError::Connection)
}

/// AMQP properties for an envelope: persistent JSON, expiring after the
/// task timeout, with the priority mapped to 1..=3
pub fn properties_for(envelope: &TaskEnvelope) -> BasicProperties {
    BasicProperties::default()
        .with_delivery_mode(PERSISTENT)
        .with_content_type("application/json".into())
        .with_content_encoding("utf-8".into())
        .with_expiration(envelope.expiration_millis().into())
        .with_priority(envelope.priority.amqp_value())
        .with_message_id(envelope.id.clone().into())
}

/// Publishes on a channel that already has publisher confirms enabled and
/// waits for the broker's confirmation
pub async fn publish_envelope(channel: &Channel, queue: &str, envelope: &TaskEnvelope) -> Result<()> {
    let payload: Vec<u8> = envelope.encode()?;

    let confirmation = channel
        .basic_publish(
            DEFAULT_EXCHANGE,
            queue,
            BasicPublishOptions::default(),
            &payload,
            properties_for(envelope),
        )
        .await
        .map_err(|source| BrokerError::Publish {
            queue: queue.to_owned(),
            source,
        })?
        .await
        .map_err(|source| BrokerError::Publish {
            queue: queue.to_owned(),
            source,
        })?;

    if confirmation.is_nack() {
        return Err(BrokerError::NotConfirmed(queue.to_owned()));
    }

    debug!(queue = %queue, task_id = %envelope.id, "Published task");
    Ok(())
}

/// Hostname for connection names and consumer tags
pub fn host_label() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}
