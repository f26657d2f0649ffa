// RabbitMQ consume loop for the subscriber

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::environment::EnvironmentVariables;
use crate::messaging::{broker::host_label, topology};
use crate::worker::channel::{AmqpConnector, TaskChannel, TaskConnector, TaskDelivery};
use crate::worker::executor::{Settlement, TaskExecutor};
use crate::worker::gate::ConcurrencyGate;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Reconnect delay: 1s doubling up to 30s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { next: INITIAL_BACKOFF }
    }
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let delay: Duration = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }
}

/// How a consumer session ended
struct Session {
    fetched: u64,
    outcome: Result<()>,
}

/// Subscriber worker: pulls from every task queue, highest priority first,
/// and runs at most `concurrency` tasks at a time
#[derive(Clone)]
pub struct Worker {
    connector: Arc<dyn TaskConnector>,
    executor: Arc<TaskExecutor>,
    gate: ConcurrencyGate,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(env: &EnvironmentVariables, executor: TaskExecutor) -> Self {
        let connector = AmqpConnector::new(env.amqp_uri(), format!("subscriber@{}", host_label()));

        Self::with_connector(
            Arc::new(connector),
            executor,
            env.worker_concurrency,
            env.worker_poll_interval,
        )
    }

    pub fn with_connector(
        connector: Arc<dyn TaskConnector>,
        executor: TaskExecutor,
        concurrency: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            connector,
            executor: Arc::new(executor),
            gate: ConcurrencyGate::new(concurrency),
            poll_interval,
        }
    }

    /// Runs until `shutdown` flips to true. Broken sessions are re-opened
    /// after a backoff that only resets once a session has taken work.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(concurrency = self.gate.limit(), "Starting worker");
        let mut backoff: Backoff = Backoff::default();

        loop {
            let channel: Arc<dyn TaskChannel> = tokio::select! {
                channel = self.connect(&mut backoff) => channel,
                _ = shutdown.wait_for(|stop| *stop) => break,
            };

            let session: Session = self.consume(&channel, shutdown.clone()).await;
            channel.close().await;

            match session.outcome {
                Ok(()) => break,
                Err(e) => error!(fetched = session.fetched, "Consumer session ended: {e:#}"),
            }

            if session.fetched > 0 {
                backoff.reset();
            }
            let delay: Duration = backoff.next_delay();
            warn!(retry_in_secs = delay.as_secs(), "Reconnecting to RabbitMQ");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    async fn connect(&self, backoff: &mut Backoff) -> Arc<dyn TaskChannel> {
        let mut attempt: u32 = 1;

        loop {
            match self.connector.connect().await {
                Ok(channel) => {
                    info!(attempt, "Connected to RabbitMQ");
                    return channel;
                }
                Err(e) => {
                    let delay: Duration = backoff.next_delay();
                    warn!(attempt, retry_in_secs = delay.as_secs(), "{e}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One consumer session. Ends Ok when shutdown was requested, Err when
    /// the channel broke.
    async fn consume(&self, channel: &Arc<dyn TaskChannel>, mut shutdown: watch::Receiver<bool>) -> Session {
        let mut fetched: u64 = 0;
        info!(queues = ?topology::all_queues(), "Waiting for tasks");

        let outcome: Result<()> = loop {
            // Take a slot first so nothing is pulled that cannot run yet
            let permit = tokio::select! {
                permit = self.gate.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(e) => break Err(anyhow!(e).context("Concurrency gate closed")),
                },
                _ = shutdown.wait_for(|stop| *stop) => break Ok(()),
            };

            let delivery: TaskDelivery = tokio::select! {
                next = self.next_delivery(channel.as_ref()) => match next {
                    Ok(delivery) => delivery,
                    Err(e) => break Err(e),
                },
                _ = shutdown.wait_for(|stop| *stop) => break Ok(()),
            };
            fetched += 1;

            let executor: Arc<TaskExecutor> = self.executor.clone();
            let channel: Arc<dyn TaskChannel> = channel.clone();

            tokio::spawn(async move {
                let _permit = permit;
                settle(&executor, channel.as_ref(), delivery).await;
            });
        };

        // Let running tasks settle before the channel goes away
        let in_flight: usize = self.gate.in_flight();
        if in_flight > 0 {
            info!(in_flight, "Waiting for running tasks");
        }
        if self.gate.drain().await.is_err() {
            warn!("Concurrency gate closed while draining");
        }

        Session { fetched, outcome }
    }

    /// Waits for the next message, checking the queues highest priority
    /// first on every pass
    async fn next_delivery(&self, channel: &dyn TaskChannel) -> Result<TaskDelivery> {
        let queues: Vec<String> = topology::all_queues();

        loop {
            for queue in &queues {
                if let Some(delivery) = channel.fetch(queue).await? {
                    return Ok(delivery);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Runs the delivery's task and settles it with the broker
async fn settle(executor: &TaskExecutor, channel: &dyn TaskChannel, delivery: TaskDelivery) {
    debug!(queue = %delivery.queue, redelivered = delivery.redelivered, "Delivery received");

    let settlement: Settlement = executor.process(&delivery.body).await;

    let settled = match settlement {
        Settlement::Ack => channel.ack(&delivery).await,
        Settlement::Retry(next) => match channel.republish(&delivery.queue, &next).await {
            Ok(()) => channel.ack(&delivery).await,
            Err(e) => {
                // Keep the delivery rather than lose the task
                error!(queue = %delivery.queue, "Failed to publish retry: {e}");
                channel.requeue(&delivery).await
            }
        },
        Settlement::Reject => channel.reject(&delivery).await,
    };

    if let Err(e) = settled {
        error!(queue = %delivery.queue, "Failed to settle delivery: {e}");
    }
}
