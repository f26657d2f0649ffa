//! tests/mod.rs
//! Shared helpers: spawn the publisher app on an ephemeral port with an
//! in-memory publisher standing in for RabbitMQ, and an in-memory broker
//! for driving the subscriber worker.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{serve, Router};
use message_dispatch::config::{environment::EnvironmentVariables, state::AppState};
use message_dispatch::core::server::create_app;
use message_dispatch::messaging::{broker::MessagePublisher, error::Result, BrokerError, TaskEnvelope};
use message_dispatch::worker::{
    ProcessingProfile, TaskChannel, TaskConnector, TaskDelivery, TaskExecutor, TaskRegistry, Worker,
};
use serde_json::json;
use tokio::net::TcpListener as TokioTcpListener;
use tokio::time::Instant;

/// Records every publish instead of talking to a broker
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, TaskEnvelope)>>,
    delay: Duration,
    fail: bool,
}

impl RecordingPublisher {
    pub fn delayed(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn published(&self) -> Vec<(String, TaskEnvelope)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, queue: &str, envelope: &TaskEnvelope) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(BrokerError::NotConfirmed(queue.to_owned()));
        }
        self.published
            .lock()
            .unwrap()
            .push((queue.to_owned(), envelope.clone()));
        Ok(())
    }
}

/// Spawns the app on a random unused port and returns its base URL.
pub fn spawn_app(vars: &[(&str, &str)], publisher: Arc<RecordingPublisher>) -> String {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let env: EnvironmentVariables =
        EnvironmentVariables::from_vars(&vars).expect("Invalid test environment");
    let state: AppState = AppState::new(Arc::new(env), publisher);

    // * Same router and layers as the publisher binary
    let app: Router = create_app(state);

    // * Bind an ephemeral port using std::net::TcpListener.
    let std_listener: std::net::TcpListener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    std_listener.set_nonblocking(true).unwrap();

    let tokio_listener: TokioTcpListener = TokioTcpListener::from_std(std_listener)
        .expect("Failed to convert to tokio listener");

    let addr: std::net::SocketAddr = tokio_listener.local_addr().unwrap();

    // * Spawn the server in a background task.
    tokio::spawn(async move {
        serve(tokio_listener, app)
            .await
            .expect("Server failed");
    });

    format!("http://{}", addr)
}

/// App with default settings and a recording publisher
pub fn spawn_default_app() -> (String, Arc<RecordingPublisher>) {
    let publisher: Arc<RecordingPublisher> = Arc::new(RecordingPublisher::default());
    (spawn_app(&[], publisher.clone()), publisher)
}

/// What the worker did against the in-memory broker, in order
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Fetched(String),
    Acked(String),
    Requeued(String),
    Rejected(String),
    Republished(String, TaskEnvelope),
    Closed,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<(Vec<u8>, bool)>>,
    next_tag: u64,
    events: Vec<BrokerEvent>,
    connects: Vec<Instant>,
    failing_connects: usize,
    failing_fetches: bool,
    failing_republish: bool,
}

/// In-memory RabbitMQ for the worker: queues of raw bodies, settlements
/// recorded as events
#[derive(Debug, Clone, Default)]
pub struct FakeBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl FakeBroker {
    pub fn push(&self, queue: &str, body: &str) {
        self.state
            .lock()
            .unwrap()
            .queues
            .entry(queue.to_owned())
            .or_default()
            .push_back((body.as_bytes().to_vec(), false));
    }

    pub fn fail_first_connects(&self, count: usize) {
        self.state.lock().unwrap().failing_connects = count;
    }

    pub fn fail_fetches(&self) {
        self.state.lock().unwrap().failing_fetches = true;
    }

    pub fn fail_republish(&self) {
        self.state.lock().unwrap().failing_republish = true;
    }

    pub fn events(&self) -> Vec<BrokerEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fetched_queues(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BrokerEvent::Fetched(queue) => Some(queue),
                _ => None,
            })
            .collect()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connects.clone()
    }

    fn record(&self, event: BrokerEvent) {
        self.state.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl TaskConnector for FakeBroker {
    async fn connect(&self) -> Result<Arc<dyn TaskChannel>> {
        let mut state = self.state.lock().unwrap();
        state.connects.push(Instant::now());

        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(BrokerError::Connection(lapin::Error::InvalidConnectionState(
                lapin::ConnectionState::Closed,
            )));
        }

        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl TaskChannel for FakeBroker {
    async fn fetch(&self, queue: &str) -> Result<Option<TaskDelivery>> {
        let mut state = self.state.lock().unwrap();

        if state.failing_fetches {
            return Err(BrokerError::Fetch {
                queue: queue.to_owned(),
                source: lapin::Error::InvalidChannelState(lapin::ChannelState::Closed),
            });
        }

        let Some((body, redelivered)) = state.queues.get_mut(queue).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        state.next_tag += 1;
        let tag: u64 = state.next_tag;
        state.events.push(BrokerEvent::Fetched(queue.to_owned()));

        Ok(Some(TaskDelivery {
            queue: queue.to_owned(),
            tag,
            redelivered,
            body,
        }))
    }

    async fn ack(&self, delivery: &TaskDelivery) -> Result<()> {
        self.record(BrokerEvent::Acked(delivery.queue.clone()));
        Ok(())
    }

    async fn requeue(&self, delivery: &TaskDelivery) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(BrokerEvent::Requeued(delivery.queue.clone()));
        state
            .queues
            .entry(delivery.queue.clone())
            .or_default()
            .push_front((delivery.body.clone(), true));
        Ok(())
    }

    async fn reject(&self, delivery: &TaskDelivery) -> Result<()> {
        self.record(BrokerEvent::Rejected(delivery.queue.clone()));
        Ok(())
    }

    async fn republish(&self, queue: &str, envelope: &TaskEnvelope) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.failing_republish {
            return Err(BrokerError::NotConfirmed(queue.to_owned()));
        }

        state
            .events
            .push(BrokerEvent::Republished(queue.to_owned(), envelope.clone()));
        state
            .queues
            .entry(queue.to_owned())
            .or_default()
            .push_back((envelope.encode()?, false));
        Ok(())
    }

    async fn close(&self) {
        self.record(BrokerEvent::Closed);
    }
}

/// Polls the broker's events until `done` holds; panics after a minute of
/// (usually paused) test time
pub async fn wait_until(broker: &FakeBroker, done: impl Fn(&[BrokerEvent]) -> bool) {
    for _ in 0..6_000 {
        if done(&broker.events()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never reached, events: {:?}", broker.events());
}

/// Worker with concurrency 1 pulling from `broker`
pub fn worker(broker: &FakeBroker, registry: TaskRegistry, profile: ProcessingProfile) -> Worker {
    Worker::with_connector(
        Arc::new(broker.clone()),
        TaskExecutor::new(registry, profile),
        1,
        Duration::from_millis(100),
    )
}

/// Envelope body as the publisher would send it
pub fn task_body(task: &str, id: &str, priority: &str) -> String {
    json!({
        "task": task,
        "id": id,
        "args": [{ "content": format!("payload {id}") }],
        "timeout": 30,
        "priority": priority,
    })
    .to_string()
}
