// Start of file: src/bin/subscriber.rs

// Subscriber: consumes the task queues and runs one task at a time.

use tokio::sync::watch;

use message_dispatch::config::environment::{self, EnvironmentVariables};
use message_dispatch::core::{logging::init_tracing, server::shutdown_signal};
use message_dispatch::worker::{ProcessingProfile, TaskExecutor, TaskRegistry, Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    environment::load_dotenv();
    init_tracing(&std::env::var("LOG_FORMAT").unwrap_or_default());

    let env: EnvironmentVariables = EnvironmentVariables::load()?;

    tracing::info!(
        rabbitmq_host = %env.rabbitmq_host,
        concurrency = env.worker_concurrency,
        poll_interval_ms = env.worker_poll_interval.as_millis() as u64,
        "Starting subscriber"
    );

    let registry: TaskRegistry = TaskRegistry::with_defaults();
    tracing::info!(tasks = ?registry.task_names(), "Registered tasks");

    let executor: TaskExecutor = TaskExecutor::new(registry, ProcessingProfile::from_env(&env));
    let worker: Worker = Worker::new(&env, executor);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    worker.run(stop_rx).await
}

// End of file: src/bin/subscriber.rs
