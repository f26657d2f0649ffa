// Start of file: /src/worker/mod.rs

/*
* Subscriber side: task handlers, execution with timeouts, settlement
* decisions, the concurrency gate and the RabbitMQ pull loop.
*/

pub mod channel;
pub mod consumer;
pub mod error;
pub mod executor;
pub mod gate;
pub mod tasks;

pub use channel::{AmqpConnector, TaskChannel, TaskConnector, TaskDelivery};
pub use consumer::{Backoff, Worker};
pub use error::TaskError;
pub use executor::{ProcessingProfile, Settlement, TaskExecutor};
pub use gate::ConcurrencyGate;
pub use tasks::{TaskHandler, TaskOutcome, TaskRegistry};

// End of file: /src/worker/mod.rs
