// Library root for the message dispatch publisher and subscriber

pub mod api;
pub mod config;
pub mod core;
pub mod messaging;
pub mod utils;
pub mod worker;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
pub use crate::messaging::{BrokerService, MessagePublisher, TaskEnvelope};
pub use crate::worker::Worker;
