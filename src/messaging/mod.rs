// Start of file: /src/messaging/mod.rs

/*
* Message model, content classification, queue topology and the
* RabbitMQ plumbing shared by the publisher and the subscriber.
*/

pub mod broker;
pub mod classifier;
pub mod envelope;
pub mod error;
pub mod message;
pub mod topology;

pub use broker::{BrokerService, MessagePublisher};
pub use envelope::TaskEnvelope;
pub use error::BrokerError;
pub use message::{MessageInfo, MessagePriority, MessageType, PublishRequest};

// End of file: /src/messaging/mod.rs
