// Start of file: /src/api/mod.rs

/*
* HTTP surface of the publisher: liveness and message publishing.
*/

pub mod health;
pub mod publish;

// End of file: /src/api/mod.rs
