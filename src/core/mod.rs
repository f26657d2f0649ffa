// Start of file: /src/core/mod.rs

/*
* Process plumbing: logging setup, HTTP server assembly and shutdown signals.
*/

pub mod logging;
pub mod server;

// End of file: /src/core/mod.rs
