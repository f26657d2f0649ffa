// Start of file: /src/core/logging.rs

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "message_dispatch=info,publisher=info,subscriber=info,lapin=warn";

/// Builds the filter from RUST_LOG, then LOG_LEVEL, then the defaults
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            std::env::var("LOG_LEVEL")
                .map_err(anyhow::Error::from)
                .and_then(|level| EnvFilter::try_new(level).map_err(anyhow::Error::from))
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

// Initialize the tracing subscriber. `json` emits one JSON object per line
// for the container log driver.
pub fn init_tracing(log_format: &str) {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_target(true);

    let result = if log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized");
    }
}

// End of file: /src/core/logging.rs
