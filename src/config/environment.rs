// Start of file: /src/config/environment.rs

// * Environment configuration shared by the publisher and the subscriber,
// * loaded once at startup by each binary.

use std::{borrow::Cow, collections::HashMap, str::FromStr, time::Duration};
// * anyhow for convenient error handling
use anyhow::{bail, Context, Result};
use tracing::warn;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_BODY_SIZE: usize = 2_097_152; // 2MB
const DEFAULT_TIMEOUT: u64 = 10; // matches the 10s health check timeout
const DEFAULT_RABBITMQ_HOST: &str = "rabbitmq";
const DEFAULT_RABBITMQ_PORT: u16 = 5672;
const DEFAULT_RABBITMQ_USER: &str = "user";
const DEFAULT_RABBITMQ_PASS: &str = "password";
const DEFAULT_RABBITMQ_VHOST: &str = "/";
const DEFAULT_HEARTBEAT: u16 = 60;
const DEFAULT_WORKER_CONCURRENCY: usize = 1;
const MAX_WORKER_CONCURRENCY: usize = u16::MAX as usize;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_HIGH_PRIORITY_DELAY_MS: u64 = 2_000;
const DEFAULT_DELAY_MS: u64 = 4_000;

// * A struct containing all environment variables used by the app
#[derive(Clone, Debug)]
pub struct EnvironmentVariables {
    pub environment: Cow<'static, str>,
    pub host: Cow<'static, str>,
    pub port: u16,
    pub max_request_body_size: usize,
    pub default_timeout_seconds: u64,
    pub rabbitmq_host: Cow<'static, str>,
    pub rabbitmq_port: u16,
    pub rabbitmq_user: Cow<'static, str>,
    pub rabbitmq_pass: Cow<'static, str>,
    pub rabbitmq_vhost: Cow<'static, str>,
    pub broker_heartbeat_seconds: u16,
    pub worker_concurrency: usize,
    pub worker_poll_interval: Duration,
    pub high_priority_delay: Duration,
    pub default_delay: Duration,
}

impl EnvironmentVariables {
    // * Loads environment variables from the process and, outside
    // * production, from a .env file.
    pub fn load() -> Result<Self> {
        load_dotenv();

        // * Collect all environment vars from the system and .env
        let vars: HashMap<String, String> = std::env::vars().collect();

        Self::from_vars(&vars)
    }

    // * Builds the configuration from an explicit key/value map,
    // * providing defaults for anything missing.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get_var = |key: &str| vars.get(key).map(String::as_str);

        let owned_or = |key: &str, default: &'static str| -> Cow<'static, str> {
            get_var(key)
                .map(|s| Cow::Owned(s.to_owned()))
                .unwrap_or(Cow::Borrowed(default))
        };

        let worker_concurrency: usize =
            parse_or(get_var("WORKER_CONCURRENCY"), "WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY)?;
        if !(1..=MAX_WORKER_CONCURRENCY).contains(&worker_concurrency) {
            bail!("WORKER_CONCURRENCY must be between 1 and {MAX_WORKER_CONCURRENCY}");
        }

        Ok(Self {
            environment: get_var("ENVIRONMENT")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing ENVIRONMENT, defaulting to '{DEFAULT_ENVIRONMENT}'");
                    Cow::Borrowed(DEFAULT_ENVIRONMENT)
                }),

            host: owned_or("HOST", DEFAULT_HOST),

            port: parse_or(get_var("PORT"), "PORT", DEFAULT_PORT)?,

            max_request_body_size: parse_or(
                get_var("MAX_REQUEST_BODY_SIZE"),
                "MAX_REQUEST_BODY_SIZE",
                DEFAULT_MAX_BODY_SIZE,
            )?,

            default_timeout_seconds: parse_or(
                get_var("DEFAULT_TIMEOUT_SECONDS"),
                "DEFAULT_TIMEOUT_SECONDS",
                DEFAULT_TIMEOUT,
            )?,

            rabbitmq_host: get_var("RABBITMQ_HOST")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing RABBITMQ_HOST, defaulting to '{DEFAULT_RABBITMQ_HOST}'");
                    Cow::Borrowed(DEFAULT_RABBITMQ_HOST)
                }),

            rabbitmq_port: parse_or(get_var("RABBITMQ_PORT"), "RABBITMQ_PORT", DEFAULT_RABBITMQ_PORT)?,

            rabbitmq_user: get_var("RABBITMQ_USER")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing RABBITMQ_USER, defaulting to '{DEFAULT_RABBITMQ_USER}'");
                    Cow::Borrowed(DEFAULT_RABBITMQ_USER)
                }),

            rabbitmq_pass: get_var("RABBITMQ_PASS")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing RABBITMQ_PASS, using the default password");
                    Cow::Borrowed(DEFAULT_RABBITMQ_PASS)
                }),

            rabbitmq_vhost: owned_or("RABBITMQ_VHOST", DEFAULT_RABBITMQ_VHOST),

            broker_heartbeat_seconds: parse_or(
                get_var("BROKER_HEARTBEAT_SECONDS"),
                "BROKER_HEARTBEAT_SECONDS",
                DEFAULT_HEARTBEAT,
            )?,

            worker_concurrency,

            worker_poll_interval: Duration::from_millis(parse_or(
                get_var("WORKER_POLL_INTERVAL_MS"),
                "WORKER_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),

            high_priority_delay: Duration::from_millis(parse_or(
                get_var("WORKER_HIGH_PRIORITY_DELAY_MS"),
                "WORKER_HIGH_PRIORITY_DELAY_MS",
                DEFAULT_HIGH_PRIORITY_DELAY_MS,
            )?),

            default_delay: Duration::from_millis(parse_or(
                get_var("WORKER_DEFAULT_DELAY_MS"),
                "WORKER_DEFAULT_DELAY_MS",
                DEFAULT_DELAY_MS,
            )?),
        })
    }

    // * AMQP URI for the configured broker. Credentials and vhost are
    // * percent-encoded, so the default "/" vhost becomes "%2F".
    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}?heartbeat={}",
            urlencoding::encode(&self.rabbitmq_user),
            urlencoding::encode(&self.rabbitmq_pass),
            self.rabbitmq_host,
            self.rabbitmq_port,
            urlencoding::encode(&self.rabbitmq_vhost),
            self.broker_heartbeat_seconds,
        )
    }
}

// * Reads .env into the process environment outside production. Safe to call
// * more than once; variables already set are never overridden.
pub fn load_dotenv() {
    if std::env::var("ENVIRONMENT").unwrap_or_default() != "production" {
        dotenv::dotenv().ok();
    }
}

fn parse_or<T>(raw: Option<&str>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|s| s.trim().parse::<T>().with_context(|| format!("Invalid {key} value")))
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}


// End of file: /src/config/environment.rs
