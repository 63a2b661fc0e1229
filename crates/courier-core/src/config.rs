//! Worker and broker settings.
//!
//! Read from `COURIER_*` environment variables (a `.env` file is honoured),
//! falling back to `Config::default()` for anything unset.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub broker_url: String,
    pub exchange: String,
    pub exchange_type: String,
    pub default_queue: String,
    pub binding_key: String,
    /// Number of concurrent consumers per launched worker.
    pub concurrency: usize,
    /// Generated per launch when unset.
    pub consumer_tag: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_url: "memory://".to_string(),
            exchange: "courier_exchange".to_string(),
            exchange_type: "direct".to_string(),
            default_queue: "courier_tasks".to_string(),
            binding_key: "courier_task".to_string(),
            concurrency: 4,
            consumer_tag: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("COURIER_CONCURRENCY must be at least 1")]
    ZeroConcurrency,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let concurrency = match lookup("COURIER_CONCURRENCY") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| ConfigError::Invalid {
                key: "COURIER_CONCURRENCY",
                value: raw.clone(),
            })?,
            None => defaults.concurrency,
        };
        let config = Self {
            broker_url: string("COURIER_BROKER_URL", defaults.broker_url),
            exchange: string("COURIER_EXCHANGE", defaults.exchange),
            exchange_type: string("COURIER_EXCHANGE_TYPE", defaults.exchange_type),
            default_queue: string("COURIER_DEFAULT_QUEUE", defaults.default_queue),
            binding_key: string("COURIER_BINDING_KEY", defaults.binding_key),
            concurrency,
            consumer_tag: lookup("COURIER_CONSUMER_TAG").filter(|t| !t.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that hold however the config was built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}
