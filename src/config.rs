//! YAML service configuration.
//!
//! Every field has a default, so an empty file is a valid in-memory setup.

use crate::model::{Stock, DEFAULT_STOCK_SEED};
use crate::notifier::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to parse stock seed {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LomsConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub stock: StockConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Keep ledgers and the outbox in memory instead of Postgres.
    pub in_memory: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { in_memory: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub order_topic: String,
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    pub connect_attempts: u32,
    pub connect_backoff_ms: u64,
    pub connect_max_backoff_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            order_topic: "loms.order-events".to_string(),
            poll_interval_ms: 500,
            batch_size: 10,
            connect_attempts: 30,
            connect_backoff_ms: 1000,
            connect_max_backoff_ms: 30_000,
        }
    }
}

impl BrokerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.connect_attempts,
            base_backoff: Duration::from_millis(self.connect_backoff_ms),
            max_backoff: Duration::from_millis(self.connect_max_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StockConfig {
    /// JSON seed file; the bundled seed is used when unset.
    pub seed_path: Option<PathBuf>,
}

impl StockConfig {
    pub fn load_seed(&self) -> Result<Vec<Stock>, ConfigError> {
        let Some(path) = &self.seed_path else {
            return Stock::parse_seed(DEFAULT_STOCK_SEED).map_err(|source| ConfigError::Seed {
                path: PathBuf::from("<bundled>"),
                source,
            });
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Stock::parse_seed(&raw).map_err(|source| ConfigError::Seed {
            path: path.clone(),
            source,
        })
    }
}

impl LomsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document for a struct; treat it as all defaults.
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let broker = &self.broker;
        if broker.order_topic.trim().is_empty() {
            return Err(ConfigError::Invalid("broker.order_topic must not be empty".into()));
        }
        if broker.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("broker.poll_interval_ms must be > 0".into()));
        }
        if broker.batch_size == 0 {
            return Err(ConfigError::Invalid("broker.batch_size must be > 0".into()));
        }
        if broker.connect_attempts == 0 {
            return Err(ConfigError::Invalid("broker.connect_attempts must be > 0".into()));
        }
        if !self.service.in_memory {
            match &self.database.url {
                Some(url) if !url.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "database.url is required when service.in_memory is false".into(),
                    ))
                }
            }
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid("database.max_connections must be > 0".into()));
            }
        }
        Ok(())
    }
}
