//! Provider configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SUBSCRIPTION_ID_ENV: &str = "ARM_SUBSCRIPTION_ID";
pub const POLL_INTERVAL_ENV: &str = "ARM_POLL_INTERVAL_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVariable(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Timeouts for each kind of operation, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create_secs: u64,
    pub read_secs: u64,
    pub update_secs: u64,
    pub delete_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create_secs: 90 * 60,
            read_secs: 5 * 60,
            update_secs: 90 * 60,
            delete_secs: 90 * 60,
        }
    }
}

impl Timeouts {
    pub fn create(&self) -> Duration {
        Duration::from_secs(self.create_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn update(&self) -> Duration {
        Duration::from_secs(self.update_secs)
    }

    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Subscription new resources are created in
    pub subscription_id: String,
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Delay between two polls of a long-running operation, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

impl ProviderConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            timeouts: Timeouts::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Read the configuration from `ARM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let subscription_id = lookup(SUBSCRIPTION_ID_ENV)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingVariable(SUBSCRIPTION_ID_ENV))?;

        let mut config = Self::new(subscription_id);
        if let Some(value) = lookup(POLL_INTERVAL_ENV) {
            let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: POLL_INTERVAL_ENV,
                value,
            })?;
            config.poll_interval_ms = secs.saturating_mul(1000);
        }
        Ok(config)
    }
}
