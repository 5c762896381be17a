//! Runtime configuration
//!
//! Tunables come from a TOML file; credentials (VAPID signing key, store
//! connection string) come from the environment so they never land on disk
//! next to the config.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const fn default_batch_limit() -> usize {
    500
}

const fn default_retention_days() -> u64 {
    30
}

const fn default_max_in_flight() -> usize {
    32
}

const fn default_cycle_interval() -> u64 {
    60
}

fn default_subject() -> String {
    "mailto:ops@example.com".to_string()
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required credential is missing from the environment.
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dispatch cycle tunables
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Push transport settings
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// The VAPID private key, read from `VAPID_PRIVATE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` when the variable is unset.
    pub fn vapid_private_key(&self) -> Result<String, ConfigError> {
        std::env::var("VAPID_PRIVATE_KEY")
            .map_err(|_| ConfigError::MissingCredential("VAPID_PRIVATE_KEY"))
    }
}

/// Tunables for the dispatch cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum due reminders considered per cycle
    ///
    /// Bounds the worst-case fan-out width of one invocation.
    /// Default: 500
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// How long sent reminders are retained before the sweeper deletes them
    /// (in days)
    ///
    /// Default: 30 days
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Maximum concurrent outstanding sends across the whole cycle
    ///
    /// Default: 32
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Interval between dispatch cycles in serve mode (in seconds)
    ///
    /// Default: 60 seconds
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            retention_days: default_retention_days(),
            max_in_flight: default_max_in_flight(),
            cycle_interval_secs: default_cycle_interval(),
        }
    }
}

impl DispatchConfig {
    /// The retention window as a duration, clamped to a century.
    #[must_use]
    pub fn retention(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::days(i64::try_from(self.retention_days).unwrap_or(i64::MAX).min(36_500))
    }

    /// The serve-mode cycle interval as a duration.
    #[must_use]
    pub const fn cycle_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cycle_interval_secs)
    }
}

/// Push transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// VAPID subject claim: a `mailto:` or `https:` URI push services may
    /// use to contact the operator
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
        }
    }
}
