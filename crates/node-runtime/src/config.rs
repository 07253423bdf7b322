//! # Node Configuration
//!
//! Unified configuration for the observer, the batch writer, the protocol
//! version schedule and telemetry.
//!
//! ## Sources (later wins)
//!
//! 1. Defaults
//! 2. JSON file named by `ST_CONFIG_FILE`
//! 3. `ST_OBSERVER_INTERVAL_SECS`, `ST_BATCH_INTERVAL_SECS`,
//!    `ST_MAX_CONCURRENT_DOWNLOADS`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::ProtocolParameters;
use st_07_observer::ObserverConfig;
use st_telemetry::TelemetryConfig;
use thiserror::Error;

pub const CONFIG_FILE_ENV: &str = "ST_CONFIG_FILE";

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub observer: ObserverConfig,
    pub batch_writer: BatchWriterConfig,
    /// Protocol versions by starting ledger time.
    pub protocol_versions: Vec<ProtocolVersionConfig>,
    pub telemetry: TelemetryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            observer: ObserverConfig::default(),
            batch_writer: BatchWriterConfig::default(),
            protocol_versions: vec![ProtocolVersionConfig {
                starting_time: 0,
                version: "1.0".to_string(),
                parameters: ProtocolParameters::default(),
            }],
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Batch writer timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchWriterConfig {
    /// Pause between two batch writes.
    pub interval_secs: u64,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

impl BatchWriterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// One entry of the protocol version schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVersionConfig {
    pub starting_time: u64,
    pub version: String,
    #[serde(default)]
    pub parameters: ProtocolParameters,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidOverride { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Short intervals, small caps.
    pub fn for_testing() -> Self {
        Self {
            observer: ObserverConfig::for_testing(),
            batch_writer: BatchWriterConfig { interval_secs: 1 },
            protocol_versions: vec![ProtocolVersionConfig {
                starting_time: 0,
                version: "1.0".to_string(),
                parameters: ProtocolParameters::for_testing(),
            }],
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Defaults, then `ST_CONFIG_FILE`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.telemetry = config.telemetry.with_env_overrides();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        })
    }

    /// Apply the numeric overrides `lookup` knows about.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ST_OBSERVER_INTERVAL_SECS") {
            self.observer.observing_interval_secs =
                parse_override("ST_OBSERVER_INTERVAL_SECS", value)?;
        }
        if let Some(value) = lookup("ST_BATCH_INTERVAL_SECS") {
            self.batch_writer.interval_secs = parse_override("ST_BATCH_INTERVAL_SECS", value)?;
        }
        if let Some(value) = lookup("ST_MAX_CONCURRENT_DOWNLOADS") {
            self.observer.max_concurrent_downloads =
                parse_override("ST_MAX_CONCURRENT_DOWNLOADS", value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol_versions.is_empty() {
            return Err(ConfigError::Invalid("no protocol versions configured".into()));
        }
        if self.observer.max_concurrent_downloads == 0 {
            return Err(ConfigError::Invalid("max_concurrent_downloads must be positive".into()));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(
    name: &'static str,
    value: String,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { name, value })
}
