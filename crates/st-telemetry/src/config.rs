//! Telemetry configuration from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

/// Configuration for logging and event accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name recorded on startup
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or full directive
    pub log_level: String,

    /// Emit one JSON object per log line instead of the human format
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "sidetree-node".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by any `ST_*` variables that are set.
    ///
    /// - `ST_SERVICE_NAME`: Service name (default: sidetree-node)
    /// - `ST_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `ST_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply the environment variables that are set on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = env::var("ST_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Ok(level) = env::var("ST_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            self.log_level = level;
        }
        if let Ok(json) = env::var("ST_JSON_LOGS") {
            self.json_logs = parse_flag(&json);
        }
        self
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
