//! # Sidetree Telemetry
//!
//! Structured logging and event accounting for the node.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` fmt layer with `EnvFilter`, plain or JSON
//! - **Events**: [`TracingEventEmitter`] logs every emitted event
//! - **Metrics**: [`MetricsEventEmitter`] counts events in Prometheus
//!
//! ## Usage
//!
//! ```rust,ignore
//! use st_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ST_LOG_LEVEL` or `RUST_LOG` | `info` | Log level filter |
//! | `ST_JSON_LOGS` | `false` | JSON formatted logs |
//! | `ST_SERVICE_NAME` | `sidetree-node` | Service name on every log line |

mod config;
mod events;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use events::TracingEventEmitter;
pub use logging::init_telemetry;
pub use metrics::MetricsEventEmitter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}
