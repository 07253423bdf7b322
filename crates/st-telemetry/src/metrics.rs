//! Prometheus event counters.
//!
//! Metric: `sidetree_events_total{event="<event code>"}`

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde_json::Value;
use shared_types::EventEmitter;

use crate::TelemetryError;

/// Counts every event by code, then forwards it to `inner`.
pub struct MetricsEventEmitter {
    registry: Registry,
    events: IntCounterVec,
    inner: Arc<dyn EventEmitter>,
}

impl MetricsEventEmitter {
    pub fn new(inner: Arc<dyn EventEmitter>) -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let events = IntCounterVec::new(
            Opts::new("sidetree_events_total", "Operational events by event code"),
            &["event"],
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        registry
            .register(Box::new(events.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        Ok(Self {
            registry,
            events,
            inner,
        })
    }

    /// Times `event_code` has been emitted.
    pub fn count(&self, event_code: &str) -> u64 {
        self.events.with_label_values(&[event_code]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

impl EventEmitter for MetricsEventEmitter {
    fn emit(&self, event_code: &str, data: Option<Value>) {
        self.events.with_label_values(&[event_code]).inc();
        self.inner.emit(event_code, data);
    }
}
