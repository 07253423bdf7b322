//! Event emitter that writes events to the log.

use serde_json::Value;
use shared_types::events::codes;
use shared_types::EventEmitter;
use tracing::{info, warn};

/// Logs every event; failure events at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventEmitter;

impl TracingEventEmitter {
    pub fn new() -> Self {
        Self
    }

    fn is_failure(event_code: &str) -> bool {
        matches!(
            event_code,
            codes::BATCH_WRITER_PROCESSING_LOOP_FAILED
                | codes::OBSERVER_PROCESSING_LOOP_FAILED
                | codes::OBSERVER_BLOCK_REORGANIZATION
                | codes::TRANSACTION_PROCESSING_FAILED
        )
    }
}

impl EventEmitter for TracingEventEmitter {
    fn emit(&self, event_code: &str, data: Option<Value>) {
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        if Self::is_failure(event_code) {
            warn!(event = event_code, data = %data, "Event");
        } else {
            info!(event = event_code, data = %data, "Event");
        }
    }
}
