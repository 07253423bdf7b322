//! Event emission context.
//!
//! Components receive an `Arc<dyn EventEmitter>` at construction instead of
//! reaching for a process-wide emitter.

use parking_lot::Mutex;
use serde_json::Value;

/// Stable event codes.
pub mod codes {
    pub const BATCH_WRITER_PROCESSING_LOOP_SUCCESS: &str = "batch_writer_processing_loop_success";
    pub const BATCH_WRITER_PROCESSING_LOOP_FAILED: &str = "batch_writer_processing_loop_failed";
    pub const OBSERVER_PROCESSING_LOOP_SUCCESS: &str = "observer_processing_loop_success";
    pub const OBSERVER_PROCESSING_LOOP_FAILED: &str = "observer_processing_loop_failed";
    pub const OBSERVER_BLOCK_REORGANIZATION: &str = "observer_block_reorganization";
    pub const TRANSACTION_PROCESSING_FAILED: &str = "transaction_processing_failed";
}

/// Sink for operational events.
pub trait EventEmitter: Send + Sync {
    /// Emit an event with optional structured data.
    fn emit(&self, event_code: &str, data: Option<Value>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event_code: &str, _data: Option<Value>) {}
}

/// Keeps every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingEventEmitter {
    events: Mutex<Vec<(String, Option<Value>)>>,
}

impl RecordingEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes of all emitted events, oldest first.
    pub fn event_codes(&self) -> Vec<String> {
        self.events.lock().iter().map(|(code, _)| code.clone()).collect()
    }

    /// Number of times `event_code` was emitted.
    pub fn count(&self, event_code: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(code, _)| code == event_code)
            .count()
    }
}

impl EventEmitter for RecordingEventEmitter {
    fn emit(&self, event_code: &str, data: Option<Value>) {
        self.events.lock().push((event_code.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_emitter_counts() {
        let emitter = RecordingEventEmitter::new();
        emitter.emit(codes::OBSERVER_BLOCK_REORGANIZATION, None);
        emitter.emit(codes::OBSERVER_PROCESSING_LOOP_SUCCESS, Some(serde_json::json!({"n": 1})));
        emitter.emit(codes::OBSERVER_BLOCK_REORGANIZATION, None);

        assert_eq!(emitter.count(codes::OBSERVER_BLOCK_REORGANIZATION), 2);
        assert_eq!(emitter.event_codes().len(), 3);
    }
}
