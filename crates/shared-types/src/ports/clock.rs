//! Time source for consistent timestamp handling.
//!
//! Abstracted to allow testing with deterministic time.

/// Wall-clock time in milliseconds.
pub trait TimeSource: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
