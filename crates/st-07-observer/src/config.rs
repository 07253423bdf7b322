//! Observer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Pause between two processing cycles.
    pub observing_interval_secs: u64,
    /// Transactions downloaded concurrently.
    pub max_concurrent_downloads: usize,
    /// Pause between two unresolvable-transaction retry runs.
    pub unresolvable_retry_interval_secs: u64,
    /// Base of the exponential retry delay, in milliseconds.
    pub unresolvable_retry_delay_base_millis: u64,
    /// Due transactions retried per run.
    pub max_unresolvable_retries_per_run: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            observing_interval_secs: 60,
            max_concurrent_downloads: 20,
            unresolvable_retry_interval_secs: 60,
            unresolvable_retry_delay_base_millis: 60_000,
            max_unresolvable_retries_per_run: 100,
        }
    }
}

impl ObserverConfig {
    /// Short intervals and little concurrency.
    pub fn for_testing() -> Self {
        Self {
            observing_interval_secs: 1,
            max_concurrent_downloads: 2,
            unresolvable_retry_interval_secs: 1,
            unresolvable_retry_delay_base_millis: 1_000,
            max_unresolvable_retries_per_run: 10,
        }
    }

    pub fn observing_interval(&self) -> Duration {
        Duration::from_secs(self.observing_interval_secs.max(1))
    }

    pub fn unresolvable_retry_interval(&self) -> Duration {
        Duration::from_secs(self.unresolvable_retry_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config: ObserverConfig =
            serde_json::from_str(r#"{"max_concurrent_downloads": 5}"#).unwrap();
        assert_eq!(config.max_concurrent_downloads, 5);
        assert_eq!(config.observing_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_clamped() {
        let config = ObserverConfig {
            observing_interval_secs: 0,
            ..ObserverConfig::for_testing()
        };
        assert_eq!(config.observing_interval(), Duration::from_secs(1));
    }
}
