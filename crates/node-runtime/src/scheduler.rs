//! # Batch Scheduler
//!
//! Runs the batch writer of the protocol version in force at the current
//! ledger time, once per interval. Writes never overlap: the timer runs
//! them one after another, and a write requested while another is running
//! is skipped.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shared_types::events::codes;
use shared_types::ports::LedgerClient;
use shared_types::{EventEmitter, Result, VersionRegistry};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub struct BatchScheduler {
    registry: Arc<VersionRegistry>,
    ledger: Arc<dyn LedgerClient>,
    events: Arc<dyn EventEmitter>,
    interval: Duration,
    writing: Mutex<()>,
}

impl BatchScheduler {
    pub fn new(
        registry: Arc<VersionRegistry>,
        ledger: Arc<dyn LedgerClient>,
        events: Arc<dyn EventEmitter>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            ledger,
            events,
            interval,
            writing: Mutex::new(()),
        }
    }

    /// One batch write. `Ok(None)` when a write was already in progress,
    /// otherwise the number of operations anchored.
    pub async fn write_once(&self) -> Result<Option<usize>> {
        let Ok(_writing) = self.writing.try_lock() else {
            debug!("Batch write already in progress, skipping");
            return Ok(None);
        };
        let now = self.ledger.get_latest_time().await?;
        let writer = self.registry.get_batch_writer(now.time)?;
        writer.write().await.map(Some)
    }

    /// One batch write with its event.
    pub async fn run_cycle(&self) {
        match self.write_once().await {
            Ok(Some(anchored)) => {
                debug!(anchored, "Batch cycle finished");
                self.events.emit(codes::BATCH_WRITER_PROCESSING_LOOP_SUCCESS, None);
            }
            Ok(None) => {}
            Err(e) => {
                if e.is_availability() {
                    warn!(error = %e, "Batch cycle interrupted");
                } else {
                    error!(error = %e, "Batch cycle failed");
                }
                self.events.emit(
                    codes::BATCH_WRITER_PROCESSING_LOOP_FAILED,
                    Some(json!({ "code": e.code.as_str() })),
                );
            }
        }
    }

    /// Start the write timer.
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }
                scheduler.run_cycle().await;
            }
        });

        info!(interval_secs = self.interval.as_secs(), "[node] Batch scheduler started");
        SchedulerHandle { shutdown_tx, task }
    }
}

/// Stops a started scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the timer; a write already running completes first.
    pub async fn stop(self) {
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send batch scheduler shutdown signal: {}", e);
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "Batch scheduler task ended abnormally");
        }
        info!("[node] Batch scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared_types::adapters::MockLedger;
    use shared_types::{BatchWriter, ProtocolParameters, ProtocolVersion, RecordingEventEmitter};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWriter {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl BatchWriter for CountingWriter {
        async fn write(&self) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(3)
        }
    }

    fn scheduler(
        writer: Arc<CountingWriter>,
        ledger: Arc<MockLedger>,
    ) -> (Arc<BatchScheduler>, Arc<RecordingEventEmitter>) {
        let params = Arc::new(ProtocolParameters::for_testing());
        let registry = Arc::new(VersionRegistry::new(vec![
            ProtocolVersion::new(0, "1.0", params).with_batch_writer(writer),
        ]));
        let events = Arc::new(RecordingEventEmitter::new());
        let scheduler = Arc::new(BatchScheduler::new(
            registry,
            ledger,
            events.clone(),
            Duration::from_secs(10),
        ));
        (scheduler, events)
    }

    fn writer(delay: Duration) -> Arc<CountingWriter> {
        Arc::new(CountingWriter {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    #[tokio::test]
    async fn test_cycle_emits_success() {
        let writer = writer(Duration::ZERO);
        let (scheduler, events) = scheduler(writer.clone(), Arc::new(MockLedger::new("writer-a")));

        scheduler.run_cycle().await;
        assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.count(codes::BATCH_WRITER_PROCESSING_LOOP_SUCCESS), 1);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_emits_failure() {
        let ledger = Arc::new(MockLedger::new("writer-a"));
        ledger.set_reachable(false);
        let writer = writer(Duration::ZERO);
        let (scheduler, events) = scheduler(writer.clone(), ledger);

        scheduler.run_cycle().await;
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.count(codes::BATCH_WRITER_PROCESSING_LOOP_FAILED), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_never_overlap() {
        let writer = writer(Duration::from_secs(5));
        let (scheduler, _) = scheduler(writer.clone(), Arc::new(MockLedger::new("writer-a")));

        let (first, second) = tokio::join!(scheduler.write_once(), scheduler.write_once());
        let results = [first.unwrap(), second.unwrap()];
        assert!(results.contains(&Some(3)));
        assert!(results.contains(&None));
        assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_runs_until_stopped() {
        let writer = writer(Duration::ZERO);
        let (scheduler, events) = scheduler(writer.clone(), Arc::new(MockLedger::new("writer-a")));

        let handle = scheduler.start();
        // First tick fires immediately, then every 10s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.stop().await;

        let calls = writer.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 3);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(writer.calls.load(Ordering::SeqCst), calls);
        assert_eq!(events.count(codes::BATCH_WRITER_PROCESSING_LOOP_SUCCESS), 3);
    }
}
