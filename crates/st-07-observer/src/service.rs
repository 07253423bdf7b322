//! Observer Service
//!
//! Owns the processing cycle, reorg recovery and the unresolvable
//! transaction retries. [`Observer::start`] runs both on timers; the cycle
//! methods are public so callers and tests can drive them directly.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::json;
use shared_types::events::codes;
use shared_types::ports::{
    BlockMetadataStore, ConfirmationStore, LedgerClient, OperationStore, TransactionStore,
    UnresolvableTransactionStore,
};
use shared_types::{
    BlockMetadata, ErrorCode, EventEmitter, Result, SidetreeError, TransactionModel,
    VersionRegistry,
};
use st_06_throughput_limiter::ThroughputLimiter;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ObserverConfig;
use crate::domain::processing::{ProcessingStatus, TransactionUnderProcessing};

/// Stores the observer writes to.
#[derive(Clone)]
pub struct ObserverStores {
    pub transactions: Arc<dyn TransactionStore>,
    pub operations: Arc<dyn OperationStore>,
    pub block_metadata: Arc<dyn BlockMetadataStore>,
    pub unresolvable_transactions: Arc<dyn UnresolvableTransactionStore>,
    pub confirmations: Arc<dyn ConfirmationStore>,
}

pub struct Observer {
    config: ObserverConfig,
    registry: Arc<VersionRegistry>,
    ledger: Arc<dyn LedgerClient>,
    throughput_limiter: ThroughputLimiter,
    stores: ObserverStores,
    events: Arc<dyn EventEmitter>,
    /// Held by every cycle, retry run and revert, so none of them overlap.
    under_processing: Mutex<VecDeque<TransactionUnderProcessing>>,
}

impl Observer {
    pub fn new(
        config: ObserverConfig,
        registry: Arc<VersionRegistry>,
        ledger: Arc<dyn LedgerClient>,
        stores: ObserverStores,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            config,
            throughput_limiter: ThroughputLimiter::new(Arc::clone(&registry)),
            registry,
            ledger,
            stores,
            events,
            under_processing: Mutex::new(VecDeque::new()),
        }
    }

    /// Start the processing and retry timers.
    pub fn start(self: &Arc<Self>) -> ObserverHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let observer = Arc::clone(self);
        let mut shutdown = shutdown_rx.clone();
        let processing = tokio::spawn(async move {
            let mut interval = tokio::time::interval(observer.config.observing_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => break,
                }
                observer.run_processing_cycle().await;
            }
        });

        let observer = Arc::clone(self);
        let mut shutdown = shutdown_rx;
        let retries = tokio::spawn(async move {
            let mut interval = tokio::time::interval(observer.config.unresolvable_retry_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if let Err(e) = observer.process_unresolvable_transactions().await {
                    warn!(error = %e, "Unresolvable transaction retry failed");
                }
            }
        });

        info!(
            interval_secs = self.config.observing_interval_secs,
            max_concurrent_downloads = self.config.max_concurrent_downloads,
            "[st-07] Observer started"
        );
        ObserverHandle {
            shutdown_tx,
            tasks: vec![processing, retries],
        }
    }

    /// One processing cycle with its event.
    pub async fn run_processing_cycle(&self) {
        match self.process_transactions().await {
            Ok(processed) => {
                debug!(processed, "Processing cycle finished");
                self.events
                    .emit(codes::OBSERVER_PROCESSING_LOOP_SUCCESS, None);
            }
            Err(e) => {
                if e.is_availability() {
                    warn!(error = %e, "Processing cycle interrupted");
                } else {
                    error!(error = %e, "Processing cycle failed");
                }
                self.events.emit(
                    codes::OBSERVER_PROCESSING_LOOP_FAILED,
                    Some(json!({ "code": e.code.as_str() })),
                );
            }
        }
    }

    /// Read and process everything the ledger has after the last stored
    /// transaction. Returns the number of transactions processed.
    pub async fn process_transactions(&self) -> Result<usize> {
        let mut queue = self.under_processing.lock().await;
        let result = self.scan(&mut queue).await;
        if result.is_err() {
            abandon(&mut queue).await;
        }
        result
    }

    async fn scan(&self, queue: &mut VecDeque<TransactionUnderProcessing>) -> Result<usize> {
        let mut cursor = self.stores.transactions.get_last_transaction().await?;
        let mut processed = 0usize;
        // Transactions of the last time read while more pages follow; that
        // time may continue on the next page.
        let mut held_back: Vec<TransactionModel> = Vec::new();

        loop {
            let since = cursor.as_ref().map(|tx| tx.transaction_number);
            let since_hash = cursor.as_ref().map(|tx| tx.transaction_time_hash.clone());
            let read = match self.ledger.read(since, since_hash.as_deref()).await {
                Ok(read) => read,
                Err(e) if e.is_fork_signal() => {
                    warn!(
                        cursor = ?since,
                        "Ledger no longer knows the last transaction, reverting"
                    );
                    held_back.clear();
                    self.drain(queue).await?;
                    self.revert().await?;
                    cursor = self.stores.transactions.get_last_transaction().await?;
                    continue;
                }
                Err(e) => {
                    self.drain(queue).await?;
                    return Err(e);
                }
            };

            let more = read.more_transactions && !read.transactions.is_empty();
            if let Some(last_read) = read.transactions.last() {
                cursor = Some(last_read.clone());
            }
            let mut page = std::mem::take(&mut held_back);
            page.extend(read.transactions);
            if more {
                held_back = split_off_last_time(&mut page);
            }

            if !page.is_empty() {
                let qualified = self.throughput_limiter.get_qualified_transactions(page).await?;
                for transaction in qualified {
                    self.store_finished(queue).await?;
                    while queue.len() >= self.config.max_concurrent_downloads.max(1) {
                        self.store_head(queue).await?;
                    }
                    queue.push_back(self.spawn_processing(transaction));
                    processed += 1;
                }
            }

            if !more {
                break;
            }
        }

        self.drain(queue).await?;
        Ok(processed)
    }

    fn spawn_processing(&self, transaction: TransactionModel) -> TransactionUnderProcessing {
        let registry = Arc::clone(&self.registry);
        let unresolvable = Arc::clone(&self.stores.unresolvable_transactions);
        let task_transaction = transaction.clone();
        TransactionUnderProcessing::spawn(transaction, async move {
            let transaction_number = task_transaction.transaction_number;
            match process_transaction(&registry, unresolvable.as_ref(), &task_transaction).await {
                Ok(()) => ProcessingStatus::Processed,
                Err(e) => {
                    error!(transaction_number, error = %e, "Transaction processing failed");
                    ProcessingStatus::Error
                }
            }
        })
    }

    /// Store the finished transactions at the head of `queue`.
    async fn store_finished(&self, queue: &mut VecDeque<TransactionUnderProcessing>) -> Result<()> {
        while queue
            .front()
            .is_some_and(|head| head.status() != ProcessingStatus::Processing)
        {
            self.store_head(queue).await?;
        }
        Ok(())
    }

    /// Wait for the head of `queue` and store it.
    async fn store_head(&self, queue: &mut VecDeque<TransactionUnderProcessing>) -> Result<()> {
        let Some(mut head) = queue.pop_front() else {
            return Ok(());
        };
        match head.wait().await {
            ProcessingStatus::Processed => self.store_transaction(head.transaction).await,
            status => Err(SidetreeError::new(
                ErrorCode::ObserverTransactionProcessingAborted,
                format!(
                    "transaction {} ended with status {status:?}",
                    head.transaction.transaction_number
                ),
            )),
        }
    }

    async fn drain(&self, queue: &mut VecDeque<TransactionUnderProcessing>) -> Result<()> {
        while !queue.is_empty() {
            self.store_head(queue).await?;
        }
        Ok(())
    }

    async fn store_transaction(&self, transaction: TransactionModel) -> Result<()> {
        let time = transaction.transaction_time;
        let hash = transaction.transaction_time_hash.clone();
        let transaction_number = transaction.transaction_number;

        self.stores
            .confirmations
            .confirm(&transaction.anchor_string, time)
            .await?;
        self.stores.transactions.add_transaction(transaction).await?;

        let transaction_count = self
            .stores
            .transactions
            .get_transactions_starting_from(time, time.saturating_add(1))
            .await?
            .len() as u64;
        self.stores
            .block_metadata
            .add(vec![BlockMetadata {
                height: time,
                hash,
                transaction_count,
            }])
            .await?;

        debug!(transaction_number, time, "Transaction stored");
        Ok(())
    }

    /// Trim every store back to the newest stored transaction the ledger
    /// still knows, probing exponentially spaced samples.
    pub async fn revert_invalid_transactions(&self) -> Result<Option<TransactionModel>> {
        let _cycle = self.under_processing.lock().await;
        self.revert().await
    }

    async fn revert(&self) -> Result<Option<TransactionModel>> {
        let samples = self
            .stores
            .transactions
            .get_exponentially_spaced_transactions()
            .await?;
        let last_valid = self.ledger.get_first_valid_transaction(&samples).await?;

        let last_valid_number = last_valid.as_ref().map(|tx| tx.transaction_number);
        let last_valid_time = last_valid.as_ref().map(|tx| tx.transaction_time);

        self.stores.operations.delete(last_valid_number).await?;
        self.stores
            .unresolvable_transactions
            .remove_unresolvable_transactions_later_than(last_valid_number)
            .await?;
        self.stores
            .transactions
            .remove_transactions_later_than(last_valid_number)
            .await?;
        self.stores
            .block_metadata
            .remove_later_than(last_valid_time)
            .await?;
        self.stores.confirmations.reset_after(last_valid_time).await?;

        warn!(
            last_valid_transaction = ?last_valid_number,
            samples = samples.len(),
            "[st-07] Reverted to last valid transaction"
        );
        self.events.emit(
            codes::OBSERVER_BLOCK_REORGANIZATION,
            Some(json!({ "lastValidTransactionNumber": last_valid_number })),
        );
        Ok(last_valid)
    }

    /// Retry transactions whose files could not be fetched and whose retry
    /// time has come. Returns the number that now processed.
    ///
    /// Runs under the cycle lock, so a revert never interleaves with a
    /// retry writing operations.
    pub async fn process_unresolvable_transactions(&self) -> Result<usize> {
        let _cycle = self.under_processing.lock().await;
        let due = self
            .stores
            .unresolvable_transactions
            .get_unresolvable_transactions_due_for_retry(Some(
                self.config.max_unresolvable_retries_per_run,
            ))
            .await?;
        if due.is_empty() {
            return Ok(0);
        }

        let mut resolved = 0usize;
        for entry in &due {
            let transaction = &entry.transaction;
            if !self.is_stored(transaction).await? {
                debug!(
                    transaction_number = transaction.transaction_number,
                    "Dropping retry of a transaction no longer stored"
                );
                self.stores
                    .unresolvable_transactions
                    .remove_unresolvable_transaction(transaction)
                    .await?;
                continue;
            }

            let processor = self
                .registry
                .get_transaction_processor(transaction.transaction_time)?;
            if processor.process_transaction(transaction).await {
                self.stores
                    .unresolvable_transactions
                    .remove_unresolvable_transaction(transaction)
                    .await?;
                resolved += 1;
            } else {
                debug!(
                    transaction_number = transaction.transaction_number,
                    attempts = entry.retry_attempts + 1,
                    "Transaction still unresolvable"
                );
                self.stores
                    .unresolvable_transactions
                    .record_unresolvable_transaction_fetch_attempt(transaction)
                    .await?;
            }
        }

        info!(due = due.len(), resolved, "[st-07] Unresolvable transactions retried");
        Ok(resolved)
    }

    async fn is_stored(&self, transaction: &TransactionModel) -> Result<bool> {
        let time = transaction.transaction_time;
        let stored = self
            .stores
            .transactions
            .get_transactions_starting_from(time, time.saturating_add(1))
            .await?;
        Ok(stored.iter().any(|tx| {
            tx.transaction_number == transaction.transaction_number
                && tx.transaction_time_hash == transaction.transaction_time_hash
        }))
    }
}

/// Split off the trailing transactions that share the last one's time.
fn split_off_last_time(page: &mut Vec<TransactionModel>) -> Vec<TransactionModel> {
    let Some(last_time) = page.last().map(|tx| tx.transaction_time) else {
        return Vec::new();
    };
    let start = page
        .iter()
        .rposition(|tx| tx.transaction_time != last_time)
        .map_or(0, |index| index + 1);
    page.split_off(start)
}

async fn process_transaction(
    registry: &VersionRegistry,
    unresolvable: &dyn UnresolvableTransactionStore,
    transaction: &TransactionModel,
) -> Result<()> {
    let processor = registry.get_transaction_processor(transaction.transaction_time)?;
    if processor.process_transaction(transaction).await {
        unresolvable.remove_unresolvable_transaction(transaction).await
    } else {
        unresolvable
            .record_unresolvable_transaction_fetch_attempt(transaction)
            .await
    }
}

/// Let the remaining tasks finish without storing their transactions.
async fn abandon(queue: &mut VecDeque<TransactionUnderProcessing>) {
    while let Some(mut abandoned) = queue.pop_front() {
        let status = abandoned.wait().await;
        debug!(
            transaction_number = abandoned.transaction.transaction_number,
            ?status,
            "Abandoned transaction"
        );
    }
}

/// Stops a started observer.
pub struct ObserverHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ObserverHandle {
    /// Stop both timers. A cycle already running completes first, including
    /// its in-flight transactions.
    pub async fn stop(self) {
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send observer shutdown signal: {}", e);
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Observer task ended abnormally");
            }
        }
        info!("[st-07] Observer stopped");
    }
}
