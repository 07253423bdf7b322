//! Persistent store ports.
//!
//! Collection-like contracts only; every method is a single
//! append/overwrite/remove so implementations never need multi-step
//! transactions.

use async_trait::async_trait;

use crate::entities::{
    AnchoredOperationModel, BlockMetadata, ConfirmationRecord, TransactionModel, TransactionNumber,
    TransactionTime, UnresolvableTransaction,
};
use crate::Result;

/// Transactions this node has processed, keyed by transaction number.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Add a transaction; adding an already stored number is a no-op.
    async fn add_transaction(&self, transaction: TransactionModel) -> Result<()>;

    /// Transaction with the highest number.
    async fn get_last_transaction(&self) -> Result<Option<TransactionModel>>;

    /// Transactions with `transaction_time` in `[inclusive_begin, exclusive_end)`.
    async fn get_transactions_starting_from(
        &self,
        inclusive_begin_time: TransactionTime,
        exclusive_end_time: TransactionTime,
    ) -> Result<Vec<TransactionModel>>;

    /// Transactions after `transaction_number` (all when `None`), ascending.
    async fn get_transactions_later_than(
        &self,
        transaction_number: Option<TransactionNumber>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionModel>>;

    /// Newest transaction, then the ones 1, 2, 4, 8, … positions before it.
    async fn get_exponentially_spaced_transactions(&self) -> Result<Vec<TransactionModel>>;

    /// Remove transactions after `transaction_number` (all when `None`).
    async fn remove_transactions_later_than(
        &self,
        transaction_number: Option<TransactionNumber>,
    ) -> Result<()>;
}

/// Anchored operations, keyed by `(did, transaction_number, operation_index)`.
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn insert_or_replace(&self, operations: Vec<AnchoredOperationModel>) -> Result<()>;

    /// All operations of one DID, in no particular order.
    async fn get(&self, did_unique_suffix: &str) -> Result<Vec<AnchoredOperationModel>>;

    /// Delete operations after `transaction_number` (all when `None`).
    async fn delete(&self, transaction_number: Option<TransactionNumber>) -> Result<()>;
}

#[async_trait]
pub trait BlockMetadataStore: Send + Sync {
    async fn add(&self, blocks: Vec<BlockMetadata>) -> Result<()>;

    async fn get_last(&self) -> Result<Option<BlockMetadata>>;

    async fn get(&self, height: TransactionTime) -> Result<Option<BlockMetadata>>;

    /// Remove blocks above `height` (all when `None`).
    async fn remove_later_than(&self, height: Option<TransactionTime>) -> Result<()>;
}

/// Retry bookkeeping for transactions whose files could not be fetched.
#[async_trait]
pub trait UnresolvableTransactionStore: Send + Sync {
    /// Record a failed fetch, scheduling the next retry with exponential backoff.
    async fn record_unresolvable_transaction_fetch_attempt(
        &self,
        transaction: &TransactionModel,
    ) -> Result<()>;

    async fn remove_unresolvable_transaction(&self, transaction: &TransactionModel) -> Result<()>;

    /// Entries whose retry time has passed, ordered by `(time, number)`.
    async fn get_unresolvable_transactions_due_for_retry(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<UnresolvableTransaction>>;

    /// Remove entries after `transaction_number` (all when `None`).
    async fn remove_unresolvable_transactions_later_than(
        &self,
        transaction_number: Option<TransactionNumber>,
    ) -> Result<()>;
}

/// Anchor-string submission and confirmation records, keyed by anchor string.
#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    async fn submit(&self, anchor_string: &str, submitted_at: TransactionTime) -> Result<()>;

    async fn confirm(&self, anchor_string: &str, confirmed_at: TransactionTime) -> Result<()>;

    /// Most recently submitted record.
    async fn get_last_submitted(&self) -> Result<Option<ConfirmationRecord>>;

    /// Clear `confirmed_at` on records confirmed after `time` (all when `None`).
    async fn reset_after(&self, time: Option<TransactionTime>) -> Result<()>;
}
