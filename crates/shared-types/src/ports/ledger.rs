//! Ledger client port.

use async_trait::async_trait;

use crate::entities::{
    LedgerTime, TransactionModel, TransactionNumber, TransactionTime, ValueTimeLock,
};
use crate::Result;

/// One page of anchored transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerReadResult {
    pub transactions: Vec<TransactionModel>,
    pub more_transactions: bool,
}

/// Read/write access to the underlying ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Latest ledger time and its block hash.
    async fn get_latest_time(&self) -> Result<LedgerTime>;

    /// Normalized fee at the given ledger time.
    async fn get_fee(&self, transaction_time: TransactionTime) -> Result<u64>;

    /// Lock currently held by this node's writer, if any.
    async fn get_writer_value_time_lock(&self) -> Result<Option<ValueTimeLock>>;

    /// Look up a lock by identifier.
    async fn get_value_time_lock(&self, lock_identifier: &str) -> Result<Option<ValueTimeLock>>;

    /// Anchored transactions after `since_transaction_number`.
    ///
    /// Fails with `InvalidTransactionNumberOrTimeHash` when the given
    /// transaction no longer exists under `transaction_time_hash` (fork).
    async fn read(
        &self,
        since_transaction_number: Option<TransactionNumber>,
        transaction_time_hash: Option<&str>,
    ) -> Result<LedgerReadResult>;

    /// Anchor a string, paying `fee`.
    async fn write(&self, anchor_string: &str, fee: u64) -> Result<()>;

    /// First transaction in `transactions` still present on the ledger.
    async fn get_first_valid_transaction(
        &self,
        transactions: &[TransactionModel],
    ) -> Result<Option<TransactionModel>>;
}
