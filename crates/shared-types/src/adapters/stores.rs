//! In-memory stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::entities::{
    AnchoredOperationModel, BlockMetadata, ConfirmationRecord, TransactionModel, TransactionNumber,
    TransactionTime, UnresolvableTransaction,
};
use crate::ports::{
    BlockMetadataStore, ConfirmationStore, OperationStore, TimeSource, TransactionStore,
    UnresolvableTransactionStore,
};
use crate::Result;

// =============================================================================
// TRANSACTIONS
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    transactions: RwLock<BTreeMap<TransactionNumber, TransactionModel>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored transactions in ascending order.
    pub fn all(&self) -> Vec<TransactionModel> {
        self.transactions.read().values().cloned().collect()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn add_transaction(&self, transaction: TransactionModel) -> Result<()> {
        self.transactions
            .write()
            .entry(transaction.transaction_number)
            .or_insert(transaction);
        Ok(())
    }

    async fn get_last_transaction(&self) -> Result<Option<TransactionModel>> {
        Ok(self.transactions.read().values().next_back().cloned())
    }

    async fn get_transactions_starting_from(
        &self,
        inclusive_begin_time: TransactionTime,
        exclusive_end_time: TransactionTime,
    ) -> Result<Vec<TransactionModel>> {
        Ok(self
            .transactions
            .read()
            .values()
            .filter(|tx| {
                tx.transaction_time >= inclusive_begin_time
                    && tx.transaction_time < exclusive_end_time
            })
            .cloned()
            .collect())
    }

    async fn get_transactions_later_than(
        &self,
        transaction_number: Option<TransactionNumber>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionModel>> {
        let transactions = self.transactions.read();
        let later = transactions
            .values()
            .filter(|tx| transaction_number.map_or(true, |n| tx.transaction_number > n))
            .cloned();
        Ok(match limit {
            Some(limit) => later.take(limit).collect(),
            None => later.collect(),
        })
    }

    async fn get_exponentially_spaced_transactions(&self) -> Result<Vec<TransactionModel>> {
        let transactions = self.transactions.read();
        let newest_first: Vec<_> = transactions.values().rev().collect();

        let mut sampled = Vec::new();
        let mut index = 0usize;
        let mut step = 1usize;
        while index < newest_first.len() {
            sampled.push(newest_first[index].clone());
            index += step;
            step *= 2;
        }
        Ok(sampled)
    }

    async fn remove_transactions_later_than(
        &self,
        transaction_number: Option<TransactionNumber>,
    ) -> Result<()> {
        let mut transactions = self.transactions.write();
        match transaction_number {
            Some(n) => transactions.retain(|number, _| *number <= n),
            None => transactions.clear(),
        }
        Ok(())
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryOperationStore {
    /// did -> (transaction_number, operation_index) -> operation
    operations: RwLock<HashMap<String, BTreeMap<(TransactionNumber, u32), AnchoredOperationModel>>>,
}

impl InMemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored operations.
    pub fn len(&self) -> usize {
        self.operations.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OperationStore for InMemoryOperationStore {
    async fn insert_or_replace(&self, operations: Vec<AnchoredOperationModel>) -> Result<()> {
        let mut store = self.operations.write();
        for operation in operations {
            store
                .entry(operation.did_unique_suffix.clone())
                .or_default()
                .insert(
                    (operation.transaction_number, operation.operation_index),
                    operation,
                );
        }
        Ok(())
    }

    async fn get(&self, did_unique_suffix: &str) -> Result<Vec<AnchoredOperationModel>> {
        Ok(self
            .operations
            .read()
            .get(did_unique_suffix)
            .map(|ops| ops.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, transaction_number: Option<TransactionNumber>) -> Result<()> {
        let mut store = self.operations.write();
        match transaction_number {
            Some(n) => {
                for ops in store.values_mut() {
                    ops.retain(|(number, _), _| *number <= n);
                }
                store.retain(|_, ops| !ops.is_empty());
            }
            None => store.clear(),
        }
        Ok(())
    }
}

// =============================================================================
// BLOCK METADATA
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryBlockMetadataStore {
    blocks: RwLock<BTreeMap<TransactionTime, BlockMetadata>>,
}

impl InMemoryBlockMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockMetadataStore for InMemoryBlockMetadataStore {
    async fn add(&self, blocks: Vec<BlockMetadata>) -> Result<()> {
        let mut store = self.blocks.write();
        for block in blocks {
            store.insert(block.height, block);
        }
        Ok(())
    }

    async fn get_last(&self) -> Result<Option<BlockMetadata>> {
        Ok(self.blocks.read().values().next_back().cloned())
    }

    async fn get(&self, height: TransactionTime) -> Result<Option<BlockMetadata>> {
        Ok(self.blocks.read().get(&height).cloned())
    }

    async fn remove_later_than(&self, height: Option<TransactionTime>) -> Result<()> {
        let mut store = self.blocks.write();
        match height {
            Some(h) => store.retain(|height, _| *height <= h),
            None => store.clear(),
        }
        Ok(())
    }
}

// =============================================================================
// UNRESOLVABLE TRANSACTIONS
// =============================================================================

/// Retry bookkeeping with exponential backoff on a pluggable clock.
pub struct InMemoryUnresolvableTransactionStore {
    entries: RwLock<BTreeMap<TransactionNumber, UnresolvableTransaction>>,
    clock: Arc<dyn TimeSource>,
    retry_delay_base_millis: u64,
}

impl InMemoryUnresolvableTransactionStore {
    pub fn new(clock: Arc<dyn TimeSource>, retry_delay_base_millis: u64) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
            retry_delay_base_millis,
        }
    }

    pub fn get(&self, transaction_number: TransactionNumber) -> Option<UnresolvableTransaction> {
        self.entries.read().get(&transaction_number).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UnresolvableTransactionStore for InMemoryUnresolvableTransactionStore {
    async fn record_unresolvable_transaction_fetch_attempt(
        &self,
        transaction: &TransactionModel,
    ) -> Result<()> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write();
        match entries.get_mut(&transaction.transaction_number) {
            None => {
                entries.insert(
                    transaction.transaction_number,
                    UnresolvableTransaction {
                        transaction: transaction.clone(),
                        first_fetch_time: now,
                        retry_attempts: 0,
                        next_retry_time: now,
                    },
                );
            }
            Some(entry) => {
                let backoff = 2u64
                    .saturating_pow(entry.retry_attempts)
                    .saturating_mul(self.retry_delay_base_millis);
                entry.next_retry_time = entry.first_fetch_time.saturating_add(backoff);
                entry.retry_attempts += 1;
            }
        }
        Ok(())
    }

    async fn remove_unresolvable_transaction(&self, transaction: &TransactionModel) -> Result<()> {
        self.entries.write().remove(&transaction.transaction_number);
        Ok(())
    }

    async fn get_unresolvable_transactions_due_for_retry(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<UnresolvableTransaction>> {
        let now = self.clock.now_millis();
        let mut due: Vec<_> = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.next_retry_time <= now)
            .cloned()
            .collect();
        due.sort_by_key(|entry| {
            (
                entry.transaction.transaction_time,
                entry.transaction.transaction_number,
            )
        });
        if let Some(limit) = limit {
            due.truncate(limit);
        }
        Ok(due)
    }

    async fn remove_unresolvable_transactions_later_than(
        &self,
        transaction_number: Option<TransactionNumber>,
    ) -> Result<()> {
        let mut entries = self.entries.write();
        match transaction_number {
            Some(n) => entries.retain(|number, _| *number <= n),
            None => entries.clear(),
        }
        Ok(())
    }
}

// =============================================================================
// CONFIRMATIONS
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryConfirmationStore {
    /// Submission order; an anchor string appears at most once.
    records: RwLock<Vec<ConfirmationRecord>>,
}

impl InMemoryConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationStore for InMemoryConfirmationStore {
    async fn submit(&self, anchor_string: &str, submitted_at: TransactionTime) -> Result<()> {
        let mut records = self.records.write();
        records.retain(|record| record.anchor_string != anchor_string);
        records.push(ConfirmationRecord {
            anchor_string: anchor_string.to_string(),
            submitted_at,
            confirmed_at: None,
        });
        Ok(())
    }

    async fn confirm(&self, anchor_string: &str, confirmed_at: TransactionTime) -> Result<()> {
        if let Some(record) = self
            .records
            .write()
            .iter_mut()
            .find(|record| record.anchor_string == anchor_string)
        {
            record.confirmed_at = Some(confirmed_at);
        }
        Ok(())
    }

    async fn get_last_submitted(&self) -> Result<Option<ConfirmationRecord>> {
        Ok(self.records.read().last().cloned())
    }

    async fn reset_after(&self, time: Option<TransactionTime>) -> Result<()> {
        for record in self.records.write().iter_mut() {
            let reset = match (record.confirmed_at, time) {
                (Some(confirmed_at), Some(time)) => confirmed_at > time,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if reset {
                record.confirmed_at = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use crate::entities::OperationType;

    fn tx(number: u64, time: u64) -> TransactionModel {
        TransactionModel {
            transaction_number: number,
            transaction_time: time,
            transaction_time_hash: format!("hash-{time}"),
            anchor_string: format!("uri{number}.1"),
            transaction_fee_paid: 1,
            normalized_transaction_fee: Some(1),
            writer: "w".to_string(),
        }
    }

    fn op(did: &str, number: u64, index: u32) -> AnchoredOperationModel {
        AnchoredOperationModel {
            operation_type: OperationType::Update,
            did_unique_suffix: did.to_string(),
            operation_buffer: vec![index as u8],
            transaction_time: number,
            transaction_number: number,
            operation_index: index,
        }
    }

    #[tokio::test]
    async fn test_exponential_spacing() {
        let store = InMemoryTransactionStore::new();
        for n in 1..=10 {
            store.add_transaction(tx(n, n)).await.unwrap();
        }

        let numbers: Vec<_> = store
            .get_exponentially_spaced_transactions()
            .await
            .unwrap()
            .iter()
            .map(|t| t.transaction_number)
            .collect();
        // offsets 0, 1, 3, 7 from the newest
        assert_eq!(numbers, vec![10, 9, 7, 3]);
    }

    #[tokio::test]
    async fn test_transaction_range_and_removal() {
        let store = InMemoryTransactionStore::new();
        for (n, t) in [(1, 5), (2, 5), (3, 6), (4, 7)] {
            store.add_transaction(tx(n, t)).await.unwrap();
        }

        assert_eq!(store.get_transactions_starting_from(5, 6).await.unwrap().len(), 2);
        assert_eq!(store.get_transactions_later_than(Some(1), Some(2)).await.unwrap().len(), 2);

        store.remove_transactions_later_than(Some(2)).await.unwrap();
        assert_eq!(store.get_last_transaction().await.unwrap().unwrap().transaction_number, 2);

        store.remove_transactions_later_than(None).await.unwrap();
        assert!(store.get_last_transaction().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_operation_insert_is_idempotent() {
        let store = InMemoryOperationStore::new();
        store.insert_or_replace(vec![op("a", 1, 0), op("a", 2, 0)]).await.unwrap();
        store.insert_or_replace(vec![op("a", 1, 0)]).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().len(), 2);

        store.delete(Some(1)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().len(), 1);
        store.delete(None).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_backoff() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = InMemoryUnresolvableTransactionStore::new(clock.clone(), 100);
        let transaction = tx(1, 1);

        store.record_unresolvable_transaction_fetch_attempt(&transaction).await.unwrap();
        let entry = store.get(1).unwrap();
        assert_eq!((entry.retry_attempts, entry.next_retry_time), (0, 1_000));

        store.record_unresolvable_transaction_fetch_attempt(&transaction).await.unwrap();
        let entry = store.get(1).unwrap();
        assert_eq!((entry.retry_attempts, entry.next_retry_time), (1, 1_100));

        store.record_unresolvable_transaction_fetch_attempt(&transaction).await.unwrap();
        let entry = store.get(1).unwrap();
        assert_eq!((entry.retry_attempts, entry.next_retry_time), (2, 1_200));

        store.record_unresolvable_transaction_fetch_attempt(&transaction).await.unwrap();
        assert_eq!(store.get(1).unwrap().next_retry_time, 1_400);

        assert!(store.get_unresolvable_transactions_due_for_retry(None).await.unwrap().is_empty());
        clock.set(1_400);
        assert_eq!(store.get_unresolvable_transactions_due_for_retry(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_due_for_retry_ordering_and_limit() {
        let clock = Arc::new(ManualClock::new(0));
        let store = InMemoryUnresolvableTransactionStore::new(clock, 10);
        for (n, t) in [(3, 2), (1, 2), (2, 1)] {
            store.record_unresolvable_transaction_fetch_attempt(&tx(n, t)).await.unwrap();
        }

        let due = store.get_unresolvable_transactions_due_for_retry(Some(2)).await.unwrap();
        let numbers: Vec<_> = due.iter().map(|e| e.transaction.transaction_number).collect();
        assert_eq!(numbers, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_confirmation_lifecycle() {
        let store = InMemoryConfirmationStore::new();
        store.submit("a.1", 10).await.unwrap();
        store.submit("b.1", 12).await.unwrap();
        store.confirm("a.1", 11).await.unwrap();
        store.confirm("b.1", 14).await.unwrap();

        let last = store.get_last_submitted().await.unwrap().unwrap();
        assert_eq!((last.anchor_string.as_str(), last.confirmed_at), ("b.1", Some(14)));

        store.reset_after(Some(12)).await.unwrap();
        assert_eq!(store.get_last_submitted().await.unwrap().unwrap().confirmed_at, None);

        store.reset_after(None).await.unwrap();
        let records = store.records.read().clone();
        assert!(records.iter().all(|r| r.confirmed_at.is_none()));
    }

    #[tokio::test]
    async fn test_block_metadata_removal() {
        let store = InMemoryBlockMetadataStore::new();
        store
            .add((1..=4)
                .map(|h| BlockMetadata { height: h, hash: format!("h{h}"), transaction_count: 1 })
                .collect())
            .await
            .unwrap();

        store.remove_later_than(Some(2)).await.unwrap();
        assert_eq!(store.get_last().await.unwrap().unwrap().height, 2);
        assert!(store.get(3).await.unwrap().is_none());
    }
}
