//! Mock ledger.
//!
//! Keeps a block-hash per ledger time and a list of anchored transactions.
//! `reorganize` rewrites the hashes from a given time on, so transactions
//! observed before the fork no longer validate.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::entities::{
    LedgerTime, TransactionModel, TransactionNumber, TransactionTime, ValueTimeLock,
};
use crate::errors::{ErrorCode, SidetreeError};
use crate::ports::{LedgerClient, LedgerReadResult};
use crate::Result;

const DEFAULT_PAGE_SIZE: usize = 100;

struct LedgerState {
    latest_time: TransactionTime,
    fork_epoch: u64,
    time_hashes: BTreeMap<TransactionTime, String>,
    transactions: Vec<TransactionModel>,
    fees: HashMap<TransactionTime, u64>,
    default_fee: u64,
    writer_lock: Option<ValueTimeLock>,
    locks: HashMap<String, ValueTimeLock>,
    writes: Vec<(String, u64)>,
    page_size: usize,
}

impl LedgerState {
    fn hash_for(&mut self, time: TransactionTime) -> String {
        let epoch = self.fork_epoch;
        self.time_hashes
            .entry(time)
            .or_insert_with(|| format!("block-{time}-{epoch}"))
            .clone()
    }

    fn fee_at(&self, time: TransactionTime) -> u64 {
        self.fees.get(&time).copied().unwrap_or(self.default_fee)
    }

    fn next_transaction_number(&self) -> TransactionNumber {
        self.transactions
            .last()
            .map(|tx| tx.transaction_number + 1)
            .unwrap_or(1)
    }

    fn is_valid(&self, transaction: &TransactionModel) -> bool {
        self.transactions.iter().any(|tx| {
            tx.transaction_number == transaction.transaction_number
                && tx.transaction_time_hash == transaction.transaction_time_hash
        })
    }
}

/// In-memory ledger used by tests and the development binary.
pub struct MockLedger {
    writer: String,
    state: RwLock<LedgerState>,
    reachable: AtomicBool,
}

impl MockLedger {
    /// Create a ledger whose `write` anchors on behalf of `writer`.
    pub fn new(writer: impl Into<String>) -> Self {
        Self {
            writer: writer.into(),
            state: RwLock::new(LedgerState {
                latest_time: 0,
                fork_epoch: 0,
                time_hashes: BTreeMap::new(),
                transactions: Vec::new(),
                fees: HashMap::new(),
                default_fee: 1,
                writer_lock: None,
                locks: HashMap::new(),
                writes: Vec::new(),
                page_size: DEFAULT_PAGE_SIZE,
            }),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn writer(&self) -> &str {
        &self.writer
    }

    pub fn set_latest_time(&self, time: TransactionTime) {
        self.state.write().latest_time = time;
    }

    pub fn advance_time(&self, blocks: u64) {
        self.state.write().latest_time += blocks;
    }

    pub fn set_default_fee(&self, fee: u64) {
        self.state.write().default_fee = fee;
    }

    pub fn set_fee(&self, time: TransactionTime, fee: u64) {
        self.state.write().fees.insert(time, fee);
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.state.write().page_size = page_size.max(1);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Lock returned by `get_writer_value_time_lock`; also registered by identifier.
    pub fn set_writer_value_time_lock(&self, lock: Option<ValueTimeLock>) {
        let mut state = self.state.write();
        if let Some(lock) = &lock {
            state.locks.insert(lock.identifier.clone(), lock.clone());
        }
        state.writer_lock = lock;
    }

    pub fn add_value_time_lock(&self, lock: ValueTimeLock) {
        self.state.write().locks.insert(lock.identifier.clone(), lock);
    }

    /// Anchor a transaction at `time` on behalf of any writer.
    ///
    /// Number, time hash and normalized fee are assigned by the ledger.
    pub fn add_transaction(
        &self,
        time: TransactionTime,
        anchor_string: &str,
        fee_paid: u64,
        writer: &str,
    ) -> TransactionModel {
        let mut state = self.state.write();
        let transaction = TransactionModel {
            transaction_number: state.next_transaction_number(),
            transaction_time: time,
            transaction_time_hash: state.hash_for(time),
            anchor_string: anchor_string.to_string(),
            transaction_fee_paid: fee_paid,
            normalized_transaction_fee: Some(state.fee_at(time)),
            writer: writer.to_string(),
        };
        state.transactions.push(transaction.clone());
        state.latest_time = state.latest_time.max(time);
        transaction
    }

    /// Drop every transaction at or after `from_time` and re-hash those blocks.
    pub fn reorganize(&self, from_time: TransactionTime) {
        let mut state = self.state.write();
        state.fork_epoch += 1;
        state.transactions.retain(|tx| tx.transaction_time < from_time);
        let forked: Vec<_> = state.time_hashes.range(from_time..).map(|(t, _)| *t).collect();
        for time in forked {
            state.time_hashes.remove(&time);
        }
        info!(from_time, epoch = state.fork_epoch, "Mock ledger reorganized");
    }

    /// Anchor strings written through `LedgerClient::write`, with their fees.
    pub fn writes(&self) -> Vec<(String, u64)> {
        self.state.read().writes.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionModel> {
        self.state.read().transactions.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SidetreeError::new(ErrorCode::LedgerNotReachable, "mock ledger offline"))
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_latest_time(&self) -> Result<LedgerTime> {
        self.check_reachable()?;
        let mut state = self.state.write();
        let time = state.latest_time;
        Ok(LedgerTime {
            time,
            hash: state.hash_for(time),
        })
    }

    async fn get_fee(&self, transaction_time: TransactionTime) -> Result<u64> {
        self.check_reachable()?;
        Ok(self.state.read().fee_at(transaction_time))
    }

    async fn get_writer_value_time_lock(&self) -> Result<Option<ValueTimeLock>> {
        self.check_reachable()?;
        Ok(self.state.read().writer_lock.clone())
    }

    async fn get_value_time_lock(&self, lock_identifier: &str) -> Result<Option<ValueTimeLock>> {
        self.check_reachable()?;
        Ok(self.state.read().locks.get(lock_identifier).cloned())
    }

    async fn read(
        &self,
        since_transaction_number: Option<TransactionNumber>,
        transaction_time_hash: Option<&str>,
    ) -> Result<LedgerReadResult> {
        self.check_reachable()?;
        let state = self.state.read();

        if let Some(since) = since_transaction_number {
            let known = state.transactions.iter().any(|tx| {
                tx.transaction_number == since
                    && transaction_time_hash.map_or(true, |hash| tx.transaction_time_hash == hash)
            });
            if !known {
                return Err(SidetreeError::new(
                    ErrorCode::InvalidTransactionNumberOrTimeHash,
                    format!("transaction {since} not found under the given time hash"),
                ));
            }
        }

        let later: Vec<_> = state
            .transactions
            .iter()
            .filter(|tx| {
                since_transaction_number.map_or(true, |since| tx.transaction_number > since)
            })
            .cloned()
            .collect();
        let more_transactions = later.len() > state.page_size;
        let transactions: Vec<_> = later.into_iter().take(state.page_size).collect();

        debug!(
            since = ?since_transaction_number,
            count = transactions.len(),
            more_transactions,
            "Mock ledger read"
        );
        Ok(LedgerReadResult {
            transactions,
            more_transactions,
        })
    }

    async fn write(&self, anchor_string: &str, fee: u64) -> Result<()> {
        self.check_reachable()?;
        let time = {
            let mut state = self.state.write();
            state.writes.push((anchor_string.to_string(), fee));
            state.latest_time
        };
        self.add_transaction(time, anchor_string, fee, &self.writer);
        Ok(())
    }

    async fn get_first_valid_transaction(
        &self,
        transactions: &[TransactionModel],
    ) -> Result<Option<TransactionModel>> {
        self.check_reachable()?;
        let state = self.state.read();
        Ok(transactions.iter().find(|tx| state.is_valid(tx)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_pages_and_more_flag() {
        let ledger = MockLedger::new("writer");
        ledger.set_page_size(2);
        for time in 1..=3 {
            ledger.add_transaction(time, "uri.1", 10, "w");
        }

        let first = ledger.read(None, None).await.unwrap();
        assert_eq!(first.transactions.len(), 2);
        assert!(first.more_transactions);

        let last = &first.transactions[1];
        let second = ledger
            .read(Some(last.transaction_number), Some(&last.transaction_time_hash))
            .await
            .unwrap();
        assert_eq!(second.transactions.len(), 1);
        assert!(!second.more_transactions);
    }

    #[tokio::test]
    async fn test_reorganize_invalidates_cursor() {
        let ledger = MockLedger::new("writer");
        ledger.add_transaction(1, "a.1", 10, "w");
        let forked = ledger.add_transaction(2, "b.1", 10, "w");

        ledger.reorganize(2);
        ledger.add_transaction(2, "c.1", 10, "w");

        let err = ledger
            .read(Some(forked.transaction_number), Some(&forked.transaction_time_hash))
            .await
            .unwrap_err();
        assert!(err.is_fork_signal());
    }

    #[tokio::test]
    async fn test_first_valid_transaction() {
        let ledger = MockLedger::new("writer");
        let kept = ledger.add_transaction(1, "a.1", 10, "w");
        let lost = ledger.add_transaction(5, "b.1", 10, "w");
        ledger.reorganize(3);

        let found = ledger
            .get_first_valid_transaction(&[lost, kept.clone()])
            .await
            .unwrap();
        assert_eq!(found, Some(kept));
    }

    #[tokio::test]
    async fn test_write_anchors_at_latest_time() {
        let ledger = MockLedger::new("me");
        ledger.set_latest_time(7);
        ledger.set_fee(7, 3);

        ledger.write("core.2", 5).await.unwrap();

        let txs = ledger.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].transaction_time, 7);
        assert_eq!(txs[0].writer, "me");
        assert_eq!(txs[0].normalized_transaction_fee, Some(3));
        assert_eq!(ledger.writes(), vec![("core.2".to_string(), 5)]);
    }
}
