//! Throughput Limiter Service
//!
//! Dispatches each ledger time to the selector of its protocol version.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared_types::{Result, TransactionModel, TransactionTime, VersionRegistry};
use tracing::debug;

pub struct ThroughputLimiter {
    registry: Arc<VersionRegistry>,
}

impl ThroughputLimiter {
    pub fn new(registry: Arc<VersionRegistry>) -> Self {
        Self { registry }
    }

    /// Qualified subset of `transactions`, ascending by transaction number.
    pub async fn get_qualified_transactions(
        &self,
        transactions: Vec<TransactionModel>,
    ) -> Result<Vec<TransactionModel>> {
        let total = transactions.len();
        let mut by_time: BTreeMap<TransactionTime, Vec<TransactionModel>> = BTreeMap::new();
        for transaction in transactions {
            by_time
                .entry(transaction.transaction_time)
                .or_default()
                .push(transaction);
        }

        let mut qualified = Vec::with_capacity(total);
        for (time, group) in by_time {
            let selector = self.registry.get_transaction_selector(time)?;
            qualified.extend(selector.select_qualified_transactions(group).await?);
        }
        qualified.sort_by_key(|tx| tx.transaction_number);

        debug!(total, qualified = qualified.len(), "Throughput limit applied");
        Ok(qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionSelectorService;
    use shared_types::adapters::InMemoryTransactionStore;
    use shared_types::{ErrorCode, ProtocolParameters, ProtocolVersion};
    use st_02_file_codecs::AnchoredData;

    fn transaction(number: u64, time: u64, fee: u64) -> TransactionModel {
        TransactionModel {
            transaction_number: number,
            transaction_time: time,
            transaction_time_hash: format!("hash-{time}"),
            anchor_string: AnchoredData::new("EiCoreIndex", 1).serialize(),
            transaction_fee_paid: fee,
            normalized_transaction_fee: Some(1),
            writer: "writer-a".into(),
        }
    }

    fn limiter() -> ThroughputLimiter {
        let store = Arc::new(InMemoryTransactionStore::new());
        let strict = Arc::new(ProtocolParameters {
            max_number_of_transactions_per_transaction_time: 1,
            ..ProtocolParameters::for_testing()
        });
        let relaxed = Arc::new(ProtocolParameters::for_testing());
        let strict_selector =
            Arc::new(TransactionSelectorService::new(strict.clone(), store.clone()));
        let relaxed_selector = Arc::new(TransactionSelectorService::new(relaxed.clone(), store));
        ThroughputLimiter::new(Arc::new(VersionRegistry::new(vec![
            ProtocolVersion::new(0, "1.0", strict).with_transaction_selector(strict_selector),
            ProtocolVersion::new(20, "1.1", relaxed).with_transaction_selector(relaxed_selector),
        ])))
    }

    #[tokio::test]
    async fn test_each_time_uses_its_version() {
        let input = vec![
            transaction(1, 10, 1),
            transaction(2, 10, 5),
            transaction(3, 20, 1),
            transaction(4, 20, 2),
            transaction(5, 11, 1),
        ];

        let qualified = limiter().get_qualified_transactions(input).await.unwrap();
        let numbers: Vec<_> = qualified.iter().map(|tx| tx.transaction_number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_missing_selector_is_error() {
        let version = ProtocolVersion::new(0, "1.0", Arc::new(ProtocolParameters::default()));
        let limiter = ThroughputLimiter::new(Arc::new(VersionRegistry::new(vec![version])));

        let err = limiter
            .get_qualified_transactions(vec![transaction(1, 10, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VersionComponentMissing);
    }
}
