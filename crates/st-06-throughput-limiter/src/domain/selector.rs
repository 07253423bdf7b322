//! Fee-priority selection within one ledger time.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use shared_types::ports::TransactionStore;
use shared_types::{
    ErrorCode, ProtocolParameters, Result, SidetreeError, TransactionModel, TransactionNumber,
    TransactionSelector, TransactionTime,
};
use st_02_file_codecs::AnchoredData;
use tracing::debug;

/// Selects the transactions of one ledger time that fit the caps of one
/// protocol version.
pub struct TransactionSelectorService {
    params: Arc<ProtocolParameters>,
    transaction_store: Arc<dyn TransactionStore>,
}

impl TransactionSelectorService {
    pub fn new(
        params: Arc<ProtocolParameters>,
        transaction_store: Arc<dyn TransactionStore>,
    ) -> Self {
        Self {
            params,
            transaction_store,
        }
    }

    /// Transactions and declared operations already stored for `time`,
    /// leaving out the ones being selected again.
    async fn already_counted(
        &self,
        time: TransactionTime,
        candidates: &HashSet<TransactionNumber>,
    ) -> Result<(u64, u64)> {
        let stored = self
            .transaction_store
            .get_transactions_starting_from(time, time.saturating_add(1))
            .await?;

        let mut transactions = 0u64;
        let mut operations = 0u64;
        for transaction in stored
            .iter()
            .filter(|tx| !candidates.contains(&tx.transaction_number))
        {
            transactions += 1;
            if let Ok(anchored) = AnchoredData::deserialize(&transaction.anchor_string) {
                operations = operations.saturating_add(anchored.number_of_operations);
            }
        }
        Ok((transactions, operations))
    }
}

#[async_trait]
impl TransactionSelector for TransactionSelectorService {
    async fn select_qualified_transactions(
        &self,
        transactions: Vec<TransactionModel>,
    ) -> Result<Vec<TransactionModel>> {
        let Some(time) = transactions.first().map(|tx| tx.transaction_time) else {
            return Ok(Vec::new());
        };
        if let Some(other) = transactions.iter().find(|tx| tx.transaction_time != time) {
            return Err(SidetreeError::new(
                ErrorCode::TransactionSelectorMixedTransactionTimes,
                format!(
                    "transaction {} at time {} selected together with time {time}",
                    other.transaction_number, other.transaction_time
                ),
            ));
        }

        let candidate_numbers: HashSet<TransactionNumber> =
            transactions.iter().map(|tx| tx.transaction_number).collect();
        let (stored_transactions, stored_operations) =
            self.already_counted(time, &candidate_numbers).await?;

        let max_transactions = self
            .params
            .max_number_of_transactions_per_transaction_time
            .saturating_sub(stored_transactions);
        let mut operation_budget = self
            .params
            .max_number_of_operations_per_transaction_time
            .saturating_sub(stored_operations);

        let mut candidates: Vec<(u64, TransactionModel)> = transactions
            .into_iter()
            .filter_map(|tx| match AnchoredData::deserialize(&tx.anchor_string) {
                Ok(anchored) => Some((anchored.number_of_operations, tx)),
                Err(e) => {
                    debug!(
                        transaction_number = tx.transaction_number,
                        error = %e,
                        "Skipping unparsable anchor string"
                    );
                    None
                }
            })
            .collect();
        // Stable: equal fees keep input order.
        candidates.sort_by(|(_, a), (_, b)| b.transaction_fee_paid.cmp(&a.transaction_fee_paid));

        let mut selected = Vec::new();
        for (operation_count, transaction) in candidates {
            if selected.len() as u64 >= max_transactions {
                break;
            }
            if operation_count > operation_budget {
                debug!(
                    transaction_number = transaction.transaction_number,
                    operation_count,
                    operation_budget,
                    "Transaction exceeds the remaining operation budget"
                );
                continue;
            }
            operation_budget -= operation_count;
            selected.push(transaction);
        }

        selected.sort_by_key(|tx| tx.transaction_number);
        Ok(selected)
    }
}
