//! Value-time-lock operation quota.

use std::sync::Arc;

use shared_types::{
    ErrorCode, ProtocolParameters, Result, SidetreeError, TransactionTime, ValueTimeLock,
};
use tracing::debug;

/// Lock rules of one protocol version.
#[derive(Debug, Clone)]
pub struct ValueTimeLockVerifier {
    params: Arc<ProtocolParameters>,
}

impl ValueTimeLockVerifier {
    pub fn new(params: Arc<ProtocolParameters>) -> Self {
        Self { params }
    }

    /// Operations a writer may anchor in one transaction.
    ///
    /// Without a lock this is `max_number_of_operations_for_no_value_time_lock`.
    /// With one it is `floor(amount / (normalized_fee × fee_multiplier × amount_multiplier))`,
    /// capped at `max_number_of_operations_per_transaction_time`.
    pub fn calculate_max_number_of_operations_allowed(&self, lock: Option<&ValueTimeLock>) -> u64 {
        let Some(lock) = lock else {
            return self.params.max_number_of_operations_for_no_value_time_lock;
        };

        let fee_per_operation =
            lock.normalized_fee as f64 * self.params.normalized_fee_to_per_operation_fee_multiplier;
        let lock_cost_per_operation =
            fee_per_operation * self.params.value_time_lock_amount_multiplier as f64;
        let allowed = (lock.amount_locked as f64 / lock_cost_per_operation).floor();

        // NaN (0 / 0) casts to 0, infinity saturates to u64::MAX.
        (allowed as u64).min(self.params.max_number_of_operations_per_transaction_time)
    }

    /// Fail unless `writer` may anchor `number_of_operations` at `transaction_time`.
    pub fn verify_lock_amount(
        &self,
        lock: Option<&ValueTimeLock>,
        number_of_operations: u64,
        transaction_time: TransactionTime,
        writer: &str,
    ) -> Result<()> {
        if let Some(lock) = lock {
            if lock.owner != writer {
                return Err(SidetreeError::new(
                    ErrorCode::ValueTimeLockOwnerMismatch,
                    format!("lock {} is owned by {}, not {writer}", lock.identifier, lock.owner),
                ));
            }
            if transaction_time < lock.lock_transaction_time
                || transaction_time >= lock.unlock_transaction_time
            {
                return Err(SidetreeError::new(
                    ErrorCode::ValueTimeLockTransactionTimeOutsideLockRange,
                    format!(
                        "transaction time {transaction_time} outside lock range [{}, {})",
                        lock.lock_transaction_time, lock.unlock_transaction_time
                    ),
                ));
            }
        }

        let max_allowed = self.calculate_max_number_of_operations_allowed(lock);
        if number_of_operations > max_allowed {
            return Err(SidetreeError::new(
                ErrorCode::ValueTimeLockInvalidNumberOfOperations,
                format!("{number_of_operations} operations exceed the allowed {max_allowed}"),
            ));
        }

        debug!(writer, number_of_operations, max_allowed, "Value-time-lock verified");
        Ok(())
    }
}
