//! Minimum transaction fee.

use std::sync::Arc;

use shared_types::{ErrorCode, ProtocolParameters, Result, SidetreeError};
use tracing::debug;

/// Fee rules of one protocol version.
#[derive(Debug, Clone)]
pub struct FeeCalculator {
    params: Arc<ProtocolParameters>,
}

impl FeeCalculator {
    pub fn new(params: Arc<ProtocolParameters>) -> Self {
        Self { params }
    }

    /// Smallest fee a batch of `number_of_operations` must pay.
    ///
    /// Formula: `ceil(max(normalized_fee, normalized_fee × n × multiplier))`
    pub fn compute_minimum_transaction_fee(
        &self,
        normalized_fee: u64,
        number_of_operations: u64,
    ) -> Result<u64> {
        if number_of_operations == 0 {
            return Err(SidetreeError::new(
                ErrorCode::OperationCountNotPositive,
                "a batch must contain at least one operation",
            ));
        }

        let per_operation = normalized_fee as f64
            * number_of_operations as f64
            * self.params.normalized_fee_to_per_operation_fee_multiplier;
        let fee = per_operation.max(normalized_fee as f64).ceil();

        // `as` saturates, so an absurd product stays at u64::MAX.
        Ok(fee as u64)
    }

    /// Fail unless `fee_paid` covers both the normalized fee and the minimum
    /// fee for `number_of_operations`.
    pub fn verify_transaction_fee(
        &self,
        fee_paid: u64,
        number_of_operations: u64,
        normalized_fee: u64,
    ) -> Result<()> {
        let minimum = self.compute_minimum_transaction_fee(normalized_fee, number_of_operations)?;

        if fee_paid < normalized_fee {
            return Err(SidetreeError::new(
                ErrorCode::TransactionFeePaidLessThanNormalizedFee,
                format!("fee paid {fee_paid} is below normalized fee {normalized_fee}"),
            ));
        }
        if fee_paid < minimum {
            return Err(SidetreeError::new(
                ErrorCode::TransactionFeePaidInvalid,
                format!(
                    "fee paid {fee_paid} is below minimum {minimum} \
                     for {number_of_operations} operations"
                ),
            ));
        }

        debug!(fee_paid, minimum, number_of_operations, "Transaction fee verified");
        Ok(())
    }
}
