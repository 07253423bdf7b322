//! # Fee Verification - Fees and Value-Time-Locks
//!
//! Pure functions shared by the batch writer (to price a batch) and the
//! transaction processor (to reject underpaid or over-quota batches).
//!
//! | Check | Rule | Error |
//! |-------|------|-------|
//! | Minimum fee | `ceil(max(nf, nf × n × multiplier))`, `n > 0` | `OperationCountNotPositive` |
//! | Paid fee | `paid ≥ nf` | `TransactionFeePaidLessThanNormalizedFee` |
//! | Paid fee | `paid ≥ minimum` | `TransactionFeePaidInvalid` |
//! | Lock owner | `lock.owner == writer` | `ValueTimeLockOwnerMismatch` |
//! | Lock window | `lock_time ≤ t < unlock_time` | `ValueTimeLockTransactionTimeOutsideLockRange` |
//! | Quota | `n ≤ max_operations_allowed(lock)` | `ValueTimeLockInvalidNumberOfOperations` |
//!
//! All constants come from the `ProtocolParameters` of the protocol version
//! active at the transaction's time.

pub mod domain;

pub use domain::fee::FeeCalculator;
pub use domain::lock::ValueTimeLockVerifier;
