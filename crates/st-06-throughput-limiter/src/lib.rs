//! # Throughput Limiter Subsystem (ST-06)
//!
//! Caps how much of one ledger time the observer will process.
//!
//! ## Selection Rules
//!
//! | Rule | Detail |
//! |------|--------|
//! | Transaction cap | `max_number_of_transactions_per_transaction_time` |
//! | Operation cap | `max_number_of_operations_per_transaction_time`, summed over declared counts |
//! | Priority | higher `transaction_fee_paid` first, ties keep input order |
//! | Already stored | stored transactions of the same time use up the caps first |
//! | Unparsable anchor | skipped, never counted |
//!
//! A transaction too large for the remaining operation budget is skipped
//! and selection continues with the next one.
//!
//! The selector is versioned: [`ThroughputLimiter`] splits a mixed stream
//! by ledger time and hands each group to the selector of the protocol
//! version in force at that time.

pub mod domain;
pub mod service;

pub use domain::selector::TransactionSelectorService;
pub use service::ThroughputLimiter;
