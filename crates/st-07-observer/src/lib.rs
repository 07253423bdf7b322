//! # Observer Subsystem (ST-07)
//!
//! Follows the ledger and turns anchored transactions into stored state.
//!
//! ## Processing Cycle
//!
//! ```text
//! ledger.read(cursor) ──→ throughput limiter ──→ spawn processing (≤ N in flight)
//!        │                                              │
//!        │ fork signal                                  ▼
//!        ▼                                  store consecutive finished
//!  revert to last valid                     transactions in ledger order
//! ```
//!
//! | Step | Stores touched |
//! |------|----------------|
//! | transaction processed | operations (by the processor), unresolvable retries |
//! | transaction stored | transactions, block metadata, confirmations |
//! | reorg | all of the above, trimmed after the last valid transaction |
//!
//! Downloads of up to `max_concurrent_downloads` transactions overlap, but a
//! transaction is only stored once every transaction before it has been.
//! A transaction whose files could not be fetched is still stored and
//! retried later by the unresolvable-transaction timer.

pub mod config;
pub mod domain;
pub mod service;

pub use config::ObserverConfig;
pub use domain::processing::{ProcessingStatus, TransactionUnderProcessing};
pub use service::{Observer, ObserverHandle, ObserverStores};
