//! # Batch Writer Subsystem (ST-04)
//!
//! Turns the head of the operation queue into one anchored batch.
//!
//! ## Write Cycle
//!
//! ```text
//! ledger time + fee ─→ writer lock ─→ quota ─→ peek queue
//!        │
//!        ├─ empty queue / previous batch unconfirmed ──→ no-op (0)
//!        ↓
//! chunk, provisional proof, provisional index, core proof, core index ─→ CAS
//!        ↓
//! anchor string ─→ minimum fee ─→ ledger write ─→ confirmation submit ─→ dequeue
//! ```
//!
//! | Quota source | Value |
//! |--------------|-------|
//! | Protocol | `max_operations_per_batch` |
//! | Writer lock | `ValueTimeLockVerifier::calculate_max_number_of_operations_allowed` |
//!
//! The smaller of the two bounds the peek. The queue is only dequeued after
//! the ledger accepted the anchor, so a failed cycle is retried with the
//! same operations.

pub mod domain;
pub mod service;

pub use domain::batch::PartitionedOperations;
pub use service::{write_anchoring_files, BatchWriterService};
