//! # Transaction Processor Subsystem (ST-05)
//!
//! Inverse of the batch writer: expands one anchored transaction into
//! stored `AnchoredOperationModel`s.
//!
//! ## Phases
//!
//! | Phase | Files | On structural failure | On availability failure |
//! |-------|-------|-----------------------|-------------------------|
//! | 1 | anchor string, fee, core index, writer lock | discard transaction | retry it |
//! | 2a | core proof file | drop recover/deactivate | store the rest, retry |
//! | 2b | provisional index and proof, chunk | drop updates and deltas | store the rest, retry |
//!
//! Phase 2b is all-or-nothing: any failure in the provisional chain drops
//! the whole chain. Operations whose delta could not be obtained are stored
//! without one.
//!
//! ## Operation Index
//!
//! Assigned by declared position in create, recover, deactivate, update
//! order. An operation dropped in phase 2 leaves its index unused, so a
//! retry that succeeds replaces rather than duplicates stored operations.

pub mod domain;
pub mod download_manager;
pub mod service;

pub use domain::composer::{compose_anchored_operations, ProvisionalFiles};
pub use download_manager::DownloadManager;
pub use service::TransactionProcessorService;
