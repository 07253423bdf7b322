//! # Resolver Subsystem (ST-08)
//!
//! Folds the stored operations of one DID into its current state.
//!
//! ## Resolution Order
//!
//! ```text
//!   creates ──► first valid create
//!                    │
//!                    ▼
//!   recover / deactivate chain   (reveal value opens nextRecoveryCommitmentHash)
//!                    │
//!                    ▼
//!   update chain                 (reveal value opens nextUpdateCommitmentHash)
//! ```
//!
//! | Rule | Detail |
//! |------|--------|
//! | Candidate order | `(transaction_time, transaction_number, operation_index)` |
//! | Anti-replay | a commitment is consumed once; later candidates for it are dead |
//! | Deactivate | terminal, clears both commitments |
//! | Failed patch | commitments advance; document `{}` on create or recover, kept on update |
//! | Invariant error | logged and the operation excluded |

pub mod domain;
pub mod service;

pub use domain::operation_processor::OperationProcessorService;
pub use service::Resolver;
