//! # Shared Types Crate
//!
//! Cross-subsystem protocol types for the Sidetree node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the data model (transactions, anchored
//!   operations, DID state, locks) is defined once, here.
//! - **Stable error codes**: every subsystem fails with a [`SidetreeError`]
//!   carrying an [`ErrorCode`]; only the transaction processor and the
//!   observer decide retry versus discard from that code.
//! - **Ports next to adapters**: every external collaborator is a trait in
//!   [`ports`], with an in-memory implementation in [`adapters`].
//! - **Immutable configuration**: [`ProtocolParameters`] is built once and
//!   threaded through constructors.

pub mod adapters;
pub mod canonical;
pub mod entities;
pub mod errors;
pub mod events;
pub mod ports;
pub mod protocol;
pub mod versioning;

pub use entities::*;
pub use errors::{ErrorCode, SidetreeError};
pub use events::{EventEmitter, NoopEventEmitter, RecordingEventEmitter};
pub use protocol::ProtocolParameters;
pub use versioning::{
    BatchWriter, OperationProcessor, ProtocolVersion, TransactionProcessor, TransactionSelector,
    VersionRegistry,
};

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SidetreeError>;
