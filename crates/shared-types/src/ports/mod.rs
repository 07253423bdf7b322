//! # Ports
//!
//! Traits for every external collaborator the node drives. Production
//! deployments supply their own implementations; [`crate::adapters`]
//! holds in-memory ones.

pub mod cas;
pub mod clock;
pub mod ledger;
pub mod queue;
pub mod stores;

pub use cas::{CasClient, FetchResult, FetchResultCode};
pub use clock::{SystemTimeSource, TimeSource};
pub use ledger::{LedgerClient, LedgerReadResult};
pub use queue::OperationQueue;
pub use stores::{
    BlockMetadataStore, ConfirmationStore, OperationStore, TransactionStore,
    UnresolvableTransactionStore,
};
