//! # In-Memory Adapters
//!
//! One in-memory implementation per port. Used by tests, by the
//! development binary, and as executable documentation of each port's
//! contract.

pub mod cas;
pub mod clock;
pub mod ledger;
pub mod queue;
pub mod stores;

pub use cas::InMemoryCas;
pub use clock::ManualClock;
pub use ledger::MockLedger;
pub use queue::InMemoryOperationQueue;
pub use stores::{
    InMemoryBlockMetadataStore, InMemoryConfirmationStore, InMemoryOperationStore,
    InMemoryTransactionStore, InMemoryUnresolvableTransactionStore,
};
