//! # Sidetree Node Test Suite
//!
//! Scenarios that cross crate boundaries: operations are anchored on the
//! mock ledger, observed into the stores and resolved back into DID states.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs     # in-memory node plus hand-anchoring helpers
//!     ├── anchoring.rs   # batches as observed by another node
//!     ├── reorg.rs       # ledger forks
//!     ├── ordering.rs    # commitment replay and store insertion order
//!     └── node_loop.rs   # submit, write, observe, resolve
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p st-tests
//! cargo test -p st-tests integration::reorg::
//! ```

pub mod integration;
