//! # File Codecs - Anchor String and Anchoring Files
//!
//! One anchor string on the ledger points at a tree of gzipped JSON files
//! in content-addressable storage:
//!
//! ```text
//! anchor "<coreIndexUri>.<n>"
//!   └─ core index file ──┬─ core proof file          (recover, deactivate)
//!                        └─ provisional index file ─┬─ provisional proof file (update)
//!                                                   └─ chunk file (deltas)
//! ```
//!
//! | File | Size ceiling | Holds |
//! |------|--------------|-------|
//! | core index | `max_core_index_file_size_in_bytes` | creates, recover/deactivate references |
//! | core proof | `max_proof_file_size_in_bytes` | recover/deactivate signed data |
//! | provisional index | `max_provisional_index_file_size_in_bytes` | updates, chunk URI |
//! | provisional proof | `max_proof_file_size_in_bytes` | update signed data |
//! | chunk | `max_chunk_file_size_in_bytes` | deltas, create → recover → update |
//!
//! Every parser decompresses within `estimated_decompression_multiplier`
//! times the ceiling and rejects unknown properties.

pub mod anchored_data;
pub mod cas_uri;
pub mod compressor;
pub mod domain;

pub use anchored_data::AnchoredData;
pub use cas_uri::validate_cas_uri;
pub use compressor::{compress, decompress, CompressionError};
pub use domain::*;
