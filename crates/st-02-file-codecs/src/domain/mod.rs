//! Anchoring file models and their validating parsers.

mod common;
pub mod chunk_file;
pub mod core_index_file;
pub mod core_proof_file;
pub mod provisional_index_file;
pub mod provisional_proof_file;

pub use chunk_file::{ChunkFile, ChunkFileModel};
pub use common::{OperationReference, SignedDataReference};
pub use core_index_file::{CoreIndexFile, CoreIndexFileModel, CoreIndexOperations, CreateReference};
pub use core_proof_file::{CoreProofFile, CoreProofFileModel, CoreProofOperations};
pub use provisional_index_file::{
    ChunkReference, ProvisionalIndexFile, ProvisionalIndexFileModel, ProvisionalIndexOperations,
};
pub use provisional_proof_file::{
    ProvisionalProofFile, ProvisionalProofFileModel, ProvisionalProofOperations,
};
