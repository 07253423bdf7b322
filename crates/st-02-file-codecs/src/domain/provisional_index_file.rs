//! # Provisional Index File
//!
//! ```text
//! {
//!   provisionalProofFileUri?,
//!   chunks: [{chunkFileUri}],
//!   operations?: { update: [{didSuffix, revealValue}] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};

use super::common::{
    allow_only, compress_model, decompress_json_object, ensure_unique, optional_string,
    FileErrorCodes, OperationReference,
};
use crate::cas_uri::validate_cas_uri;

const CODES: FileErrorCodes = FileErrorCodes {
    decompression: ErrorCode::ProvisionalIndexFileDecompressionFailure,
    not_json: ErrorCode::ProvisionalIndexFileNotJson,
    unknown_property: ErrorCode::ProvisionalIndexFileHasUnknownProperty,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReference {
    pub chunk_file_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalIndexOperations {
    pub update: Vec<OperationReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionalIndexFileModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisional_proof_file_uri: Option<String>,
    pub chunks: Vec<ChunkReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<ProvisionalIndexOperations>,
}

impl ProvisionalIndexFileModel {
    /// Build a model, leaving out an empty update list.
    pub fn new(
        provisional_proof_file_uri: Option<String>,
        chunk_file_uri: String,
        updates: Vec<OperationReference>,
    ) -> Self {
        Self {
            provisional_proof_file_uri,
            chunks: vec![ChunkReference { chunk_file_uri }],
            operations: (!updates.is_empty())
                .then_some(ProvisionalIndexOperations { update: updates }),
        }
    }
}

/// A parsed and validated provisional index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalIndexFile {
    pub model: ProvisionalIndexFileModel,
    pub did_unique_suffixes: Vec<String>,
}

impl ProvisionalIndexFile {
    pub fn create_buffer(model: &ProvisionalIndexFileModel) -> Result<Vec<u8>, SidetreeError> {
        compress_model(model)
    }

    pub fn parse(buffer: &[u8], params: &ProtocolParameters) -> Result<Self, SidetreeError> {
        let object = decompress_json_object(
            buffer,
            params.max_decompressed_size(params.max_provisional_index_file_size_in_bytes),
            &["provisionalProofFileUri", "chunks", "operations"],
            &CODES,
        )?;

        let provisional_proof_file_uri = optional_string(
            &object,
            "provisionalProofFileUri",
            ErrorCode::ProvisionalIndexFileHasUnknownProperty,
        )?;
        if let Some(uri) = provisional_proof_file_uri {
            validate_cas_uri(uri, params)?;
        }

        let chunks = match object.get("chunks") {
            Some(Value::Array(chunks)) if chunks.len() == 1 => chunks,
            _ => {
                return Err(SidetreeError::new(
                    ErrorCode::ProvisionalIndexFileChunksPropertyDoesNotHaveExactlyOneElement,
                    "'chunks' must be an array with exactly one element",
                ))
            }
        };
        let chunk_file_uri = chunks[0]
            .as_object()
            .filter(|chunk| chunk.len() == 1)
            .and_then(|chunk| chunk.get("chunkFileUri"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SidetreeError::new(
                    ErrorCode::ProvisionalIndexFileChunkHasMissingOrUnknownProperty,
                    "chunk entry must be exactly {chunkFileUri}",
                )
            })?;
        validate_cas_uri(chunk_file_uri, params)?;

        const BAD_OPERATIONS: ErrorCode =
            ErrorCode::ProvisionalIndexFileOperationsPropertyHasMissingOrUnknownProperty;
        let operations = match object.get("operations") {
            None => None,
            Some(Value::Object(operations)) => {
                allow_only(operations, &["update"], BAD_OPERATIONS)?;
                let update = match operations.get("update") {
                    Some(Value::Array(entries)) => entries
                        .iter()
                        .map(OperationReference::parse)
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => {
                        return Err(SidetreeError::new(
                            ErrorCode::ProvisionalIndexFileUpdateOperationsNotArray,
                            "'update' is not an array",
                        ))
                    }
                    None => {
                        return Err(SidetreeError::new(
                            BAD_OPERATIONS,
                            "'operations' must contain 'update'",
                        ))
                    }
                };
                Some(ProvisionalIndexOperations { update })
            }
            Some(_) => {
                return Err(SidetreeError::new(
                    BAD_OPERATIONS,
                    "'operations' is not an object",
                ))
            }
        };

        let did_unique_suffixes: Vec<String> = operations
            .iter()
            .flat_map(|ops| ops.update.iter().map(|r| r.did_suffix.clone()))
            .collect();
        ensure_unique(
            &did_unique_suffixes,
            ErrorCode::ProvisionalIndexFileMultipleOperationsForTheSameDid,
        )?;

        match (did_unique_suffixes.is_empty(), provisional_proof_file_uri.is_some()) {
            (true, true) => {
                return Err(SidetreeError::new(
                    ErrorCode::ProvisionalIndexFileProvisionalProofFileUriNotAllowed,
                    "provisional proof file URI given without update operations",
                ))
            }
            (false, false) => {
                return Err(SidetreeError::new(
                    ErrorCode::ProvisionalIndexFileProvisionalProofFileUriMissing,
                    "update operations need a provisional proof file",
                ))
            }
            _ => {}
        }

        Ok(Self {
            model: ProvisionalIndexFileModel {
                provisional_proof_file_uri: provisional_proof_file_uri.map(str::to_string),
                chunks: vec![ChunkReference {
                    chunk_file_uri: chunk_file_uri.to_string(),
                }],
                operations,
            },
            did_unique_suffixes,
        })
    }

    pub fn chunk_file_uri(&self) -> &str {
        self.model
            .chunks
            .first()
            .map(|chunk| chunk.chunk_file_uri.as_str())
            .unwrap_or_default()
    }

    pub fn updates(&self) -> &[OperationReference] {
        self.model
            .operations
            .as_ref()
            .map(|ops| ops.update.as_slice())
            .unwrap_or_default()
    }
}
