//! # Core Index File
//!
//! ```text
//! {
//!   writerLockId?, provisionalIndexFileUri?, coreProofFileUri?,
//!   operations?: {
//!     create?:     [{suffixData}],
//!     recover?:    [{didSuffix, revealValue}],
//!     deactivate?: [{didSuffix, revealValue}]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};
use st_01_operations::SuffixData;

use super::common::{
    allow_only, compress_model, decompress_json_object, ensure_unique, non_empty,
    optional_entries, optional_string, FileErrorCodes, OperationReference,
};
use crate::cas_uri::validate_cas_uri;

const CODES: FileErrorCodes = FileErrorCodes {
    decompression: ErrorCode::CoreIndexFileDecompressionFailure,
    not_json: ErrorCode::CoreIndexFileNotJson,
    unknown_property: ErrorCode::CoreIndexFileHasUnknownProperty,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReference {
    pub suffix_data: SuffixData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreIndexOperations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<Vec<CreateReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recover: Option<Vec<OperationReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivate: Option<Vec<OperationReference>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreIndexFileModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_lock_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisional_index_file_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_proof_file_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<CoreIndexOperations>,
}

impl CoreIndexFileModel {
    /// Build a model, leaving out empty operation lists.
    pub fn new(
        writer_lock_id: Option<String>,
        provisional_index_file_uri: Option<String>,
        core_proof_file_uri: Option<String>,
        creates: Vec<CreateReference>,
        recovers: Vec<OperationReference>,
        deactivates: Vec<OperationReference>,
    ) -> Self {
        let operations = CoreIndexOperations {
            create: non_empty(creates),
            recover: non_empty(recovers),
            deactivate: non_empty(deactivates),
        };
        let has_operations = operations.create.is_some()
            || operations.recover.is_some()
            || operations.deactivate.is_some();
        Self {
            writer_lock_id,
            provisional_index_file_uri,
            core_proof_file_uri,
            operations: has_operations.then_some(operations),
        }
    }
}

/// A parsed and validated core index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreIndexFile {
    pub model: CoreIndexFileModel,
    pub create_did_suffixes: Vec<String>,
    pub recover_did_suffixes: Vec<String>,
    pub deactivate_did_suffixes: Vec<String>,
}

impl CoreIndexFile {
    pub fn create_buffer(model: &CoreIndexFileModel) -> Result<Vec<u8>, SidetreeError> {
        compress_model(model)
    }

    pub fn parse(buffer: &[u8], params: &ProtocolParameters) -> Result<Self, SidetreeError> {
        let object = decompress_json_object(
            buffer,
            params.max_decompressed_size(params.max_core_index_file_size_in_bytes),
            &["writerLockId", "provisionalIndexFileUri", "coreProofFileUri", "operations"],
            &CODES,
        )?;

        let writer_lock_id =
            optional_string(&object, "writerLockId", ErrorCode::CoreIndexFileWriterLockIdInvalid)?;
        if let Some(lock_id) = writer_lock_id {
            if lock_id.len() > params.max_writer_lock_id_in_bytes {
                return Err(SidetreeError::new(
                    ErrorCode::CoreIndexFileWriterLockIdInvalid,
                    format!("writer lock ID exceeds {} bytes", params.max_writer_lock_id_in_bytes),
                ));
            }
        }

        let provisional_index_file_uri = optional_string(
            &object,
            "provisionalIndexFileUri",
            ErrorCode::CoreIndexFileHasUnknownProperty,
        )?;
        if let Some(uri) = provisional_index_file_uri {
            validate_cas_uri(uri, params)?;
        }
        let core_proof_file_uri = optional_string(
            &object,
            "coreProofFileUri",
            ErrorCode::CoreIndexFileHasUnknownProperty,
        )?;
        if let Some(uri) = core_proof_file_uri {
            validate_cas_uri(uri, params)?;
        }

        let operations = match object.get("operations") {
            None => None,
            Some(Value::Object(operations)) => {
                allow_only(
                    operations,
                    &["create", "recover", "deactivate"],
                    ErrorCode::CoreIndexFileUnexpectedPropertyInOperations,
                )?;
                let create = optional_entries(
                    operations,
                    "create",
                    ErrorCode::CoreIndexFileCreatePropertyNotArray,
                    parse_create_reference,
                )?;
                let recover = optional_entries(
                    operations,
                    "recover",
                    ErrorCode::CoreIndexFileRecoverPropertyNotArray,
                    OperationReference::parse,
                )?;
                let deactivate = optional_entries(
                    operations,
                    "deactivate",
                    ErrorCode::CoreIndexFileDeactivatePropertyNotArray,
                    OperationReference::parse,
                )?;
                Some(CoreIndexOperations {
                    create,
                    recover,
                    deactivate,
                })
            }
            Some(_) => {
                return Err(SidetreeError::new(
                    ErrorCode::CoreIndexFileOperationsPropertyNotObject,
                    "'operations' is not an object",
                ))
            }
        };

        let model = CoreIndexFileModel {
            writer_lock_id: writer_lock_id.map(str::to_string),
            provisional_index_file_uri: provisional_index_file_uri.map(str::to_string),
            core_proof_file_uri: core_proof_file_uri.map(str::to_string),
            operations,
        };

        let ops = model.operations.clone().unwrap_or_default();
        let create_did_suffixes = ops
            .create
            .iter()
            .flatten()
            .map(|reference| reference.suffix_data.unique_suffix())
            .collect::<Result<Vec<_>, _>>()?;
        let recover_did_suffixes: Vec<String> =
            ops.recover.iter().flatten().map(|r| r.did_suffix.clone()).collect();
        let deactivate_did_suffixes: Vec<String> =
            ops.deactivate.iter().flatten().map(|r| r.did_suffix.clone()).collect();

        ensure_unique(
            create_did_suffixes
                .iter()
                .chain(&recover_did_suffixes)
                .chain(&deactivate_did_suffixes),
            ErrorCode::CoreIndexFileMultipleOperationsForTheSameDid,
        )?;

        if model.provisional_index_file_uri.is_none()
            && (!create_did_suffixes.is_empty() || !recover_did_suffixes.is_empty())
        {
            return Err(SidetreeError::new(
                ErrorCode::CoreIndexFileProvisionalIndexFileUriMissing,
                "create or recover operations need a provisional index file",
            ));
        }

        let has_proofs = !recover_did_suffixes.is_empty() || !deactivate_did_suffixes.is_empty();
        match (has_proofs, model.core_proof_file_uri.is_some()) {
            (true, false) => {
                return Err(SidetreeError::new(
                    ErrorCode::CoreIndexFileCoreProofFileUriMissing,
                    "recover or deactivate operations need a core proof file",
                ))
            }
            (false, true) => {
                return Err(SidetreeError::new(
                    ErrorCode::CoreIndexFileCoreProofFileUriNotAllowed,
                    "core proof file URI given without recover or deactivate operations",
                ))
            }
            _ => {}
        }

        Ok(Self {
            model,
            create_did_suffixes,
            recover_did_suffixes,
            deactivate_did_suffixes,
        })
    }

    /// DID suffixes in create, recover, deactivate order.
    pub fn did_unique_suffixes(&self) -> Vec<String> {
        self.create_did_suffixes
            .iter()
            .chain(&self.recover_did_suffixes)
            .chain(&self.deactivate_did_suffixes)
            .cloned()
            .collect()
    }

    pub fn operation_count(&self) -> usize {
        self.create_did_suffixes.len()
            + self.recover_did_suffixes.len()
            + self.deactivate_did_suffixes.len()
    }

    pub fn creates(&self) -> &[CreateReference] {
        self.model
            .operations
            .as_ref()
            .and_then(|ops| ops.create.as_deref())
            .unwrap_or_default()
    }

    pub fn recovers(&self) -> &[OperationReference] {
        self.model
            .operations
            .as_ref()
            .and_then(|ops| ops.recover.as_deref())
            .unwrap_or_default()
    }

    pub fn deactivates(&self) -> &[OperationReference] {
        self.model
            .operations
            .as_ref()
            .and_then(|ops| ops.deactivate.as_deref())
            .unwrap_or_default()
    }
}

fn parse_create_reference(value: &Value) -> Result<CreateReference, SidetreeError> {
    let object = value.as_object().ok_or_else(|| {
        SidetreeError::new(
            ErrorCode::CoreIndexFileCreateEntryInvalid,
            "create entry is not an object",
        )
    })?;
    allow_only(object, &["suffixData"], ErrorCode::CoreIndexFileCreateEntryInvalid)?;
    let suffix_data = object.get("suffixData").ok_or_else(|| {
        SidetreeError::new(ErrorCode::CoreIndexFileCreateEntryInvalid, "missing 'suffixData'")
    })?;
    Ok(CreateReference {
        suffix_data: SuffixData::from_value(suffix_data)?,
    })
}
