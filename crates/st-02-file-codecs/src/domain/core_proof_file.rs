//! # Core Proof File
//!
//! ```text
//! { operations: { recover?: [{signedData}], deactivate?: [{signedData}] } }
//! ```
//!
//! Proofs are aligned by position with the recover and deactivate
//! references of the core index file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};
use st_01_operations::{DeactivateSignedData, Jws, RecoverSignedData};

use super::common::{
    allow_only, compress_model, decompress_json_object, non_empty, optional_entries,
    FileErrorCodes, SignedDataReference,
};

const CODES: FileErrorCodes = FileErrorCodes {
    decompression: ErrorCode::CoreProofFileDecompressionFailure,
    not_json: ErrorCode::CoreProofFileNotJson,
    unknown_property: ErrorCode::CoreProofFileHasUnknownProperty,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreProofOperations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recover: Option<Vec<SignedDataReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivate: Option<Vec<SignedDataReference>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreProofFileModel {
    pub operations: CoreProofOperations,
}

impl CoreProofFileModel {
    pub fn new(recover: Vec<SignedDataReference>, deactivate: Vec<SignedDataReference>) -> Self {
        Self {
            operations: CoreProofOperations {
                recover: non_empty(recover),
                deactivate: non_empty(deactivate),
            },
        }
    }
}

/// A parsed core proof file with decoded signed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreProofFile {
    pub model: CoreProofFileModel,
    pub recover_proofs: Vec<(Jws, RecoverSignedData)>,
    pub deactivate_proofs: Vec<(Jws, DeactivateSignedData)>,
}

impl CoreProofFile {
    pub fn create_buffer(model: &CoreProofFileModel) -> Result<Vec<u8>, SidetreeError> {
        compress_model(model)
    }

    /// Parse and check each deactivate proof against the DID suffix at the
    /// same position in `expected_deactivate_did_suffixes`.
    pub fn parse(
        buffer: &[u8],
        params: &ProtocolParameters,
        expected_deactivate_did_suffixes: &[String],
    ) -> Result<Self, SidetreeError> {
        let object = decompress_json_object(
            buffer,
            params.max_decompressed_size(params.max_proof_file_size_in_bytes),
            &["operations"],
            &CODES,
        )?;

        let operations = match object.get("operations") {
            Some(Value::Object(operations)) => operations,
            _ => {
                return Err(SidetreeError::new(
                    ErrorCode::CoreProofFileOperationsPropertyHasMissingOrUnknownProperty,
                    "'operations' must be an object",
                ))
            }
        };
        allow_only(
            operations,
            &["recover", "deactivate"],
            ErrorCode::CoreProofFileOperationsPropertyHasMissingOrUnknownProperty,
        )?;

        let recover = optional_entries(
            operations,
            "recover",
            ErrorCode::CoreProofFileRecoverPropertyNotArray,
            SignedDataReference::parse,
        )?;
        let deactivate = optional_entries(
            operations,
            "deactivate",
            ErrorCode::CoreProofFileDeactivatePropertyNotArray,
            SignedDataReference::parse,
        )?;

        let recover_proofs = recover
            .iter()
            .flatten()
            .map(|reference| {
                let jws = Jws::parse_compact(&reference.signed_data)?;
                let signed_data: RecoverSignedData = jws.decode_payload()?;
                Ok((jws, signed_data))
            })
            .collect::<Result<Vec<_>, SidetreeError>>()?;

        let deactivate_proofs = deactivate
            .iter()
            .flatten()
            .enumerate()
            .map(|(index, reference)| {
                let jws = Jws::parse_compact(&reference.signed_data)?;
                let signed_data: DeactivateSignedData = jws.decode_payload()?;
                if expected_deactivate_did_suffixes.get(index) != Some(&signed_data.did_suffix) {
                    return Err(SidetreeError::new(
                        ErrorCode::CoreProofFileDeactivateDidSuffixMismatch,
                        format!("deactivate proof {index} signs a different DID suffix"),
                    ));
                }
                Ok((jws, signed_data))
            })
            .collect::<Result<Vec<_>, SidetreeError>>()?;

        if recover_proofs.is_empty() && deactivate_proofs.is_empty() {
            return Err(SidetreeError::new(
                ErrorCode::CoreProofFileHasNoProofs,
                "core proof file contains no proofs",
            ));
        }

        Ok(Self {
            model: CoreProofFileModel {
                operations: CoreProofOperations { recover, deactivate },
            },
            recover_proofs,
            deactivate_proofs,
        })
    }

    pub fn recover_signed_data(&self) -> Vec<String> {
        self.recover_proofs.iter().map(|(jws, _)| jws.to_compact()).collect()
    }

    pub fn deactivate_signed_data(&self) -> Vec<String> {
        self.deactivate_proofs.iter().map(|(jws, _)| jws.to_compact()).collect()
    }
}
