//! # Provisional Proof File
//!
//! `{operations: {update: [{signedData}]}}`, aligned by position with the
//! update references of the provisional index file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};
use st_01_operations::{Jws, UpdateSignedData};

use super::common::{
    allow_only, compress_model, decompress_json_object, FileErrorCodes, SignedDataReference,
};

const CODES: FileErrorCodes = FileErrorCodes {
    decompression: ErrorCode::ProvisionalProofFileDecompressionFailure,
    not_json: ErrorCode::ProvisionalProofFileNotJson,
    unknown_property: ErrorCode::ProvisionalProofFileHasUnknownProperty,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalProofOperations {
    pub update: Vec<SignedDataReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalProofFileModel {
    pub operations: ProvisionalProofOperations,
}

impl ProvisionalProofFileModel {
    pub fn new(update: Vec<SignedDataReference>) -> Self {
        Self {
            operations: ProvisionalProofOperations { update },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalProofFile {
    pub model: ProvisionalProofFileModel,
    pub update_proofs: Vec<(Jws, UpdateSignedData)>,
}

impl ProvisionalProofFile {
    pub fn create_buffer(model: &ProvisionalProofFileModel) -> Result<Vec<u8>, SidetreeError> {
        compress_model(model)
    }

    pub fn parse(buffer: &[u8], params: &ProtocolParameters) -> Result<Self, SidetreeError> {
        let object = decompress_json_object(
            buffer,
            params.max_decompressed_size(params.max_proof_file_size_in_bytes),
            &["operations"],
            &CODES,
        )?;

        let shape_error = || {
            SidetreeError::new(
                ErrorCode::ProvisionalProofFileOperationsPropertyHasMissingOrUnknownProperty,
                "'operations' must be exactly {update}",
            )
        };
        let operations = object
            .get("operations")
            .and_then(Value::as_object)
            .ok_or_else(shape_error)?;
        allow_only(
            operations,
            &["update"],
            ErrorCode::ProvisionalProofFileOperationsPropertyHasMissingOrUnknownProperty,
        )?;
        let update = match operations.get("update") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(SignedDataReference::parse)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(SidetreeError::new(
                    ErrorCode::ProvisionalProofFileUpdatePropertyNotArray,
                    "'update' is not an array",
                ))
            }
            None => return Err(shape_error()),
        };

        let update_proofs = update
            .iter()
            .map(|reference| {
                let jws = Jws::parse_compact(&reference.signed_data)?;
                let signed_data: UpdateSignedData = jws.decode_payload()?;
                Ok((jws, signed_data))
            })
            .collect::<Result<Vec<_>, SidetreeError>>()?;

        if update_proofs.is_empty() {
            return Err(SidetreeError::new(
                ErrorCode::ProvisionalProofFileHasNoProofs,
                "provisional proof file contains no proofs",
            ));
        }

        Ok(Self {
            model: ProvisionalProofFileModel::new(update),
            update_proofs,
        })
    }

    pub fn update_signed_data(&self) -> Vec<String> {
        self.update_proofs.iter().map(|(jws, _)| jws.to_compact()).collect()
    }
}
