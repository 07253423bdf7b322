//! Parsing helpers shared by the anchoring file codecs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{ErrorCode, SidetreeError};
use st_01_operations::validate_encoded_multihash;

use crate::compressor::{compress, decompress};

/// Per-file error codes for the steps every codec shares.
pub(crate) struct FileErrorCodes {
    pub decompression: ErrorCode,
    pub not_json: ErrorCode,
    pub unknown_property: ErrorCode,
}

/// Decompress within `max_decompressed_size`, parse JSON, require an
/// object with only `allowed` top-level properties.
pub(crate) fn decompress_json_object(
    buffer: &[u8],
    max_decompressed_size: usize,
    allowed: &[&str],
    codes: &FileErrorCodes,
) -> Result<Map<String, Value>, SidetreeError> {
    let decompressed = decompress(buffer, max_decompressed_size)
        .map_err(|e| SidetreeError::new(codes.decompression, e.to_string()))?;
    let value: Value = serde_json::from_slice(&decompressed)
        .map_err(|e| SidetreeError::new(codes.not_json, e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(SidetreeError::new(codes.not_json, "file content is not a JSON object"));
    };
    allow_only(&object, allowed, codes.unknown_property)?;
    Ok(object)
}

/// Canonical JSON of `model`, gzipped.
pub(crate) fn compress_model<T: Serialize>(model: &T) -> Result<Vec<u8>, SidetreeError> {
    let bytes = shared_types::canonical::canonicalize_as_bytes(model)?;
    compress(&bytes)
        .map_err(|e| SidetreeError::new(ErrorCode::CanonicalizationFailed, e.to_string()))
}

pub(crate) fn allow_only(
    object: &Map<String, Value>,
    allowed: &[&str],
    code: ErrorCode,
) -> Result<(), SidetreeError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SidetreeError::new(code, format!("unexpected property '{key}'"))),
        None => Ok(()),
    }
}

/// Array property, or an error with `code` when present but not an array.
pub(crate) fn optional_array<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    code: ErrorCode,
) -> Result<Option<&'a Vec<Value>>, SidetreeError> {
    match object.get(key) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(SidetreeError::new(code, format!("'{key}' is not an array"))),
    }
}

/// Optional array property with every entry parsed by `parse`.
pub(crate) fn optional_entries<T>(
    object: &Map<String, Value>,
    key: &str,
    not_array: ErrorCode,
    parse: impl Fn(&Value) -> Result<T, SidetreeError>,
) -> Result<Option<Vec<T>>, SidetreeError> {
    optional_array(object, key, not_array)?
        .map(|entries| entries.iter().map(&parse).collect::<Result<Vec<T>, SidetreeError>>())
        .transpose()
}

pub(crate) fn optional_string<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    code: ErrorCode,
) -> Result<Option<&'a str>, SidetreeError> {
    match object.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(SidetreeError::new(code, format!("'{key}' is not a string"))),
    }
}

/// `{didSuffix, revealValue}` entry of an index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReference {
    pub did_suffix: String,
    pub reveal_value: String,
}

impl OperationReference {
    pub(crate) fn parse(value: &Value) -> Result<Self, SidetreeError> {
        let missing = || {
            SidetreeError::new(
                ErrorCode::OperationReferenceMissingOrUnknownProperty,
                "operation reference must be exactly {didSuffix, revealValue}",
            )
        };
        let object = value.as_object().ok_or_else(missing)?;
        if object.len() != 2 {
            return Err(missing());
        }
        let did_suffix = object
            .get("didSuffix")
            .and_then(Value::as_str)
            .ok_or_else(missing)?;
        let reveal_value = object
            .get("revealValue")
            .and_then(Value::as_str)
            .ok_or_else(missing)?;

        validate_encoded_multihash(did_suffix, "didSuffix").map_err(|e| {
            SidetreeError::new(ErrorCode::OperationReferenceDidSuffixInvalid, e.message)
        })?;
        validate_encoded_multihash(reveal_value, "revealValue").map_err(|e| {
            SidetreeError::new(ErrorCode::OperationReferenceRevealValueInvalid, e.message)
        })?;

        Ok(Self {
            did_suffix: did_suffix.to_string(),
            reveal_value: reveal_value.to_string(),
        })
    }
}

/// `{signedData}` entry of a proof file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDataReference {
    pub signed_data: String,
}

impl SignedDataReference {
    pub(crate) fn parse(value: &Value) -> Result<Self, SidetreeError> {
        let invalid = || {
            SidetreeError::new(
                ErrorCode::ProofFileEntryHasMissingOrUnknownProperty,
                "proof entry must be exactly {signedData}",
            )
        };
        let object = value.as_object().ok_or_else(invalid)?;
        if object.len() != 1 {
            return Err(invalid());
        }
        let signed_data = object.get("signedData").and_then(Value::as_str).ok_or_else(invalid)?;
        Ok(Self {
            signed_data: signed_data.to_string(),
        })
    }
}

/// Fail with `code` on the first repeated DID suffix.
pub(crate) fn ensure_unique<'a>(
    did_suffixes: impl IntoIterator<Item = &'a String>,
    code: ErrorCode,
) -> Result<(), SidetreeError> {
    let mut seen = HashSet::new();
    for did_suffix in did_suffixes {
        if !seen.insert(did_suffix) {
            return Err(SidetreeError::new(
                code,
                format!("DID suffix {did_suffix} appears more than once"),
            ));
        }
    }
    Ok(())
}

/// `None` for an empty list so optional arrays are left out of created files.
pub(crate) fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
