//! Deltas and create-operation suffix data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_crypto::Multihash;
use shared_types::canonical::{canonicalize_as_bytes, canonicalize_then_hash_then_encode};
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};

/// Document changes plus the commitment for the next update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Delta {
    pub patches: Vec<Value>,
    pub update_commitment: String,
}

impl Delta {
    /// Parse a delta, enforcing the canonical size ceiling.
    pub fn from_value(value: &Value, params: &ProtocolParameters) -> Result<Self, SidetreeError> {
        let size = canonicalize_as_bytes(value)?.len();
        if size > params.max_delta_size_in_bytes {
            return Err(SidetreeError::new(
                ErrorCode::DeltaExceedsMaximumSize,
                format!(
                    "delta is {size} bytes, limit {}",
                    params.max_delta_size_in_bytes
                ),
            ));
        }
        let delta: Self = serde_json::from_value(value.clone())
            .map_err(|e| {
                SidetreeError::new(ErrorCode::DeltaMissingOrUnknownProperty, e.to_string())
            })?;
        validate_encoded_multihash(&delta.update_commitment, "updateCommitment")?;
        Ok(delta)
    }

    /// `encode(multihash(sha256(canonical(delta))))`
    pub fn hash(&self) -> Result<String, SidetreeError> {
        canonicalize_then_hash_then_encode(self)
    }
}

/// The part of a create operation that determines the DID suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SuffixData {
    pub delta_hash: String,
    pub recovery_commitment: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub did_type: Option<String>,
}

impl SuffixData {
    pub fn from_value(value: &Value) -> Result<Self, SidetreeError> {
        let suffix_data: Self = serde_json::from_value(value.clone()).map_err(|e| {
            SidetreeError::new(ErrorCode::SuffixDataMissingOrUnknownProperty, e.to_string())
        })?;
        validate_encoded_multihash(&suffix_data.delta_hash, "deltaHash")?;
        validate_encoded_multihash(&suffix_data.recovery_commitment, "recoveryCommitment")?;
        Ok(suffix_data)
    }

    /// DID unique suffix derived from this suffix data.
    pub fn unique_suffix(&self) -> Result<String, SidetreeError> {
        canonicalize_then_hash_then_encode(self)
    }
}

/// Fail unless `encoded` is a supported base64url multihash.
pub fn validate_encoded_multihash(encoded: &str, property: &str) -> Result<(), SidetreeError> {
    Multihash::decode(encoded).map(|_| ()).map_err(|e| {
        SidetreeError::new(
            ErrorCode::EncodedMultihashInvalid,
            format!("{property}: {e}"),
        )
    })
}
