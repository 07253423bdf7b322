//! # Operations
//!
//! A closed sum type over the four operation kinds. The same JSON shape is
//! used for queued operation requests and for the operation buffers the
//! transaction processor reassembles from anchoring files:
//!
//! | Type | Properties |
//! |------|------------|
//! | create | `type, suffixData, delta` |
//! | update | `type, didSuffix, revealValue, signedData, delta` |
//! | recover | `type, didSuffix, revealValue, signedData, delta` |
//! | deactivate | `type, didSuffix, revealValue, signedData` |

use serde_json::{Map, Value};
use shared_types::{ErrorCode, OperationType, ProtocolParameters, SidetreeError};

use super::delta::{validate_encoded_multihash, Delta, SuffixData};
use super::jws::Jws;
use super::signed_data::{DeactivateSignedData, RecoverSignedData, UpdateSignedData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOperation {
    pub did_unique_suffix: String,
    pub suffix_data: SuffixData,
    pub delta: Option<Delta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOperation {
    pub did_unique_suffix: String,
    pub reveal_value: String,
    pub signed_data_jws: Jws,
    pub signed_data: UpdateSignedData,
    pub delta: Option<Delta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverOperation {
    pub did_unique_suffix: String,
    pub reveal_value: String,
    pub signed_data_jws: Jws,
    pub signed_data: RecoverSignedData,
    pub delta: Option<Delta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivateOperation {
    pub did_unique_suffix: String,
    pub reveal_value: String,
    pub signed_data_jws: Jws,
    pub signed_data: DeactivateSignedData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create(CreateOperation),
    Update(UpdateOperation),
    Recover(RecoverOperation),
    Deactivate(DeactivateOperation),
}

impl Operation {
    /// Parse an anchored operation buffer.
    ///
    /// A missing, oversized or malformed delta yields `delta: None`; the
    /// rest of the operation must be valid.
    pub fn parse(buffer: &[u8], params: &ProtocolParameters) -> Result<Self, SidetreeError> {
        Self::parse_with(buffer, params, false)
    }

    /// Parse an operation request; the delta must be present and valid.
    pub fn parse_request(
        buffer: &[u8],
        params: &ProtocolParameters,
    ) -> Result<Self, SidetreeError> {
        Self::parse_with(buffer, params, true)
    }

    fn parse_with(
        buffer: &[u8],
        params: &ProtocolParameters,
        require_delta: bool,
    ) -> Result<Self, SidetreeError> {
        let value: Value = serde_json::from_slice(buffer)
            .map_err(|e| SidetreeError::new(ErrorCode::OperationNotJson, e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| {
                SidetreeError::new(ErrorCode::OperationNotJson, "operation is not an object")
            })?;

        let operation_type: OperationType = required_str(object, "type")?.parse()?;
        let delta = || parse_delta(object, params, require_delta);

        match operation_type {
            OperationType::Create => {
                allow_only(object, &["type", "suffixData", "delta"])?;
                let suffix_data = SuffixData::from_value(required(object, "suffixData")?)?;
                Ok(Self::Create(CreateOperation {
                    did_unique_suffix: suffix_data.unique_suffix()?,
                    suffix_data,
                    delta: delta()?,
                }))
            }
            OperationType::Update => {
                allow_only(object, &["type", "didSuffix", "revealValue", "signedData", "delta"])?;
                let (did_unique_suffix, reveal_value, signed_data_jws) = parse_common(object)?;
                let signed_data: UpdateSignedData = signed_data_jws.decode_payload()?;
                check_reveal_value(&reveal_value, &signed_data.update_key)?;
                validate_encoded_multihash(&signed_data.delta_hash, "deltaHash")?;
                Ok(Self::Update(UpdateOperation {
                    did_unique_suffix,
                    reveal_value,
                    signed_data_jws,
                    signed_data,
                    delta: delta()?,
                }))
            }
            OperationType::Recover => {
                allow_only(object, &["type", "didSuffix", "revealValue", "signedData", "delta"])?;
                let (did_unique_suffix, reveal_value, signed_data_jws) = parse_common(object)?;
                let signed_data: RecoverSignedData = signed_data_jws.decode_payload()?;
                check_reveal_value(&reveal_value, &signed_data.recovery_key)?;
                validate_encoded_multihash(&signed_data.delta_hash, "deltaHash")?;
                validate_encoded_multihash(&signed_data.recovery_commitment, "recoveryCommitment")?;
                Ok(Self::Recover(RecoverOperation {
                    did_unique_suffix,
                    reveal_value,
                    signed_data_jws,
                    signed_data,
                    delta: delta()?,
                }))
            }
            OperationType::Deactivate => {
                allow_only(object, &["type", "didSuffix", "revealValue", "signedData"])?;
                let (did_unique_suffix, reveal_value, signed_data_jws) = parse_common(object)?;
                let signed_data: DeactivateSignedData = signed_data_jws.decode_payload()?;
                check_reveal_value(&reveal_value, &signed_data.recovery_key)?;
                if signed_data.did_suffix != did_unique_suffix {
                    return Err(SidetreeError::new(
                        ErrorCode::OperationDidSuffixInvalid,
                        "signed didSuffix does not match the operation",
                    ));
                }
                Ok(Self::Deactivate(DeactivateOperation {
                    did_unique_suffix,
                    reveal_value,
                    signed_data_jws,
                    signed_data,
                }))
            }
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Create(_) => OperationType::Create,
            Self::Update(_) => OperationType::Update,
            Self::Recover(_) => OperationType::Recover,
            Self::Deactivate(_) => OperationType::Deactivate,
        }
    }

    pub fn did_unique_suffix(&self) -> &str {
        match self {
            Self::Create(op) => &op.did_unique_suffix,
            Self::Update(op) => &op.did_unique_suffix,
            Self::Recover(op) => &op.did_unique_suffix,
            Self::Deactivate(op) => &op.did_unique_suffix,
        }
    }

    /// `None` for create operations.
    pub fn reveal_value(&self) -> Option<&str> {
        match self {
            Self::Create(_) => None,
            Self::Update(op) => Some(&op.reveal_value),
            Self::Recover(op) => Some(&op.reveal_value),
            Self::Deactivate(op) => Some(&op.reveal_value),
        }
    }

    pub fn delta(&self) -> Option<&Delta> {
        match self {
            Self::Create(op) => op.delta.as_ref(),
            Self::Update(op) => op.delta.as_ref(),
            Self::Recover(op) => op.delta.as_ref(),
            Self::Deactivate(_) => None,
        }
    }
}

fn required<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a Value, SidetreeError> {
    object.get(key).ok_or_else(|| {
        SidetreeError::new(
            ErrorCode::OperationMissingOrUnknownProperty,
            format!("missing '{key}'"),
        )
    })
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, SidetreeError> {
    required(object, key)?.as_str().ok_or_else(|| {
        SidetreeError::new(
            ErrorCode::OperationMissingOrUnknownProperty,
            format!("'{key}' must be a string"),
        )
    })
}

fn allow_only(object: &Map<String, Value>, allowed: &[&str]) -> Result<(), SidetreeError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SidetreeError::new(
            ErrorCode::OperationMissingOrUnknownProperty,
            format!("unknown property '{key}'"),
        )),
        None => Ok(()),
    }
}

fn parse_common(object: &Map<String, Value>) -> Result<(String, String, Jws), SidetreeError> {
    let did_suffix = required_str(object, "didSuffix")?;
    validate_encoded_multihash(did_suffix, "didSuffix")
        .map_err(|e| SidetreeError::new(ErrorCode::OperationDidSuffixInvalid, e.message))?;
    let reveal_value = required_str(object, "revealValue")?;
    validate_encoded_multihash(reveal_value, "revealValue")?;
    let signed_data = Jws::parse_compact(required_str(object, "signedData")?)?;
    Ok((did_suffix.to_string(), reveal_value.to_string(), signed_data))
}

fn check_reveal_value(
    reveal_value: &str,
    key: &super::jwk::PublicKeyJwk,
) -> Result<(), SidetreeError> {
    key.to_public_key()?;
    if key.reveal_value()? != reveal_value {
        return Err(SidetreeError::new(
            ErrorCode::OperationRevealValueMismatch,
            "reveal value is not the hash of the signing key",
        ));
    }
    Ok(())
}

fn parse_delta(
    object: &Map<String, Value>,
    params: &ProtocolParameters,
    require_delta: bool,
) -> Result<Option<Delta>, SidetreeError> {
    let parsed = match object.get("delta") {
        Some(value) => Delta::from_value(value, params),
        None => Err(SidetreeError::new(
            ErrorCode::DeltaMissingOrUnknownProperty,
            "missing 'delta'",
        )),
    };
    match parsed {
        Ok(delta) => Ok(Some(delta)),
        Err(e) if require_delta => Err(e),
        Err(_) => Ok(None),
    }
}
