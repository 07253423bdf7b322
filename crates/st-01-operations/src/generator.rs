//! Operation generator.
//!
//! Builds well-formed, signed operation requests with fresh keys. Used by
//! tests across the workspace and by the development binary.

use serde_json::{json, Value};
use shared_crypto::Secp256k1KeyPair;
use shared_types::SidetreeError;

use crate::domain::delta::{Delta, SuffixData};
use crate::domain::jwk::PublicKeyJwk;
use crate::domain::jws::Jws;
use crate::domain::signed_data::{DeactivateSignedData, RecoverSignedData, UpdateSignedData};

/// A create request together with the keys that control the new DID.
pub struct GeneratedCreate {
    pub did_unique_suffix: String,
    pub operation_buffer: Vec<u8>,
    pub delta: Delta,
    pub recovery_key_pair: Secp256k1KeyPair,
    pub update_key_pair: Secp256k1KeyPair,
}

/// An update/recover/deactivate request and the keys committed to for the next operation.
pub struct GeneratedOperation {
    pub did_unique_suffix: String,
    pub operation_buffer: Vec<u8>,
    pub delta: Option<Delta>,
    pub next_update_key_pair: Option<Secp256k1KeyPair>,
    pub next_recovery_key_pair: Option<Secp256k1KeyPair>,
}

pub struct OperationGenerator;

impl OperationGenerator {
    /// Public key entry usable in `publicKeys`.
    pub fn public_key_entry(id: &str, key_pair: &Secp256k1KeyPair) -> Value {
        json!({
            "id": id,
            "type": "EcdsaSecp256k1VerificationKey2019",
            "publicKeyJwk": PublicKeyJwk::from_public_key(&key_pair.public_key()),
            "purposes": ["authentication"],
        })
    }

    pub fn service_entry(id: &str) -> Value {
        json!({
            "id": id,
            "type": "LinkedDomains",
            "serviceEndpoint": format!("https://{id}.example.com"),
        })
    }

    /// Create with a document holding one signing key and one service.
    pub fn generate_create_operation() -> Result<GeneratedCreate, SidetreeError> {
        let signing_key = Secp256k1KeyPair::generate();
        let patches = vec![json!({
            "action": "replace",
            "document": {
                "publicKeys": [Self::public_key_entry("signingKey", &signing_key)],
                "services": [Self::service_entry("service1")],
            }
        })];
        Self::create_operation_with_patches(patches)
    }

    pub fn create_operation_with_patches(
        patches: Vec<Value>,
    ) -> Result<GeneratedCreate, SidetreeError> {
        let recovery_key_pair = Secp256k1KeyPair::generate();
        let update_key_pair = Secp256k1KeyPair::generate();

        let delta = Delta {
            patches,
            update_commitment: jwk_of(&update_key_pair).commitment()?,
        };
        let suffix_data = SuffixData {
            delta_hash: delta.hash()?,
            recovery_commitment: jwk_of(&recovery_key_pair).commitment()?,
            did_type: None,
        };
        let did_unique_suffix = suffix_data.unique_suffix()?;
        let operation_buffer = to_buffer(&json!({
            "type": "create",
            "suffixData": suffix_data,
            "delta": delta,
        }))?;

        Ok(GeneratedCreate {
            did_unique_suffix,
            operation_buffer,
            delta,
            recovery_key_pair,
            update_key_pair,
        })
    }

    /// Update adding one service.
    pub fn generate_update_operation(
        did_unique_suffix: &str,
        update_key_pair: &Secp256k1KeyPair,
    ) -> Result<GeneratedOperation, SidetreeError> {
        let patches = vec![json!({
            "action": "add-services",
            "services": [Self::service_entry("service2")],
        })];
        Self::update_operation_with_patches(did_unique_suffix, update_key_pair, patches)
    }

    pub fn update_operation_with_patches(
        did_unique_suffix: &str,
        update_key_pair: &Secp256k1KeyPair,
        patches: Vec<Value>,
    ) -> Result<GeneratedOperation, SidetreeError> {
        let next_update_key_pair = Secp256k1KeyPair::generate();
        let update_key = jwk_of(update_key_pair);

        let delta = Delta {
            patches,
            update_commitment: jwk_of(&next_update_key_pair).commitment()?,
        };
        let signed_data = Jws::sign(
            &UpdateSignedData {
                update_key: update_key.clone(),
                delta_hash: delta.hash()?,
            },
            update_key_pair,
        )?;
        let operation_buffer = to_buffer(&json!({
            "type": "update",
            "didSuffix": did_unique_suffix,
            "revealValue": update_key.reveal_value()?,
            "signedData": signed_data.to_compact(),
            "delta": delta,
        }))?;

        Ok(GeneratedOperation {
            did_unique_suffix: did_unique_suffix.to_string(),
            operation_buffer,
            delta: Some(delta),
            next_update_key_pair: Some(next_update_key_pair),
            next_recovery_key_pair: None,
        })
    }

    /// Recover replacing the document with a fresh signing key.
    pub fn generate_recover_operation(
        did_unique_suffix: &str,
        recovery_key_pair: &Secp256k1KeyPair,
    ) -> Result<GeneratedOperation, SidetreeError> {
        let signing_key = Secp256k1KeyPair::generate();
        let patches = vec![json!({
            "action": "replace",
            "document": { "publicKeys": [Self::public_key_entry("recoveredKey", &signing_key)] }
        })];
        Self::recover_operation_with_patches(did_unique_suffix, recovery_key_pair, patches)
    }

    pub fn recover_operation_with_patches(
        did_unique_suffix: &str,
        recovery_key_pair: &Secp256k1KeyPair,
        patches: Vec<Value>,
    ) -> Result<GeneratedOperation, SidetreeError> {
        let next_recovery_key_pair = Secp256k1KeyPair::generate();
        let next_update_key_pair = Secp256k1KeyPair::generate();
        let recovery_key = jwk_of(recovery_key_pair);

        let delta = Delta {
            patches,
            update_commitment: jwk_of(&next_update_key_pair).commitment()?,
        };
        let signed_data = Jws::sign(
            &RecoverSignedData {
                recovery_commitment: jwk_of(&next_recovery_key_pair).commitment()?,
                recovery_key: recovery_key.clone(),
                delta_hash: delta.hash()?,
            },
            recovery_key_pair,
        )?;
        let operation_buffer = to_buffer(&json!({
            "type": "recover",
            "didSuffix": did_unique_suffix,
            "revealValue": recovery_key.reveal_value()?,
            "signedData": signed_data.to_compact(),
            "delta": delta,
        }))?;

        Ok(GeneratedOperation {
            did_unique_suffix: did_unique_suffix.to_string(),
            operation_buffer,
            delta: Some(delta),
            next_update_key_pair: Some(next_update_key_pair),
            next_recovery_key_pair: Some(next_recovery_key_pair),
        })
    }

    pub fn generate_deactivate_operation(
        did_unique_suffix: &str,
        recovery_key_pair: &Secp256k1KeyPair,
    ) -> Result<GeneratedOperation, SidetreeError> {
        let recovery_key = jwk_of(recovery_key_pair);
        let signed_data = Jws::sign(
            &DeactivateSignedData {
                did_suffix: did_unique_suffix.to_string(),
                recovery_key: recovery_key.clone(),
            },
            recovery_key_pair,
        )?;
        let operation_buffer = to_buffer(&json!({
            "type": "deactivate",
            "didSuffix": did_unique_suffix,
            "revealValue": recovery_key.reveal_value()?,
            "signedData": signed_data.to_compact(),
        }))?;

        Ok(GeneratedOperation {
            did_unique_suffix: did_unique_suffix.to_string(),
            operation_buffer,
            delta: None,
            next_update_key_pair: None,
            next_recovery_key_pair: None,
        })
    }
}

fn jwk_of(key_pair: &Secp256k1KeyPair) -> PublicKeyJwk {
    PublicKeyJwk::from_public_key(&key_pair.public_key())
}

fn to_buffer(value: &Value) -> Result<Vec<u8>, SidetreeError> {
    shared_types::canonical::canonicalize_as_bytes(value)
}
