//! Compact JWS with ES256K signatures.
//!
//! `base64url(header).base64url(payload).base64url(signature)` where the
//! header is exactly `{"alg":"ES256K"}` and the signature is the 64-byte
//! `r || s` over `header.payload`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use shared_crypto::{
    decode_base64url, encode_base64url, is_base64url_string, Secp256k1KeyPair, Secp256k1Signature,
};
use shared_types::canonical::canonicalize_as_bytes;
use shared_types::{ErrorCode, SidetreeError};

use super::jwk::PublicKeyJwk;

const ALGORITHM: &str = "ES256K";

/// Parsed compact JWS; the three segments are kept in encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

impl Jws {
    /// Parse a compact JWS and validate its protected header.
    pub fn parse_compact(compact: &str) -> Result<Self, SidetreeError> {
        let parts: Vec<&str> = compact.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| !is_base64url_string(p)) {
            return Err(SidetreeError::new(
                ErrorCode::JwsCompactFormatInvalid,
                "expected three base64url segments",
            ));
        }

        let header_bytes = decode_base64url(parts[0])
            .map_err(|e| SidetreeError::new(ErrorCode::JwsProtectedHeaderInvalid, e.to_string()))?;
        let header: Value = serde_json::from_slice(&header_bytes)
            .map_err(|e| SidetreeError::new(ErrorCode::JwsProtectedHeaderInvalid, e.to_string()))?;
        if header != json!({ "alg": ALGORITHM }) {
            return Err(SidetreeError::new(
                ErrorCode::JwsProtectedHeaderInvalid,
                format!("protected header must be exactly {{\"alg\":\"{ALGORITHM}\"}}"),
            ));
        }

        Ok(Self {
            protected: parts[0].to_string(),
            payload: parts[1].to_string(),
            signature: parts[2].to_string(),
        })
    }

    /// Sign `payload` as canonical JSON.
    pub fn sign<T: Serialize>(
        payload: &T,
        key_pair: &Secp256k1KeyPair,
    ) -> Result<Self, SidetreeError> {
        let protected = encode_base64url(canonicalize_as_bytes(&json!({ "alg": ALGORITHM }))?);
        let payload = encode_base64url(canonicalize_as_bytes(payload)?);
        let signature = key_pair.sign(format!("{protected}.{payload}").as_bytes());
        Ok(Self {
            protected,
            payload,
            signature: encode_base64url(signature.as_bytes()),
        })
    }

    pub fn to_compact(&self) -> String {
        format!("{}.{}.{}", self.protected, self.payload, self.signature)
    }

    /// Decode the payload as JSON into `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, SidetreeError> {
        let bytes = decode_base64url(&self.payload)
            .map_err(|e| SidetreeError::new(ErrorCode::JwsPayloadNotJson, e.to_string()))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| SidetreeError::new(ErrorCode::JwsPayloadNotJson, e.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| SidetreeError::new(ErrorCode::OperationSignedDataInvalid, e.to_string()))
    }

    /// Verify the signature against `jwk`.
    pub fn verify(&self, jwk: &PublicKeyJwk) -> Result<(), SidetreeError> {
        let public_key = jwk.to_public_key()?;
        let signature_bytes = decode_base64url(&self.signature)
            .map_err(|e| SidetreeError::new(ErrorCode::JwsSignatureInvalid, e.to_string()))?;
        let signature = Secp256k1Signature::from_slice(&signature_bytes)
            .map_err(|e| SidetreeError::new(ErrorCode::JwsSignatureInvalid, e.to_string()))?;
        public_key
            .verify(
                format!("{}.{}", self.protected, self.payload).as_bytes(),
                &signature,
            )
            .map_err(|e| SidetreeError::new(ErrorCode::JwsSignatureInvalid, e.to_string()))
    }
}
