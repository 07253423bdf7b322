//! secp256k1 public keys in JWK form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_crypto::{decode_base64url, encode_base64url, Secp256k1PublicKey};
use shared_types::canonical::{
    canonicalize_then_double_hash_then_encode, canonicalize_then_hash_then_encode,
};
use shared_types::{ErrorCode, SidetreeError};

const KEY_TYPE: &str = "EC";
const CURVE: &str = "secp256k1";

/// `{kty: "EC", crv: "secp256k1", x, y}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl PublicKeyJwk {
    pub fn from_public_key(key: &Secp256k1PublicKey) -> Self {
        Self {
            kty: KEY_TYPE.to_string(),
            crv: CURVE.to_string(),
            x: encode_base64url(key.x()),
            y: encode_base64url(key.y()),
        }
    }

    /// Parse and validate a JWK value, rejecting private keys.
    pub fn from_value(value: &Value) -> Result<Self, SidetreeError> {
        if value.get("d").is_some() {
            return Err(SidetreeError::new(
                ErrorCode::JwkHasPrivateKey,
                "public key JWK must not carry 'd'",
            ));
        }
        let jwk: Self = serde_json::from_value(value.clone())
            .map_err(|e| SidetreeError::new(ErrorCode::JwkEs256kInvalid, e.to_string()))?;
        jwk.to_public_key()?;
        Ok(jwk)
    }

    /// Decode into a curve point.
    pub fn to_public_key(&self) -> Result<Secp256k1PublicKey, SidetreeError> {
        if self.kty != KEY_TYPE || self.crv != CURVE {
            return Err(SidetreeError::new(
                ErrorCode::JwkEs256kInvalid,
                format!("unsupported key {}/{}", self.kty, self.crv),
            ));
        }
        let invalid =
            |_| SidetreeError::new(ErrorCode::JwkEs256kInvalid, "coordinates not base64url");
        let x = decode_base64url(&self.x).map_err(invalid)?;
        let y = decode_base64url(&self.y).map_err(invalid)?;
        Secp256k1PublicKey::from_coordinates(&x, &y)
            .map_err(|e| SidetreeError::new(ErrorCode::JwkEs256kInvalid, e.to_string()))
    }

    /// Reveal value that opens the commitment made to this key.
    pub fn reveal_value(&self) -> Result<String, SidetreeError> {
        canonicalize_then_hash_then_encode(self)
    }

    /// Commitment to this key.
    pub fn commitment(&self) -> Result<String, SidetreeError> {
        canonicalize_then_double_hash_then_encode(self)
    }
}
