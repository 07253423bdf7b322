//! JWS payloads of update, recover and deactivate operations.

use serde::{Deserialize, Serialize};

use super::jwk::PublicKeyJwk;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSignedData {
    pub update_key: PublicKeyJwk,
    pub delta_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoverSignedData {
    pub recovery_commitment: String,
    pub recovery_key: PublicKeyJwk,
    pub delta_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeactivateSignedData {
    pub did_suffix: String,
    pub recovery_key: PublicKeyJwk,
}
