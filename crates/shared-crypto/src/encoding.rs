//! # Base64url Encoding
//!
//! Every binary value on the wire (hashes, JWS segments, JWK coordinates)
//! is base64url without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::CryptoError;

/// Encode bytes as base64url without padding.
pub fn encode_base64url(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode a base64url string (no padding).
pub fn decode_base64url(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}

/// Check whether a string only contains base64url alphabet characters.
pub fn is_base64url_string(input: &str) -> bool {
    input
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
