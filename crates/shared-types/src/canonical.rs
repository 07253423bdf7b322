//! Canonical JSON.
//!
//! Objects are rendered with lexicographically sorted keys and no whitespace.
//! `serde_json::Value` keeps keys in a sorted map as long as the
//! `preserve_order` feature stays disabled workspace-wide.

use serde::Serialize;
use shared_crypto::{double_hash_then_encode, hash_then_encode};

use crate::errors::{ErrorCode, SidetreeError};

/// Canonical JSON bytes of any serializable value.
pub fn canonicalize_as_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SidetreeError> {
    let value = serde_json::to_value(value)
        .map_err(|e| SidetreeError::new(ErrorCode::CanonicalizationFailed, e.to_string()))?;
    serde_json::to_vec(&value)
        .map_err(|e| SidetreeError::new(ErrorCode::CanonicalizationFailed, e.to_string()))
}

/// `encode(multihash(sha256(canonical(value))))`
pub fn canonicalize_then_hash_then_encode<T: Serialize + ?Sized>(
    value: &T,
) -> Result<String, SidetreeError> {
    Ok(hash_then_encode(&canonicalize_as_bytes(value)?))
}

/// `encode(multihash(sha256(sha256(canonical(value)))))`
pub fn canonicalize_then_double_hash_then_encode<T: Serialize + ?Sized>(
    value: &T,
) -> Result<String, SidetreeError> {
    Ok(double_hash_then_encode(&canonicalize_as_bytes(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u32,
        alpha: &'static str,
    }

    #[test]
    fn test_keys_sorted_without_whitespace() {
        let bytes = canonicalize_as_bytes(&json!({"b": 1, "a": {"d": [1, 2], "c": null}})).unwrap();
        assert_eq!(bytes, br#"{"a":{"c":null,"d":[1,2]},"b":1}"#.to_vec());
    }

    #[test]
    fn test_struct_field_order_ignored() {
        let bytes = canonicalize_as_bytes(&Unordered { zeta: 1, alpha: "x" }).unwrap();
        assert_eq!(bytes, br#"{"alpha":"x","zeta":1}"#.to_vec());
    }

    #[test]
    fn test_hash_independent_of_key_order() {
        let a = canonicalize_then_hash_then_encode(&json!({"x": 1, "y": 2})).unwrap();
        let b = canonicalize_then_hash_then_encode(&json!({"y": 2, "x": 1})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, canonicalize_then_double_hash_then_encode(&json!({"x": 1, "y": 2})).unwrap());
    }
}
