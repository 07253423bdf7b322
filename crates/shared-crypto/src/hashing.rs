//! # SHA-256 Multihash
//!
//! Self-describing hashes: `varint(code) || varint(length) || digest`.
//!
//! Commitments and reveal values are both derived from a public key:
//!
//! ```text
//! reveal value = multihash(sha256(canonical(key)))
//! commitment   = multihash(sha256(sha256(canonical(key))))
//! ```
//!
//! so a commitment can be checked from a reveal value alone.

use sha2::{Digest, Sha256};

use crate::encoding::{decode_base64url, encode_base64url};
use crate::CryptoError;

/// Multihash code of sha2-256.
pub const SHA2_256_CODE: u64 = 18;

/// SHA-256 digest length in bytes.
const SHA2_256_LENGTH: usize = 32;

/// SHA-256 of the given bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Decoded multihash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Multihash {
    /// Algorithm code.
    pub code: u64,
    /// Raw digest.
    pub digest: Vec<u8>,
}

impl Multihash {
    /// Hash content with sha2-256 and wrap it as a multihash.
    pub fn sha256(content: &[u8]) -> Self {
        Self {
            code: SHA2_256_CODE,
            digest: sha256(content).to_vec(),
        }
    }

    /// Serialize into multihash bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.digest.len() + 4);
        write_varint(self.code, &mut bytes);
        write_varint(self.digest.len() as u64, &mut bytes);
        bytes.extend_from_slice(&self.digest);
        bytes
    }

    /// Parse multihash bytes. Only sha2-256 is accepted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let (code, consumed) = read_varint(bytes)?;
        let (length, consumed_len) = read_varint(&bytes[consumed..])?;
        let digest = &bytes[consumed + consumed_len..];

        if code != SHA2_256_CODE {
            return Err(CryptoError::UnsupportedHashAlgorithm(code));
        }
        if length as usize != SHA2_256_LENGTH || digest.len() != SHA2_256_LENGTH {
            return Err(CryptoError::InvalidMultihash(format!(
                "declared length {}, actual digest length {}",
                length,
                digest.len()
            )));
        }

        Ok(Self {
            code,
            digest: digest.to_vec(),
        })
    }

    /// base64url encoding of the multihash bytes.
    pub fn encode(&self) -> String {
        encode_base64url(self.to_bytes())
    }

    /// Decode a base64url-encoded multihash.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&decode_base64url(encoded)?)
    }
}

/// `encode(multihash(sha256(content)))`
pub fn hash_then_encode(content: &[u8]) -> String {
    Multihash::sha256(content).encode()
}

/// `encode(multihash(sha256(sha256(content))))`
pub fn double_hash_then_encode(content: &[u8]) -> String {
    Multihash::sha256(&sha256(content)).encode()
}

/// Check that `encoded` is the encoded multihash of `content`.
pub fn verify_encoded_multihash_for_content(content: &[u8], encoded: &str) -> bool {
    hash_then_encode(content) == encoded
}

/// Check that `encoded_commitment` is the double hash of `content`.
pub fn verify_double_hash(content: &[u8], encoded_commitment: &str) -> bool {
    double_hash_then_encode(content) == encoded_commitment
}

/// Derive the commitment a reveal value opens.
pub fn commitment_from_reveal_value(reveal_value: &str) -> Result<String, CryptoError> {
    let multihash = Multihash::decode(reveal_value)?;
    Ok(Multihash::sha256(&multihash.digest).encode())
}

fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(bytes: &[u8]) -> Result<(u64, usize), CryptoError> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate().take(9) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CryptoError::InvalidMultihash("truncated varint".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multihash_prefix() {
        let bytes = Multihash::sha256(b"abc").to_bytes();
        assert_eq!(bytes[0], 0x12);
        assert_eq!(bytes[1], 0x20);
        assert_eq!(bytes.len(), 34);
    }

    #[test]
    fn test_encoded_form_starts_with_known_prefix() {
        // 0x12 0x20 always encodes to "EiA" / "EiB" / "EiC" / "EiD"
        assert!(hash_then_encode(b"anything").starts_with("Ei"));
    }

    #[test]
    fn test_decode_roundtrip() {
        let encoded = hash_then_encode(b"sidetree");
        let decoded = Multihash::decode(&encoded).unwrap();
        assert_eq!(decoded.code, SHA2_256_CODE);
        assert_eq!(decoded.digest, sha256(b"sidetree").to_vec());
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let mut bytes = Multihash::sha256(b"x").to_bytes();
        bytes[0] = 0x13;
        assert_eq!(
            Multihash::from_bytes(&bytes),
            Err(CryptoError::UnsupportedHashAlgorithm(0x13))
        );
    }

    #[test]
    fn test_truncated_digest_rejected() {
        let bytes = Multihash::sha256(b"x").to_bytes();
        assert!(Multihash::from_bytes(&bytes[..20]).is_err());
        assert!(Multihash::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_commitment_from_reveal_value_matches_double_hash() {
        let key = br#"{"crv":"secp256k1","kty":"EC"}"#;
        let reveal = hash_then_encode(key);
        let commitment = double_hash_then_encode(key);

        assert_eq!(commitment_from_reveal_value(&reveal).unwrap(), commitment);
        assert!(verify_double_hash(key, &commitment));
        assert!(!verify_double_hash(key, &reveal));
    }

    #[test]
    fn test_verify_content() {
        let encoded = hash_then_encode(b"content");
        assert!(verify_encoded_multihash_for_content(b"content", &encoded));
        assert!(!verify_encoded_multihash_for_content(b"other", &encoded));
    }
}
