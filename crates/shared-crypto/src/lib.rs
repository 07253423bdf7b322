//! # Shared Crypto - Protocol Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 multihash | Commitments, reveal values, DID suffixes, CAS URIs |
//! | `encoding` | base64url (no padding) | Wire encoding of hashes, JWS segments, JWK coordinates |
//! | `ecdsa` | secp256k1 (ES256K) | Signed data of update/recover/deactivate operations |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, low-S normalization
//! - **Multihash**: only algorithm code 18 (sha2-256) is accepted on decode

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod encoding;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use encoding::{decode_base64url, encode_base64url, is_base64url_string};
pub use errors::CryptoError;
pub use hashing::{
    commitment_from_reveal_value, double_hash_then_encode, hash_then_encode, sha256,
    verify_double_hash, verify_encoded_multihash_for_content, Multihash, SHA2_256_CODE,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
