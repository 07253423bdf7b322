//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Input is not valid base64url
    #[error("Invalid base64url encoding: {0}")]
    InvalidEncoding(String),

    /// Multihash bytes could not be decoded
    #[error("Invalid multihash: {0}")]
    InvalidMultihash(String),

    /// Multihash uses an algorithm this node does not support
    #[error("Unsupported hash algorithm code: {0}")]
    UnsupportedHashAlgorithm(u64),
}
