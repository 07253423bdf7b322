//! # ECDSA Signatures (secp256k1)
//!
//! ES256K signatures over secp256k1 used by operation signed data.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization
//! - Public keys travel as uncompressed affine coordinates (JWK `x`/`y`)

use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use k256::{EncodedPoint, FieldBytes};
use zeroize::Zeroizing;

use crate::CryptoError;

/// secp256k1 public key held as affine coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    x: [u8; 32],
    y: [u8; 32],
}

impl Secp256k1PublicKey {
    /// Create from affine coordinates, rejecting points not on the curve.
    pub fn from_coordinates(x: &[u8], y: &[u8]) -> Result<Self, CryptoError> {
        if x.len() != 32 || y.len() != 32 {
            return Err(CryptoError::InvalidPublicKey);
        }
        let mut key = Self {
            x: [0u8; 32],
            y: [0u8; 32],
        };
        key.x.copy_from_slice(x);
        key.y.copy_from_slice(y);
        key.verifying_key()?;
        Ok(key)
    }

    /// X coordinate.
    pub fn x(&self) -> &[u8; 32] {
        &self.x
    }

    /// Y coordinate.
    pub fn y(&self) -> &[u8; 32] {
        &self.y
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&self.x),
            FieldBytes::from_slice(&self.y),
            false,
        );
        VerifyingKey::from_encoded_point(&point).map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Verify a signature (SHA-256 over `message`).
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key = self.verifying_key()?;
        let sig = Signature::from_slice(&signature.0)
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything that is not 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the public key as affine coordinates.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut key = Secp256k1PublicKey {
            x: [0u8; 32],
            y: [0u8; 32],
        };
        // Uncompressed points always carry both coordinates.
        if let (Some(x), Some(y)) = (point.x(), point.y()) {
            key.x.copy_from_slice(x);
            key.y.copy_from_slice(y);
        }
        key
    }

    /// ES256K signature over `message` (RFC 6979 nonce).
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        let sig: Signature = self.signing_key.sign(message);
        Secp256k1Signature(sig.to_bytes().into())
    }

    /// Secret scalar, wiped when the returned buffer is dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes().into())
    }
}
