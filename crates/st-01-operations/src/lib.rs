//! # Operations Subsystem (ST-01)
//!
//! The operation model every other subsystem shares.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): operation sum type, signed data (compact
//!   JWS over ES256K), JWK public keys, deltas, suffix data and the document
//!   composer. Pure, no I/O.
//! - **Generator** (`generator.rs`): signed operation requests with fresh
//!   keys, for tests and development.
//!
//! ## Commitment Scheme
//!
//! Every create/recover/update publishes the double hash of the next key;
//! the operation that follows must reveal the single hash and be signed by
//! that key.

pub mod domain;
pub mod generator;

pub use domain::delta::{validate_encoded_multihash, Delta, SuffixData};
pub use domain::document::DocumentComposer;
pub use domain::jwk::PublicKeyJwk;
pub use domain::jws::Jws;
pub use domain::operation::{
    CreateOperation, DeactivateOperation, Operation, RecoverOperation, UpdateOperation,
};
pub use domain::signed_data::{DeactivateSignedData, RecoverSignedData, UpdateSignedData};
pub use generator::{GeneratedCreate, GeneratedOperation, OperationGenerator};
