//! Operation domain model.

pub mod delta;
pub mod document;
pub mod jwk;
pub mod jws;
pub mod operation;
pub mod signed_data;
