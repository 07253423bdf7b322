//! Operation application rules.

pub mod operation_processor;
