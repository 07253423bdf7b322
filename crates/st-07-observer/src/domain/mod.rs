//! Domain layer of the observer.

pub mod processing;
