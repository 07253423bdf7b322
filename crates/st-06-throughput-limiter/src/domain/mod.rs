//! Domain layer of the throughput limiter.

pub mod selector;
