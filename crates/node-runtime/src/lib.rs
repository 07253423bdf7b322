//! # Node Runtime Library
//!
//! Configuration, version registry wiring, the batch scheduler and the
//! runtime that ties the subsystems together. The `main.rs` binary runs it
//! against in-memory adapters; deployments supply their own ports through
//! [`NodeAdapters`].
//!
//! ## Modules
//!
//! - `config` - node configuration (file + environment)
//! - `wiring` - one protocol version per schedule entry
//! - `scheduler` - periodic, non-overlapping batch writes
//! - `runtime` - start / resolve / shutdown

pub mod config;
pub mod runtime;
pub mod scheduler;
pub mod wiring;

pub use config::{BatchWriterConfig, ConfigError, NodeConfig, ProtocolVersionConfig};
pub use runtime::{in_memory_adapters, InMemoryBackends, NodeRuntime};
pub use scheduler::{BatchScheduler, SchedulerHandle};
pub use wiring::{build_registry, NodeAdapters};
