//! # Sidetree Node
//!
//! Development entry point: runs one node against in-memory ledger, CAS and
//! stores until Ctrl+C.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `ST_CONFIG_FILE`, environment)
//! 2. Initialize logging
//! 3. Wire protocol versions and adapters
//! 4. Start the observer and the batch scheduler

use std::sync::Arc;

use anyhow::{Context, Result};
use node_runtime::{in_memory_adapters, NodeConfig, NodeRuntime};
use shared_types::ports::SystemTimeSource;
use st_telemetry::{init_telemetry, MetricsEventEmitter, TracingEventEmitter};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Sidetree Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let events = Arc::new(
        MetricsEventEmitter::new(Arc::new(TracingEventEmitter::new()))
            .context("Failed to register event metrics")?,
    );
    let (adapters, _backends) = in_memory_adapters(
        &config.telemetry.service_name,
        Arc::new(SystemTimeSource),
        config.observer.unresolvable_retry_delay_base_millis,
    );

    let runtime = NodeRuntime::new(config, adapters, events.clone())
        .context("Failed to create node runtime")?;
    runtime.start().await;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    info!(metrics = %events.encode().unwrap_or_default(), "Final event counters");
    Ok(())
}
