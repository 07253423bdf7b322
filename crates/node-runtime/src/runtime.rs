//! # Node Runtime
//!
//! Owns the observer, the batch scheduler and the resolver of one node.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──→ start ──→ (observer timer + retry timer + batch timer) ──→ shutdown
//!                         │
//!            resolve / submit_operation at any time
//! ```

use std::sync::Arc;

use shared_types::adapters::{
    InMemoryBlockMetadataStore, InMemoryCas, InMemoryConfirmationStore, InMemoryOperationQueue,
    InMemoryOperationStore, InMemoryTransactionStore, InMemoryUnresolvableTransactionStore,
    MockLedger,
};
use shared_types::ports::{LedgerClient, OperationQueue, TimeSource};
use shared_types::{DidState, EventEmitter, Result, VersionRegistry};
use st_01_operations::Operation;
use st_07_observer::{Observer, ObserverHandle, ObserverStores};
use st_08_resolver::Resolver;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{ConfigError, NodeConfig};
use crate::scheduler::{BatchScheduler, SchedulerHandle};
use crate::wiring::{build_registry, NodeAdapters};

/// Handles of the running timers.
struct Running {
    observer: ObserverHandle,
    scheduler: SchedulerHandle,
}

/// The main node runtime orchestrating all subsystems.
pub struct NodeRuntime {
    adapters: NodeAdapters,
    registry: Arc<VersionRegistry>,
    observer: Arc<Observer>,
    scheduler: Arc<BatchScheduler>,
    resolver: Resolver,
    running: Mutex<Option<Running>>,
}

impl NodeRuntime {
    /// Create a new node runtime; nothing runs until [`NodeRuntime::start`].
    pub fn new(
        config: NodeConfig,
        adapters: NodeAdapters,
        events: Arc<dyn EventEmitter>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let registry = build_registry(&config, &adapters, Arc::clone(&events));
        let observer = Arc::new(Observer::new(
            config.observer.clone(),
            Arc::clone(&registry),
            Arc::clone(&adapters.ledger),
            adapters.stores.clone(),
            Arc::clone(&events),
        ));
        let scheduler = Arc::new(BatchScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&adapters.ledger),
            events,
            config.batch_writer.interval(),
        ));
        let resolver = Resolver::new(
            Arc::clone(&registry),
            Arc::clone(&adapters.stores.operations),
        );

        Ok(Self {
            adapters,
            registry,
            observer,
            scheduler,
            resolver,
            running: Mutex::new(None),
        })
    }

    /// Start the observer and the batch scheduler. Starting twice is a no-op.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("Node runtime already started");
            return;
        }
        *running = Some(Running {
            observer: self.observer.start(),
            scheduler: self.scheduler.start(),
        });
        info!("[node] Sidetree node running");
    }

    /// Stop both timers. In-flight transactions are drained first.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.scheduler.stop().await;
        running.observer.stop().await;
        info!("Shutdown complete");
    }

    /// Current state of a DID.
    pub async fn resolve(&self, did_unique_suffix: &str) -> Result<Option<DidState>> {
        self.resolver.resolve(did_unique_suffix).await
    }

    /// Validate an operation request and queue it for the next batch.
    /// Returns the DID suffix it targets.
    pub async fn submit_operation(&self, operation_buffer: Vec<u8>) -> Result<String> {
        let now = self.adapters.ledger.get_latest_time().await?;
        let params = self.registry.get_parameters(now.time)?;
        let operation = Operation::parse_request(&operation_buffer, &params)?;
        let did_unique_suffix = operation.did_unique_suffix().to_string();
        self.adapters
            .operation_queue
            .enqueue(&did_unique_suffix, operation_buffer)
            .await?;
        info!(
            did_suffix = %did_unique_suffix,
            operation_type = %operation.operation_type(),
            "Operation queued"
        );
        Ok(did_unique_suffix)
    }

    pub fn observer(&self) -> &Arc<Observer> {
        &self.observer
    }

    pub fn scheduler(&self) -> &Arc<BatchScheduler> {
        &self.scheduler
    }

    pub fn registry(&self) -> &Arc<VersionRegistry> {
        &self.registry
    }
}

/// Concrete in-memory backends behind [`NodeAdapters`], for inspection.
#[derive(Clone)]
pub struct InMemoryBackends {
    pub ledger: Arc<MockLedger>,
    pub cas: Arc<InMemoryCas>,
    pub operation_queue: Arc<InMemoryOperationQueue>,
    pub transactions: Arc<InMemoryTransactionStore>,
    pub operations: Arc<InMemoryOperationStore>,
    pub block_metadata: Arc<InMemoryBlockMetadataStore>,
    pub unresolvable_transactions: Arc<InMemoryUnresolvableTransactionStore>,
    pub confirmations: Arc<InMemoryConfirmationStore>,
}

/// Every port backed by its in-memory adapter.
pub fn in_memory_adapters(
    writer: &str,
    clock: Arc<dyn TimeSource>,
    retry_delay_base_millis: u64,
) -> (NodeAdapters, InMemoryBackends) {
    let backends = InMemoryBackends {
        ledger: Arc::new(MockLedger::new(writer)),
        cas: Arc::new(InMemoryCas::new()),
        operation_queue: Arc::new(InMemoryOperationQueue::new()),
        transactions: Arc::new(InMemoryTransactionStore::new()),
        operations: Arc::new(InMemoryOperationStore::new()),
        block_metadata: Arc::new(InMemoryBlockMetadataStore::new()),
        unresolvable_transactions: Arc::new(InMemoryUnresolvableTransactionStore::new(
            clock,
            retry_delay_base_millis,
        )),
        confirmations: Arc::new(InMemoryConfirmationStore::new()),
    };
    let adapters = NodeAdapters {
        ledger: backends.ledger.clone(),
        cas: backends.cas.clone(),
        operation_queue: backends.operation_queue.clone(),
        stores: ObserverStores {
            transactions: backends.transactions.clone(),
            operations: backends.operations.clone(),
            block_metadata: backends.block_metadata.clone(),
            unresolvable_transactions: backends.unresolvable_transactions.clone(),
            confirmations: backends.confirmations.clone(),
        },
    };
    (adapters, backends)
}
