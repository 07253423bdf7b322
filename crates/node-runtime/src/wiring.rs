//! # Version Registry Wiring
//!
//! Builds one [`ProtocolVersion`] per configured schedule entry, each with
//! its own parameters and its own component instances.
//!
//! | Component | Collaborators |
//! |-----------|---------------|
//! | Transaction processor | shared download manager, ledger, operation store |
//! | Transaction selector | transaction store |
//! | Operation processor | none |
//! | Batch writer | operation queue, ledger, CAS, confirmation store |

use std::sync::Arc;

use shared_types::ports::{CasClient, LedgerClient, OperationQueue};
use shared_types::{EventEmitter, ProtocolVersion, VersionRegistry};
use st_04_batch_writer::BatchWriterService;
use st_05_transaction_processor::{DownloadManager, TransactionProcessorService};
use st_06_throughput_limiter::TransactionSelectorService;
use st_07_observer::ObserverStores;
use st_08_resolver::OperationProcessorService;
use tracing::info;

use crate::config::NodeConfig;

/// External collaborators the node runs against.
#[derive(Clone)]
pub struct NodeAdapters {
    pub ledger: Arc<dyn LedgerClient>,
    pub cas: Arc<dyn CasClient>,
    pub operation_queue: Arc<dyn OperationQueue>,
    pub stores: ObserverStores,
}

/// Registry with every configured protocol version fully populated.
pub fn build_registry(
    config: &NodeConfig,
    adapters: &NodeAdapters,
    events: Arc<dyn EventEmitter>,
) -> Arc<VersionRegistry> {
    let download_manager = Arc::new(DownloadManager::new(
        Arc::clone(&adapters.cas),
        config.observer.max_concurrent_downloads,
    ));

    let versions = config
        .protocol_versions
        .iter()
        .map(|entry| {
            let params = Arc::new(entry.parameters.clone());
            ProtocolVersion::new(entry.starting_time, entry.version.clone(), Arc::clone(&params))
                .with_transaction_processor(Arc::new(TransactionProcessorService::new(
                    Arc::clone(&params),
                    Arc::clone(&download_manager),
                    Arc::clone(&adapters.ledger),
                    Arc::clone(&adapters.stores.operations),
                    Arc::clone(&events),
                )))
                .with_transaction_selector(Arc::new(TransactionSelectorService::new(
                    Arc::clone(&params),
                    Arc::clone(&adapters.stores.transactions),
                )))
                .with_operation_processor(Arc::new(OperationProcessorService::new(Arc::clone(
                    &params,
                ))))
                .with_batch_writer(Arc::new(BatchWriterService::new(
                    Arc::clone(&params),
                    Arc::clone(&adapters.operation_queue),
                    Arc::clone(&adapters.ledger),
                    Arc::clone(&adapters.cas),
                    Arc::clone(&adapters.stores.confirmations),
                )))
        })
        .collect();

    let registry = VersionRegistry::new(versions);
    info!(
        versions = registry.versions().len(),
        "[node] Protocol versions registered"
    );
    Arc::new(registry)
}
