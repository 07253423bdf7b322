//! In-memory node plus helpers to anchor batches by hand, as another
//! writer on the same ledger would.

use std::sync::Arc;

use node_runtime::{in_memory_adapters, InMemoryBackends, NodeConfig, NodeRuntime};
use shared_types::adapters::ManualClock;
use shared_types::{DidState, ProtocolParameters, RecordingEventEmitter, TransactionModel};
use st_01_operations::Operation;
use st_02_file_codecs::AnchoredData;
use st_04_batch_writer::{write_anchoring_files, PartitionedOperations};

pub const WRITER: &str = "writer-a";
pub const OTHER_WRITER: &str = "writer-b";

pub struct Harness {
    pub runtime: NodeRuntime,
    pub backends: InMemoryBackends,
    pub events: Arc<RecordingEventEmitter>,
    pub clock: Arc<ManualClock>,
    pub params: Arc<ProtocolParameters>,
}

impl Harness {
    pub fn new() -> Self {
        let config = NodeConfig::for_testing();
        let params = Arc::new(config.protocol_versions[0].parameters.clone());
        let clock = Arc::new(ManualClock::new(0));
        let (adapters, backends) = in_memory_adapters(
            WRITER,
            clock.clone(),
            config.observer.unresolvable_retry_delay_base_millis,
        );
        let events = Arc::new(RecordingEventEmitter::new());
        let runtime = NodeRuntime::new(config, adapters, events.clone()).unwrap();
        Self {
            runtime,
            backends,
            events,
            clock,
            params,
        }
    }

    pub fn batch(&self, buffers: &[&[u8]]) -> PartitionedOperations {
        PartitionedOperations::new(
            buffers
                .iter()
                .map(|buffer| Operation::parse_request(buffer, &self.params).unwrap())
                .collect(),
        )
    }

    /// Anchor `batch` at `time` from another writer, claiming `paid` operations.
    pub async fn anchor(
        &self,
        time: u64,
        batch: &PartitionedOperations,
        paid: u64,
    ) -> TransactionModel {
        let uri = write_anchoring_files(self.backends.cas.as_ref(), batch, None)
            .await
            .unwrap();
        let anchor = AnchoredData::new(uri, paid).serialize();
        self.backends
            .ledger
            .add_transaction(time, &anchor, 10_000, OTHER_WRITER)
    }

    /// Anchor one operation per transaction, each at its own time.
    pub async fn anchor_each(&self, start_time: u64, buffers: &[&[u8]]) -> Vec<TransactionModel> {
        let mut transactions = Vec::with_capacity(buffers.len());
        for (offset, buffer) in buffers.iter().enumerate() {
            let batch = self.batch(&[*buffer]);
            transactions.push(self.anchor(start_time + offset as u64, &batch, 1).await);
        }
        transactions
    }

    pub async fn observe(&self) -> usize {
        self.runtime.observer().process_transactions().await.unwrap()
    }

    pub async fn resolve(&self, did_unique_suffix: &str) -> Option<DidState> {
        self.runtime.resolve(did_unique_suffix).await.unwrap()
    }
}

/// Service ids of a resolved document, in document order.
pub fn service_ids(state: &DidState) -> Vec<String> {
    state.document["services"]
        .as_array()
        .map(|services| {
            services
                .iter()
                .filter_map(|service| service["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
