//! Batch Writer Service
//!
//! Implements the `BatchWriter` port for one protocol version.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::ports::{CasClient, ConfirmationStore, LedgerClient, OperationQueue};
use shared_types::{BatchWriter, ProtocolParameters, Result, TransactionTime};
use st_01_operations::Operation;
use st_02_file_codecs::{
    AnchoredData, ChunkFile, CoreIndexFile, CoreProofFile, ProvisionalIndexFile,
    ProvisionalProofFile,
};
use st_03_fee_verification::{FeeCalculator, ValueTimeLockVerifier};
use tracing::{debug, info, warn};

use crate::domain::batch::PartitionedOperations;

pub struct BatchWriterService {
    params: Arc<ProtocolParameters>,
    operation_queue: Arc<dyn OperationQueue>,
    ledger: Arc<dyn LedgerClient>,
    cas: Arc<dyn CasClient>,
    confirmation_store: Arc<dyn ConfirmationStore>,
    fee_calculator: FeeCalculator,
    lock_verifier: ValueTimeLockVerifier,
}

impl BatchWriterService {
    pub fn new(
        params: Arc<ProtocolParameters>,
        operation_queue: Arc<dyn OperationQueue>,
        ledger: Arc<dyn LedgerClient>,
        cas: Arc<dyn CasClient>,
        confirmation_store: Arc<dyn ConfirmationStore>,
    ) -> Self {
        Self {
            fee_calculator: FeeCalculator::new(params.clone()),
            lock_verifier: ValueTimeLockVerifier::new(params.clone()),
            params,
            operation_queue,
            ledger,
            cas,
            confirmation_store,
        }
    }

    /// Whether the last submitted batch has enough confirmations at `current_time`.
    async fn previous_batch_confirmed(&self, current_time: TransactionTime) -> Result<bool> {
        let Some(last) = self.confirmation_store.get_last_submitted().await? else {
            return Ok(true);
        };
        let Some(confirmed_at) = last.confirmed_at else {
            debug!(anchor = %last.anchor_string, "Previous batch not confirmed yet");
            return Ok(false);
        };

        let confirmations = current_time.saturating_sub(confirmed_at) + 1;
        Ok(confirmations >= self.params.min_confirmations_before_next_batch)
    }
}

async fn store(cas: &dyn CasClient, kind: &str, buffer: Vec<u8>) -> Result<String> {
    let uri = cas.write(&buffer).await?;
    debug!(file = kind, uri = %uri, size = buffer.len(), "Wrote anchoring file");
    Ok(uri)
}

/// Write the anchoring files of `batch` to CAS and return the core index
/// file URI. Children are written first so each parent can reference them.
pub async fn write_anchoring_files(
    cas: &dyn CasClient,
    batch: &PartitionedOperations,
    writer_lock_id: Option<String>,
) -> Result<String> {
    let provisional_index_file_uri = match batch.chunk_file_model()? {
        Some(chunk) => {
            let chunk_file_uri = store(cas, "chunk", ChunkFile::create_buffer(&chunk)?).await?;
            let provisional_proof_file_uri = match batch.provisional_proof_file_model() {
                Some(proof) => {
                    let buffer = ProvisionalProofFile::create_buffer(&proof)?;
                    Some(store(cas, "provisional_proof", buffer).await?)
                }
                None => None,
            };
            let provisional_index =
                batch.provisional_index_file_model(provisional_proof_file_uri, chunk_file_uri);
            Some(
                store(
                    cas,
                    "provisional_index",
                    ProvisionalIndexFile::create_buffer(&provisional_index)?,
                )
                .await?,
            )
        }
        None => None,
    };

    let core_proof_file_uri = match batch.core_proof_file_model() {
        Some(proof) => Some(store(cas, "core_proof", CoreProofFile::create_buffer(&proof)?).await?),
        None => None,
    };

    let core_index = batch.core_index_file_model(
        writer_lock_id,
        provisional_index_file_uri,
        core_proof_file_uri,
    );
    store(cas, "core_index", CoreIndexFile::create_buffer(&core_index)?).await
}

#[async_trait]
impl BatchWriter for BatchWriterService {
    async fn write(&self) -> Result<usize> {
        let ledger_time = self.ledger.get_latest_time().await?;
        let normalized_fee = self.ledger.get_fee(ledger_time.time).await?;
        let writer_lock = self.ledger.get_writer_value_time_lock().await?;

        let lock_quota = self
            .lock_verifier
            .calculate_max_number_of_operations_allowed(writer_lock.as_ref());
        let operations_allowed = self.params.max_operations_per_batch.min(lock_quota);

        let queued = self
            .operation_queue
            .peek(usize::try_from(operations_allowed).unwrap_or(usize::MAX))
            .await?;
        if queued.is_empty() {
            debug!("[st-04] No queued operations");
            return Ok(0);
        }

        if !self.previous_batch_confirmed(ledger_time.time).await? {
            info!(
                time = ledger_time.time,
                "[st-04] Previous batch lacks {} confirmations, skipping cycle",
                self.params.min_confirmations_before_next_batch
            );
            return Ok(0);
        }

        let operations: Vec<Operation> = queued
            .iter()
            .filter_map(|queued| {
                match Operation::parse_request(&queued.operation_buffer, &self.params) {
                    Ok(operation) => Some(operation),
                    Err(e) => {
                        warn!(
                            did_suffix = %queued.did_unique_suffix,
                            error = %e,
                            "Dropping invalid queued operation"
                        );
                        None
                    }
                }
            })
            .collect();
        let batch = PartitionedOperations::new(operations);

        if batch.is_empty() {
            self.operation_queue.dequeue(queued.len()).await?;
            return Ok(0);
        }

        let writer_lock_id = writer_lock.map(|lock| lock.identifier);
        let core_index_file_uri =
            write_anchoring_files(self.cas.as_ref(), &batch, writer_lock_id).await?;

        let operation_count = batch.len();
        let anchor_string = AnchoredData::new(
            core_index_file_uri,
            operation_count as u64,
        )
        .serialize();
        let fee = self
            .fee_calculator
            .compute_minimum_transaction_fee(normalized_fee, operation_count as u64)?;

        self.ledger.write(&anchor_string, fee).await?;
        self.confirmation_store
            .submit(&anchor_string, ledger_time.time)
            .await?;
        self.operation_queue.dequeue(queued.len()).await?;

        info!(
            anchor = %anchor_string,
            operations = operation_count,
            fee,
            "[st-04] Batch anchored"
        );
        Ok(operation_count)
    }
}
