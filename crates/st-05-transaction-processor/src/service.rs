//! Transaction Processor Service
//!
//! Implements the `TransactionProcessor` port for one protocol version.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use shared_types::events::codes;
use shared_types::ports::{LedgerClient, OperationStore};
use shared_types::{
    ErrorCode, EventEmitter, ProtocolParameters, Result, SidetreeError, TransactionModel,
    TransactionProcessor,
};
use st_02_file_codecs::{
    validate_cas_uri, AnchoredData, ChunkFile, CoreIndexFile, CoreProofFile, ProvisionalIndexFile,
    ProvisionalProofFile,
};
use st_03_fee_verification::{FeeCalculator, ValueTimeLockVerifier};
use tracing::{debug, error, info, warn};

use crate::domain::composer::{compose_anchored_operations, ProvisionalFiles};
use crate::download_manager::DownloadManager;

const PROOF_COUNT_MISMATCH: ErrorCode =
    ErrorCode::ProvisionalProofFileProofCountNotTheSameAsOperationCountInProvisionalIndexFile;

pub struct TransactionProcessorService {
    params: Arc<ProtocolParameters>,
    download_manager: Arc<DownloadManager>,
    ledger: Arc<dyn LedgerClient>,
    operation_store: Arc<dyn OperationStore>,
    events: Arc<dyn EventEmitter>,
    fee_calculator: FeeCalculator,
    lock_verifier: ValueTimeLockVerifier,
}

impl TransactionProcessorService {
    pub fn new(
        params: Arc<ProtocolParameters>,
        download_manager: Arc<DownloadManager>,
        ledger: Arc<dyn LedgerClient>,
        operation_store: Arc<dyn OperationStore>,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            fee_calculator: FeeCalculator::new(params.clone()),
            lock_verifier: ValueTimeLockVerifier::new(params.clone()),
            params,
            download_manager,
            ledger,
            operation_store,
            events,
        }
    }

    /// Phase 1: everything the whole batch stands or falls with.
    async fn download_and_verify_core_index_file(
        &self,
        transaction: &TransactionModel,
    ) -> Result<(u64, CoreIndexFile)> {
        let anchored = AnchoredData::deserialize(&transaction.anchor_string)?;
        let paid_operation_count = anchored.number_of_operations;

        let normalized_fee = transaction.normalized_transaction_fee.ok_or_else(|| {
            SidetreeError::new(
                ErrorCode::TransactionNormalizedFeeMissing,
                format!("transaction {} has no normalized fee", transaction.transaction_number),
            )
        })?;
        self.fee_calculator.verify_transaction_fee(
            transaction.transaction_fee_paid,
            paid_operation_count,
            normalized_fee,
        )?;

        if paid_operation_count > self.params.max_operations_per_batch {
            return Err(SidetreeError::new(
                ErrorCode::TransactionProcessorPaidOperationCountExceedsLimit,
                format!(
                    "paid operation count {paid_operation_count} exceeds {}",
                    self.params.max_operations_per_batch
                ),
            ));
        }

        validate_cas_uri(&anchored.core_index_file_uri, &self.params)?;
        let content = self
            .download_manager
            .download(
                &anchored.core_index_file_uri,
                self.params.max_core_index_file_size_in_bytes,
            )
            .await?;
        let core_index_file = CoreIndexFile::parse(&content, &self.params)?;

        let declared = core_index_file.operation_count() as u64;
        if declared > paid_operation_count {
            return Err(SidetreeError::new(
                ErrorCode::CoreIndexFileOperationCountExceededPaidLimit,
                format!("core index file lists {declared} operations, {paid_operation_count} paid"),
            ));
        }

        let lock = match core_index_file.model.writer_lock_id.as_deref() {
            Some(lock_id) => self.ledger.get_value_time_lock(lock_id).await?,
            None => None,
        };
        self.lock_verifier.verify_lock_amount(
            lock.as_ref(),
            paid_operation_count,
            transaction.transaction_time,
            &transaction.writer,
        )?;

        Ok((paid_operation_count, core_index_file))
    }

    async fn download_core_proof_file(
        &self,
        core_index_file: &CoreIndexFile,
    ) -> Result<Option<CoreProofFile>> {
        let Some(uri) = core_index_file.model.core_proof_file_uri.as_deref() else {
            return Ok(None);
        };
        let content = self
            .download_manager
            .download(uri, self.params.max_proof_file_size_in_bytes)
            .await?;
        let proof = CoreProofFile::parse(
            &content,
            &self.params,
            &core_index_file.deactivate_did_suffixes,
        )?;

        if proof.recover_proofs.len() != core_index_file.recover_did_suffixes.len()
            || proof.deactivate_proofs.len() != core_index_file.deactivate_did_suffixes.len()
        {
            return Err(SidetreeError::new(
                ErrorCode::CoreProofFileProofCountNotTheSameAsOperationCountInCoreIndexFile,
                format!(
                    "{} recover and {} deactivate proofs for {} and {} operations",
                    proof.recover_proofs.len(),
                    proof.deactivate_proofs.len(),
                    core_index_file.recover_did_suffixes.len(),
                    core_index_file.deactivate_did_suffixes.len()
                ),
            ));
        }
        Ok(Some(proof))
    }

    /// Provisional index, provisional proof and chunk file, all or nothing.
    async fn download_provisional_files(
        &self,
        core_index_file: &CoreIndexFile,
        paid_operation_count: u64,
    ) -> Result<Option<ProvisionalFiles>> {
        let Some(uri) = core_index_file.model.provisional_index_file_uri.as_deref() else {
            return Ok(None);
        };
        let content = self
            .download_manager
            .download(uri, self.params.max_provisional_index_file_size_in_bytes)
            .await?;
        let provisional_index_file = ProvisionalIndexFile::parse(&content, &self.params)?;

        let update_count = provisional_index_file.did_unique_suffixes.len();
        let max_paid_updates =
            paid_operation_count.saturating_sub(core_index_file.operation_count() as u64);
        if update_count as u64 > max_paid_updates {
            return Err(SidetreeError::new(
                ErrorCode::ProvisionalIndexFileUpdateOperationCountGreaterThanMaxPaidCount,
                format!("{update_count} updates, {max_paid_updates} left of the paid count"),
            ));
        }

        let core_did_suffixes: HashSet<String> =
            core_index_file.did_unique_suffixes().into_iter().collect();
        if let Some(duplicate) = provisional_index_file
            .did_unique_suffixes
            .iter()
            .find(|did_suffix| core_did_suffixes.contains(*did_suffix))
        {
            return Err(SidetreeError::new(
                ErrorCode::ProvisionalIndexFileDidReferenceDuplicatedWithCoreIndexFile,
                format!("DID suffix {duplicate} is referenced by both index files"),
            ));
        }

        let proof_uri = provisional_index_file.model.provisional_proof_file_uri.as_deref();
        let provisional_proof_file = match proof_uri {
            Some(uri) => {
                let content = self
                    .download_manager
                    .download(uri, self.params.max_proof_file_size_in_bytes)
                    .await?;
                let proof = ProvisionalProofFile::parse(&content, &self.params)?;
                if proof.update_proofs.len() != update_count {
                    return Err(SidetreeError::new(
                        PROOF_COUNT_MISMATCH,
                        format!("{} proofs for {update_count} updates", proof.update_proofs.len()),
                    ));
                }
                Some(proof)
            }
            None => None,
        };

        let content = self
            .download_manager
            .download(
                provisional_index_file.chunk_file_uri(),
                self.params.max_chunk_file_size_in_bytes,
            )
            .await?;
        let chunk_file = ChunkFile::parse(&content, &self.params)?;

        let expected_deltas = core_index_file.create_did_suffixes.len()
            + core_index_file.recover_did_suffixes.len()
            + update_count;
        if chunk_file.deltas.len() != expected_deltas {
            return Err(SidetreeError::new(
                ErrorCode::ChunkFileDeltaCountIncorrect,
                format!("{} deltas, expected {expected_deltas}", chunk_file.deltas.len()),
            ));
        }

        Ok(Some(ProvisionalFiles {
            provisional_index_file,
            provisional_proof_file,
            chunk_file,
        }))
    }

    /// Whether a phase 1 failure leaves the transaction done with.
    fn phase_one_failure(&self, transaction: &TransactionModel, e: &SidetreeError) -> bool {
        let transaction_number = transaction.transaction_number;
        if e.is_availability() {
            warn!(transaction_number, error = %e, "Core index file unavailable, will retry");
            return false;
        }
        if e.is_invariant() {
            error!(transaction_number, error = %e, "Unexpected state while processing transaction");
            return false;
        }

        info!(transaction_number, error = %e, "Discarding invalid transaction");
        self.events.emit(
            codes::TRANSACTION_PROCESSING_FAILED,
            Some(json!({
                "transactionNumber": transaction_number,
                "code": e.code.as_str(),
            })),
        );
        true
    }

    /// Keep the phase 2 file set, or drop it and note whether to retry.
    fn phase_two_result<T>(
        &self,
        transaction: &TransactionModel,
        stage: &str,
        result: Result<Option<T>>,
        retry_needed: &mut bool,
    ) -> Option<T> {
        let transaction_number = transaction.transaction_number;
        match result {
            Ok(files) => files,
            Err(e) if e.is_availability() => {
                warn!(transaction_number, stage, error = %e, "Files unavailable, will retry");
                *retry_needed = true;
                None
            }
            Err(e) if e.is_invariant() => {
                error!(
                    transaction_number,
                    stage,
                    error = %e,
                    "Unexpected state while processing files"
                );
                *retry_needed = true;
                None
            }
            Err(e) => {
                info!(transaction_number, stage, error = %e, "Ignoring invalid files");
                None
            }
        }
    }
}

#[async_trait]
impl TransactionProcessor for TransactionProcessorService {
    async fn process_transaction(&self, transaction: &TransactionModel) -> bool {
        let transaction_number = transaction.transaction_number;
        debug!(transaction_number, anchor = %transaction.anchor_string, "Processing transaction");

        let (paid_operation_count, core_index_file) =
            match self.download_and_verify_core_index_file(transaction).await {
                Ok(verified) => verified,
                Err(e) => return self.phase_one_failure(transaction, &e),
            };

        let mut retry_needed = false;
        let core_proof = self.download_core_proof_file(&core_index_file).await;
        let core_proof_file =
            self.phase_two_result(transaction, "core proof", core_proof, &mut retry_needed);
        let provisional = self
            .download_provisional_files(&core_index_file, paid_operation_count)
            .await;
        let provisional_files =
            self.phase_two_result(transaction, "provisional", provisional, &mut retry_needed);

        let operations = match compose_anchored_operations(
            transaction,
            &core_index_file,
            core_proof_file.as_ref(),
            provisional_files.as_ref(),
        ) {
            Ok(operations) => operations,
            Err(e) => {
                error!(transaction_number, error = %e, "Failed to compose operations");
                return false;
            }
        };

        let operation_count = operations.len();
        if let Err(e) = self.operation_store.insert_or_replace(operations).await {
            warn!(transaction_number, error = %e, "Failed to store operations, will retry");
            return false;
        }

        info!(
            transaction_number,
            operations = operation_count,
            retry_needed,
            "[st-05] Transaction processed"
        );
        !retry_needed
    }
}
