//! Rebuilding operation buffers from validated anchoring files.

use serde_json::{json, Map, Value};
use shared_types::{
    AnchoredOperationModel, ErrorCode, OperationType, Result, SidetreeError, TransactionModel,
};
use st_02_file_codecs::{
    ChunkFileModel, CoreIndexFile, CoreProofFile, OperationReference, ProvisionalIndexFile,
    ProvisionalProofFile,
};

/// The provisional chain of a transaction; only present when every file in
/// it downloaded and validated.
#[derive(Debug, Clone)]
pub struct ProvisionalFiles {
    pub provisional_index_file: ProvisionalIndexFile,
    pub provisional_proof_file: Option<ProvisionalProofFile>,
    pub chunk_file: ChunkFileModel,
}

/// Compose the anchored operations of one transaction.
///
/// Recover and deactivate operations need `core_proof_file`; updates need
/// the provisional chain including its proof file. Deltas come from the
/// chunk file when available.
pub fn compose_anchored_operations(
    transaction: &TransactionModel,
    core_index_file: &CoreIndexFile,
    core_proof_file: Option<&CoreProofFile>,
    provisional_files: Option<&ProvisionalFiles>,
) -> Result<Vec<AnchoredOperationModel>> {
    let creates = core_index_file.creates();
    let recovers = core_index_file.recovers();
    let deactivates = core_index_file.deactivates();

    // Chunk layout: creates, recovers, updates.
    let deltas = provisional_files.map(|files| files.chunk_file.deltas.as_slice());
    let delta_at = |position: usize| deltas.and_then(|deltas| deltas.get(position)).cloned();

    let recover_base = creates.len();
    let deactivate_base = recover_base + recovers.len();
    let update_base = deactivate_base + deactivates.len();

    let mut operations = Vec::new();

    for (i, (create, did_suffix)) in creates
        .iter()
        .zip(&core_index_file.create_did_suffixes)
        .enumerate()
    {
        let suffix_data = serde_json::to_value(&create.suffix_data)
            .map_err(|e| SidetreeError::new(ErrorCode::CanonicalizationFailed, e.to_string()))?;
        let mut buffer = Map::new();
        buffer.insert("type".into(), json!(OperationType::Create.as_str()));
        buffer.insert("suffixData".into(), suffix_data);
        if let Some(delta) = delta_at(i) {
            buffer.insert("delta".into(), delta);
        }
        operations.push(anchored(transaction, OperationType::Create, did_suffix, buffer, i)?);
    }

    if let Some(proof) = core_proof_file {
        let recover_entries = recovers.iter().zip(proof.recover_signed_data());
        for (i, (reference, signed_data)) in recover_entries.enumerate() {
            let mut buffer = revealing_buffer(OperationType::Recover, reference, signed_data);
            if let Some(delta) = delta_at(recover_base + i) {
                buffer.insert("delta".into(), delta);
            }
            operations.push(anchored(
                transaction,
                OperationType::Recover,
                &reference.did_suffix,
                buffer,
                recover_base + i,
            )?);
        }

        let deactivate_entries = deactivates.iter().zip(proof.deactivate_signed_data());
        for (i, (reference, signed_data)) in deactivate_entries.enumerate() {
            let buffer = revealing_buffer(OperationType::Deactivate, reference, signed_data);
            operations.push(anchored(
                transaction,
                OperationType::Deactivate,
                &reference.did_suffix,
                buffer,
                deactivate_base + i,
            )?);
        }
    }

    if let Some(files) = provisional_files {
        let update_proofs = files
            .provisional_proof_file
            .as_ref()
            .map(|proof| proof.update_signed_data())
            .unwrap_or_default();
        let updates = files.provisional_index_file.updates();
        for (i, (reference, signed_data)) in updates.iter().zip(update_proofs).enumerate() {
            let mut buffer = revealing_buffer(OperationType::Update, reference, signed_data);
            if let Some(delta) = delta_at(recover_base + recovers.len() + i) {
                buffer.insert("delta".into(), delta);
            }
            operations.push(anchored(
                transaction,
                OperationType::Update,
                &reference.did_suffix,
                buffer,
                update_base + i,
            )?);
        }
    }

    Ok(operations)
}

fn revealing_buffer(
    operation_type: OperationType,
    reference: &OperationReference,
    signed_data: String,
) -> Map<String, Value> {
    let mut buffer = Map::new();
    buffer.insert("type".into(), json!(operation_type.as_str()));
    buffer.insert("didSuffix".into(), json!(reference.did_suffix));
    buffer.insert("revealValue".into(), json!(reference.reveal_value));
    buffer.insert("signedData".into(), json!(signed_data));
    buffer
}

fn anchored(
    transaction: &TransactionModel,
    operation_type: OperationType,
    did_unique_suffix: &str,
    buffer: Map<String, Value>,
    position: usize,
) -> Result<AnchoredOperationModel> {
    let operation_buffer = serde_json::to_vec(&Value::Object(buffer))
        .map_err(|e| SidetreeError::new(ErrorCode::CanonicalizationFailed, e.to_string()))?;
    let operation_index = u32::try_from(position).map_err(|_| {
        SidetreeError::new(ErrorCode::CanonicalizationFailed, "operation index out of range")
    })?;
    Ok(AnchoredOperationModel {
        operation_type,
        did_unique_suffix: did_unique_suffix.to_string(),
        operation_buffer,
        transaction_time: transaction.transaction_time,
        transaction_number: transaction.transaction_number,
        operation_index,
    })
}
