//! Partitioning a batch and building its file models.
//!
//! Parent files reference children by CAS URI, so each model builder takes
//! the URIs its children were stored under.

use serde_json::Value;
use shared_types::{ErrorCode, Result, SidetreeError};
use st_01_operations::{
    CreateOperation, DeactivateOperation, Operation, RecoverOperation, UpdateOperation,
};
use st_02_file_codecs::{
    ChunkFileModel, CoreIndexFileModel, CoreProofFileModel, CreateReference, OperationReference,
    ProvisionalIndexFileModel, ProvisionalProofFileModel, SignedDataReference,
};

/// Operations of one batch, grouped by kind in queue order.
#[derive(Debug, Clone, Default)]
pub struct PartitionedOperations {
    pub creates: Vec<CreateOperation>,
    pub recovers: Vec<RecoverOperation>,
    pub deactivates: Vec<DeactivateOperation>,
    pub updates: Vec<UpdateOperation>,
}

impl PartitionedOperations {
    pub fn new(operations: Vec<Operation>) -> Self {
        let mut partitioned = Self::default();
        for operation in operations {
            match operation {
                Operation::Create(op) => partitioned.creates.push(op),
                Operation::Recover(op) => partitioned.recovers.push(op),
                Operation::Deactivate(op) => partitioned.deactivates.push(op),
                Operation::Update(op) => partitioned.updates.push(op),
            }
        }
        partitioned
    }

    pub fn len(&self) -> usize {
        self.creates.len() + self.recovers.len() + self.deactivates.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deltas in chunk order: creates, then recovers, then updates.
    ///
    /// `None` when no operation in the batch carries a delta.
    pub fn chunk_file_model(&self) -> Result<Option<ChunkFileModel>> {
        if self.creates.is_empty() && self.recovers.is_empty() && self.updates.is_empty() {
            return Ok(None);
        }

        let deltas = self
            .creates
            .iter()
            .map(|op| op.delta.as_ref())
            .chain(self.recovers.iter().map(|op| op.delta.as_ref()))
            .chain(self.updates.iter().map(|op| op.delta.as_ref()))
            .map(|delta| {
                let delta = delta.ok_or_else(|| {
                    SidetreeError::new(
                        ErrorCode::DeltaMissingOrUnknownProperty,
                        "batched operation has no delta",
                    )
                })?;
                serde_json::to_value(delta)
                    .map_err(|e| {
                        SidetreeError::new(ErrorCode::CanonicalizationFailed, e.to_string())
                    })
            })
            .collect::<Result<Vec<Value>>>()?;

        Ok(Some(ChunkFileModel { deltas }))
    }

    pub fn provisional_proof_file_model(&self) -> Option<ProvisionalProofFileModel> {
        if self.updates.is_empty() {
            return None;
        }
        let proofs = self
            .updates
            .iter()
            .map(|op| signed_data_reference(&op.signed_data_jws.to_compact()))
            .collect();
        Some(ProvisionalProofFileModel::new(proofs))
    }

    pub fn provisional_index_file_model(
        &self,
        provisional_proof_file_uri: Option<String>,
        chunk_file_uri: String,
    ) -> ProvisionalIndexFileModel {
        let updates = self
            .updates
            .iter()
            .map(|op| operation_reference(&op.did_unique_suffix, &op.reveal_value))
            .collect();
        ProvisionalIndexFileModel::new(provisional_proof_file_uri, chunk_file_uri, updates)
    }

    pub fn core_proof_file_model(&self) -> Option<CoreProofFileModel> {
        if self.recovers.is_empty() && self.deactivates.is_empty() {
            return None;
        }
        let recover = self
            .recovers
            .iter()
            .map(|op| signed_data_reference(&op.signed_data_jws.to_compact()))
            .collect();
        let deactivate = self
            .deactivates
            .iter()
            .map(|op| signed_data_reference(&op.signed_data_jws.to_compact()))
            .collect();
        Some(CoreProofFileModel::new(recover, deactivate))
    }

    pub fn core_index_file_model(
        &self,
        writer_lock_id: Option<String>,
        provisional_index_file_uri: Option<String>,
        core_proof_file_uri: Option<String>,
    ) -> CoreIndexFileModel {
        let creates = self
            .creates
            .iter()
            .map(|op| CreateReference {
                suffix_data: op.suffix_data.clone(),
            })
            .collect();
        let recovers = self
            .recovers
            .iter()
            .map(|op| operation_reference(&op.did_unique_suffix, &op.reveal_value))
            .collect();
        let deactivates = self
            .deactivates
            .iter()
            .map(|op| operation_reference(&op.did_unique_suffix, &op.reveal_value))
            .collect();
        CoreIndexFileModel::new(
            writer_lock_id,
            provisional_index_file_uri,
            core_proof_file_uri,
            creates,
            recovers,
            deactivates,
        )
    }
}

fn operation_reference(did_suffix: &str, reveal_value: &str) -> OperationReference {
    OperationReference {
        did_suffix: did_suffix.to_string(),
        reveal_value: reveal_value.to_string(),
    }
}

fn signed_data_reference(compact_jws: &str) -> SignedDataReference {
    SignedDataReference {
        signed_data: compact_jws.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ProtocolParameters;
    use st_01_operations::OperationGenerator;

    fn parse(buffer: &[u8]) -> Operation {
        Operation::parse_request(buffer, &ProtocolParameters::default()).unwrap()
    }

    #[test]
    fn test_chunk_order_is_create_recover_update() {
        let a = OperationGenerator::generate_create_operation().unwrap();
        let b = OperationGenerator::generate_create_operation().unwrap();
        let c = OperationGenerator::generate_create_operation().unwrap();
        let update =
            OperationGenerator::generate_update_operation(&a.did_unique_suffix, &a.update_key_pair)
                .unwrap();
        let recover = OperationGenerator::generate_recover_operation(
            &b.did_unique_suffix,
            &b.recovery_key_pair,
        )
        .unwrap();

        // Queue order: update, recover, create.
        let batch = PartitionedOperations::new(vec![
            parse(&update.operation_buffer),
            parse(&recover.operation_buffer),
            parse(&c.operation_buffer),
        ]);
        let chunk = batch.chunk_file_model().unwrap().unwrap();

        assert_eq!(chunk.deltas.len(), 3);
        assert_eq!(chunk.deltas[0], serde_json::to_value(&c.delta).unwrap());
        assert_eq!(chunk.deltas[1], serde_json::to_value(recover.delta.as_ref().unwrap()).unwrap());
        assert_eq!(chunk.deltas[2], serde_json::to_value(update.delta.as_ref().unwrap()).unwrap());
    }

    #[test]
    fn test_deactivate_only_batch() {
        let a = OperationGenerator::generate_create_operation().unwrap();
        let deactivate = OperationGenerator::generate_deactivate_operation(
            &a.did_unique_suffix,
            &a.recovery_key_pair,
        )
        .unwrap();
        let batch = PartitionedOperations::new(vec![parse(&deactivate.operation_buffer)]);

        assert!(batch.chunk_file_model().unwrap().is_none());
        assert!(batch.provisional_proof_file_model().is_none());

        let proof = batch.core_proof_file_model().unwrap();
        assert_eq!(proof.operations.deactivate.unwrap().len(), 1);
        assert!(proof.operations.recover.is_none());

        let core = batch.core_index_file_model(None, None, Some("proof".into()));
        let operations = core.operations.unwrap();
        assert_eq!(operations.deactivate.unwrap()[0].did_suffix, a.did_unique_suffix);
        assert!(operations.create.is_none());
    }

    #[test]
    fn test_update_batch_references() {
        let a = OperationGenerator::generate_create_operation().unwrap();
        let update =
            OperationGenerator::generate_update_operation(&a.did_unique_suffix, &a.update_key_pair)
                .unwrap();
        let batch = PartitionedOperations::new(vec![parse(&update.operation_buffer)]);

        assert_eq!(batch.len(), 1);
        assert!(batch.core_proof_file_model().is_none());
        assert_eq!(batch.provisional_proof_file_model().unwrap().operations.update.len(), 1);

        let provisional = batch.provisional_index_file_model(Some("pp".into()), "chunk".into());
        assert_eq!(provisional.operations.unwrap().update[0].did_suffix, a.did_unique_suffix);
        assert_eq!(provisional.chunks[0].chunk_file_uri, "chunk");
    }
}
