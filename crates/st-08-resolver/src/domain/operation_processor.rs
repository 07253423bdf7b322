//! # Operation Processor
//!
//! Applies one anchored operation to the state of its DID.
//!
//! | Operation | Applies when | Resulting commitments |
//! |-----------|--------------|-----------------------|
//! | create | no state yet | suffix data, delta |
//! | recover | reveal opens recovery commitment, signature valid | signed data, delta |
//! | deactivate | reveal opens recovery commitment, signature valid | none (terminal) |
//! | update | reveal opens update commitment, signature valid, delta matches | delta |
//!
//! An operation that does not apply yields `Ok(None)`; the caller moves on
//! to the next candidate.

use std::sync::Arc;

use serde_json::{json, Value};
use shared_crypto::commitment_from_reveal_value;
use shared_types::{
    AnchoredOperationModel, DidState, ErrorCode, OperationProcessor, ProtocolParameters, Result,
    SidetreeError,
};
use st_01_operations::{
    CreateOperation, DeactivateOperation, Delta, DocumentComposer, Operation, RecoverOperation,
    UpdateOperation,
};
use tracing::debug;

pub struct OperationProcessorService {
    params: Arc<ProtocolParameters>,
}

impl OperationProcessorService {
    pub fn new(params: Arc<ProtocolParameters>) -> Self {
        Self { params }
    }

    fn parse(&self, anchored: &AnchoredOperationModel) -> Result<Operation> {
        let operation = Operation::parse(&anchored.operation_buffer, &self.params)?;
        if operation.operation_type() != anchored.operation_type {
            return Err(SidetreeError::new(
                ErrorCode::OperationTypeMismatch,
                format!(
                    "stored as {} but buffer holds {}",
                    anchored.operation_type,
                    operation.operation_type()
                ),
            ));
        }
        Ok(operation)
    }

    fn apply_create(
        &self,
        operation: &CreateOperation,
        anchored: &AnchoredOperationModel,
        did_state: Option<&DidState>,
    ) -> Option<DidState> {
        if did_state.is_some() {
            debug!(did_suffix = %operation.did_unique_suffix, "Create ignored, DID already exists");
            return None;
        }

        let delta = operation
            .delta
            .as_ref()
            .filter(|delta| delta_matches(delta, &operation.suffix_data.delta_hash));
        let (document, next_update_commitment_hash) = match delta {
            Some(delta) => (
                patched_or_empty(&empty_document(), delta),
                Some(delta.update_commitment.clone()),
            ),
            None => (empty_document(), None),
        };

        Some(DidState {
            document,
            next_recovery_commitment_hash: Some(operation.suffix_data.recovery_commitment.clone()),
            next_update_commitment_hash,
            last_operation_transaction_number: anchored.transaction_number,
        })
    }

    fn apply_recover(
        &self,
        operation: &RecoverOperation,
        anchored: &AnchoredOperationModel,
        did_state: &DidState,
    ) -> Option<DidState> {
        if !opens(&operation.reveal_value, did_state.next_recovery_commitment_hash.as_deref()) {
            return None;
        }
        if let Err(e) = operation.signed_data_jws.verify(&operation.signed_data.recovery_key) {
            debug!(
                did_suffix = %operation.did_unique_suffix,
                error = %e,
                "Recover signature rejected"
            );
            return None;
        }

        let delta = operation
            .delta
            .as_ref()
            .filter(|delta| delta_matches(delta, &operation.signed_data.delta_hash));
        let (document, next_update_commitment_hash) = match delta {
            Some(delta) => (
                patched_or_empty(&empty_document(), delta),
                Some(delta.update_commitment.clone()),
            ),
            None => (empty_document(), None),
        };

        Some(DidState {
            document,
            next_recovery_commitment_hash: Some(operation.signed_data.recovery_commitment.clone()),
            next_update_commitment_hash,
            last_operation_transaction_number: anchored.transaction_number,
        })
    }

    fn apply_deactivate(
        &self,
        operation: &DeactivateOperation,
        anchored: &AnchoredOperationModel,
        did_state: &DidState,
    ) -> Option<DidState> {
        if !opens(&operation.reveal_value, did_state.next_recovery_commitment_hash.as_deref()) {
            return None;
        }
        if let Err(e) = operation.signed_data_jws.verify(&operation.signed_data.recovery_key) {
            debug!(
                did_suffix = %operation.did_unique_suffix,
                error = %e,
                "Deactivate signature rejected"
            );
            return None;
        }

        Some(DidState {
            document: empty_document(),
            next_recovery_commitment_hash: None,
            next_update_commitment_hash: None,
            last_operation_transaction_number: anchored.transaction_number,
        })
    }

    fn apply_update(
        &self,
        operation: &UpdateOperation,
        anchored: &AnchoredOperationModel,
        did_state: &DidState,
    ) -> Option<DidState> {
        if !opens(&operation.reveal_value, did_state.next_update_commitment_hash.as_deref()) {
            return None;
        }
        if let Err(e) = operation.signed_data_jws.verify(&operation.signed_data.update_key) {
            debug!(
                did_suffix = %operation.did_unique_suffix,
                error = %e,
                "Update signature rejected"
            );
            return None;
        }
        // The next update commitment lives in the delta.
        let delta = operation
            .delta
            .as_ref()
            .filter(|delta| delta_matches(delta, &operation.signed_data.delta_hash))?;

        let document = match DocumentComposer::apply_patches(&did_state.document, &delta.patches) {
            Ok(document) => document,
            Err(e) => {
                debug!(
                    did_suffix = %operation.did_unique_suffix,
                    error = %e,
                    "Update patches rejected"
                );
                did_state.document.clone()
            }
        };

        Some(DidState {
            document,
            next_recovery_commitment_hash: did_state.next_recovery_commitment_hash.clone(),
            next_update_commitment_hash: Some(delta.update_commitment.clone()),
            last_operation_transaction_number: anchored.transaction_number,
        })
    }
}

impl OperationProcessor for OperationProcessorService {
    fn apply(
        &self,
        anchored: &AnchoredOperationModel,
        did_state: Option<&DidState>,
    ) -> Result<Option<DidState>> {
        let operation = match self.parse(anchored) {
            Ok(operation) => operation,
            Err(e) if e.is_invariant() => return Err(e),
            Err(e) => {
                debug!(
                    transaction_number = anchored.transaction_number,
                    operation_index = anchored.operation_index,
                    error = %e,
                    "Stored operation does not parse"
                );
                return Ok(None);
            }
        };
        if operation.did_unique_suffix() != anchored.did_unique_suffix {
            return Ok(None);
        }

        let applied = match (&operation, did_state) {
            (Operation::Create(create), state) => self.apply_create(create, anchored, state),
            (_, None) => None,
            (_, Some(state)) if state.is_deactivated() => None,
            (Operation::Recover(recover), Some(state)) => {
                self.apply_recover(recover, anchored, state)
            }
            (Operation::Deactivate(deactivate), Some(state)) => {
                self.apply_deactivate(deactivate, anchored, state)
            }
            (Operation::Update(update), Some(state)) => self.apply_update(update, anchored, state),
        };
        Ok(applied)
    }

    fn get_reveal_value(&self, anchored: &AnchoredOperationModel) -> Result<String> {
        let operation = self.parse(anchored)?;
        operation.reveal_value().map(str::to_string).ok_or_else(|| {
            SidetreeError::new(
                ErrorCode::OperationTypeMismatch,
                "create operations carry no reveal value",
            )
        })
    }
}

fn empty_document() -> Value {
    json!({})
}

fn delta_matches(delta: &Delta, expected_hash: &str) -> bool {
    delta.hash().is_ok_and(|hash| hash == expected_hash)
}

fn opens(reveal_value: &str, commitment: Option<&str>) -> bool {
    let Some(commitment) = commitment else {
        return false;
    };
    commitment_from_reveal_value(reveal_value).is_ok_and(|derived| derived == commitment)
}

fn patched_or_empty(document: &Value, delta: &Delta) -> Value {
    DocumentComposer::apply_patches(document, &delta.patches).unwrap_or_else(|e| {
        debug!(error = %e, "Patches rejected, document left empty");
        empty_document()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::OperationType;
    use st_01_operations::{GeneratedCreate, OperationGenerator, PublicKeyJwk};

    fn processor() -> OperationProcessorService {
        OperationProcessorService::new(Arc::new(ProtocolParameters::default()))
    }

    fn anchored(
        operation_type: OperationType,
        did: &str,
        buffer: Vec<u8>,
        number: u64,
    ) -> AnchoredOperationModel {
        AnchoredOperationModel {
            operation_type,
            did_unique_suffix: did.to_string(),
            operation_buffer: buffer,
            transaction_time: number,
            transaction_number: number,
            operation_index: 0,
        }
    }

    fn created() -> (GeneratedCreate, DidState) {
        let create = OperationGenerator::generate_create_operation().unwrap();
        let op = anchored(
            OperationType::Create,
            &create.did_unique_suffix,
            create.operation_buffer.clone(),
            1,
        );
        let state = processor().apply(&op, None).unwrap().unwrap();
        (create, state)
    }

    fn commitment_of(key_pair: &shared_crypto::Secp256k1KeyPair) -> String {
        PublicKeyJwk::from_public_key(&key_pair.public_key()).commitment().unwrap()
    }

    #[test]
    fn test_create_builds_initial_state() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();

        assert_eq!(state.document["publicKeys"][0]["id"], "signingKey");
        assert_eq!(state.document["services"][0]["id"], "service1");
        assert_eq!(
            state.next_recovery_commitment_hash,
            Some(commitment_of(&create.recovery_key_pair))
        );
        assert_eq!(
            state.next_update_commitment_hash,
            Some(commitment_of(&create.update_key_pair))
        );
        assert_eq!(state.last_operation_transaction_number, 1);
    }

    #[test]
    fn test_create_ignored_when_state_exists() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let again = anchored(OperationType::Create, &did, create.operation_buffer, 2);

        assert!(processor().apply(&again, Some(&state)).unwrap().is_none());
    }

    #[test]
    fn test_create_with_mismatched_delta_has_empty_document() {
        let create = OperationGenerator::generate_create_operation().unwrap();
        let did = create.did_unique_suffix.clone();
        let other = OperationGenerator::generate_create_operation().unwrap();
        let mut request: Value = serde_json::from_slice(&create.operation_buffer).unwrap();
        request["delta"] = serde_json::to_value(&other.delta).unwrap();
        let buffer = serde_json::to_vec(&request).unwrap();

        let op = anchored(OperationType::Create, &did, buffer, 1);
        let state = processor().apply(&op, None).unwrap().unwrap();

        assert_eq!(state.document, json!({}));
        assert!(state.next_update_commitment_hash.is_none());
        assert!(state.next_recovery_commitment_hash.is_some());
    }

    #[test]
    fn test_update_with_right_key() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let update =
            OperationGenerator::generate_update_operation(&did, &create.update_key_pair).unwrap();
        let op = anchored(OperationType::Update, &did, update.operation_buffer, 2);

        let next = processor().apply(&op, Some(&state)).unwrap().unwrap();
        assert_eq!(next.document["services"].as_array().unwrap().len(), 2);
        assert_eq!(
            next.next_update_commitment_hash,
            Some(commitment_of(update.next_update_key_pair.as_ref().unwrap()))
        );
        assert_eq!(next.next_recovery_commitment_hash, state.next_recovery_commitment_hash);
        assert_eq!(next.last_operation_transaction_number, 2);
    }

    #[test]
    fn test_update_with_wrong_key_does_not_apply() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let update =
            OperationGenerator::generate_update_operation(&did, &create.recovery_key_pair).unwrap();
        let op = anchored(OperationType::Update, &did, update.operation_buffer, 2);

        assert!(processor().apply(&op, Some(&state)).unwrap().is_none());
    }

    #[test]
    fn test_failed_update_patch_advances_commitment() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let update = OperationGenerator::update_operation_with_patches(
            &did,
            &create.update_key_pair,
            vec![json!({ "action": "rotate-everything" })],
        )
        .unwrap();
        let op = anchored(OperationType::Update, &did, update.operation_buffer, 2);

        let next = processor().apply(&op, Some(&state)).unwrap().unwrap();
        assert_eq!(next.document, state.document);
        assert_eq!(
            next.next_update_commitment_hash,
            Some(commitment_of(update.next_update_key_pair.as_ref().unwrap()))
        );
    }

    #[test]
    fn test_recover_replaces_document_and_commitments() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let recover =
            OperationGenerator::generate_recover_operation(&did, &create.recovery_key_pair)
                .unwrap();
        let op = anchored(OperationType::Recover, &did, recover.operation_buffer, 2);

        let next = processor().apply(&op, Some(&state)).unwrap().unwrap();
        assert_eq!(next.document["publicKeys"][0]["id"], "recoveredKey");
        assert!(next.document.get("services").is_none());
        assert_eq!(
            next.next_recovery_commitment_hash,
            Some(commitment_of(recover.next_recovery_key_pair.as_ref().unwrap()))
        );
    }

    #[test]
    fn test_failed_recover_patch_leaves_empty_document() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let recover = OperationGenerator::recover_operation_with_patches(
            &did,
            &create.recovery_key_pair,
            vec![json!({ "action": "replace" })],
        )
        .unwrap();
        let op = anchored(OperationType::Recover, &did, recover.operation_buffer, 2);

        let next = processor().apply(&op, Some(&state)).unwrap().unwrap();
        assert_eq!(next.document, json!({}));
        assert_eq!(
            next.next_recovery_commitment_hash,
            Some(commitment_of(recover.next_recovery_key_pair.as_ref().unwrap()))
        );
    }

    #[test]
    fn test_deactivate_is_terminal() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let deactivate =
            OperationGenerator::generate_deactivate_operation(&did, &create.recovery_key_pair)
                .unwrap();
        let op = anchored(OperationType::Deactivate, &did, deactivate.operation_buffer, 2);

        let deactivated = processor().apply(&op, Some(&state)).unwrap().unwrap();
        assert!(deactivated.is_deactivated());
        assert_eq!(deactivated.document, json!({}));

        let update =
            OperationGenerator::generate_update_operation(&did, &create.update_key_pair).unwrap();
        let op = anchored(OperationType::Update, &did, update.operation_buffer, 3);
        assert!(processor().apply(&op, Some(&deactivated)).unwrap().is_none());
    }

    #[test]
    fn test_type_mismatch_is_invariant_error() {
        let (create, state) = created();
        let did = create.did_unique_suffix.clone();
        let update =
            OperationGenerator::generate_update_operation(&did, &create.update_key_pair).unwrap();
        let op = anchored(OperationType::Recover, &did, update.operation_buffer, 2);

        let err = processor().apply(&op, Some(&state)).unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationTypeMismatch);
        assert!(err.is_invariant());
    }

    #[test]
    fn test_unparsable_buffer_does_not_apply() {
        let op = anchored(OperationType::Create, "did", b"not json".to_vec(), 1);
        assert!(processor().apply(&op, None).unwrap().is_none());
    }

    #[test]
    fn test_reveal_value() {
        let (create, _) = created();
        let did = create.did_unique_suffix.clone();
        let update =
            OperationGenerator::generate_update_operation(&did, &create.update_key_pair).unwrap();
        let op = anchored(OperationType::Update, &did, update.operation_buffer, 2);
        let expected = PublicKeyJwk::from_public_key(&create.update_key_pair.public_key())
            .reveal_value()
            .unwrap();
        assert_eq!(processor().get_reveal_value(&op).unwrap(), expected);

        let create_op = anchored(OperationType::Create, &did, create.operation_buffer, 1);
        assert!(processor().get_reveal_value(&create_op).is_err());
    }
}
