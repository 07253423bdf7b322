//! Resolver Service
//!
//! Loads the operations of one DID and chains them through the operation
//! processor of the protocol version each was anchored under.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use shared_crypto::commitment_from_reveal_value;
use shared_types::ports::OperationStore;
use shared_types::{AnchoredOperationModel, DidState, OperationType, Result, VersionRegistry};
use tracing::{debug, error};

pub struct Resolver {
    registry: Arc<VersionRegistry>,
    operation_store: Arc<dyn OperationStore>,
}

impl Resolver {
    pub fn new(registry: Arc<VersionRegistry>, operation_store: Arc<dyn OperationStore>) -> Self {
        Self {
            registry,
            operation_store,
        }
    }

    /// Current state of the DID, `None` when no valid create exists.
    pub async fn resolve(&self, did_unique_suffix: &str) -> Result<Option<DidState>> {
        let mut operations = self.operation_store.get(did_unique_suffix).await?;
        operations.sort_by_key(AnchoredOperationModel::ordering_key);

        let mut creates = Vec::new();
        let mut recoveries = Vec::new();
        let mut updates = Vec::new();
        for operation in operations {
            match operation.operation_type {
                OperationType::Create => creates.push(operation),
                OperationType::Recover | OperationType::Deactivate => recoveries.push(operation),
                OperationType::Update => updates.push(operation),
            }
        }

        let Some(mut state) = creates
            .iter()
            .find_map(|create| self.apply(create, None))
        else {
            debug!(did_suffix = %did_unique_suffix, "No valid create operation");
            return Ok(None);
        };

        let mut by_commitment = self.group_by_commitment(recoveries);
        state = self.apply_chain(state, &mut by_commitment, |state| {
            state.next_recovery_commitment_hash.clone()
        });
        if state.is_deactivated() {
            return Ok(Some(state));
        }

        let mut by_commitment = self.group_by_commitment(updates);
        state = self.apply_chain(state, &mut by_commitment, |state| {
            state.next_update_commitment_hash.clone()
        });

        debug!(
            did_suffix = %did_unique_suffix,
            last_operation = state.last_operation_transaction_number,
            "DID resolved"
        );
        Ok(Some(state))
    }

    /// Follow commitments from `state` until no candidate opens the next one.
    ///
    /// Each commitment is removed once looked up, so it is never consumed
    /// twice even if a later operation commits to it again.
    fn apply_chain<F>(
        &self,
        mut state: DidState,
        by_commitment: &mut HashMap<String, VecDeque<AnchoredOperationModel>>,
        next_commitment: F,
    ) -> DidState
    where
        F: Fn(&DidState) -> Option<String>,
    {
        while let Some(commitment) = next_commitment(&state) {
            let Some(candidates) = by_commitment.remove(&commitment) else {
                break;
            };
            match candidates
                .iter()
                .find_map(|candidate| self.apply(candidate, Some(&state)))
            {
                Some(next) => state = next,
                None => break,
            }
            if state.is_deactivated() {
                break;
            }
        }
        state
    }

    /// Candidates keyed by the commitment their reveal value opens, each
    /// list in ledger order.
    fn group_by_commitment(
        &self,
        operations: Vec<AnchoredOperationModel>,
    ) -> HashMap<String, VecDeque<AnchoredOperationModel>> {
        let mut grouped: HashMap<String, VecDeque<AnchoredOperationModel>> = HashMap::new();
        for operation in operations {
            let reveal_value = match self
                .registry
                .get_operation_processor(operation.transaction_time)
                .and_then(|processor| processor.get_reveal_value(&operation))
            {
                Ok(reveal_value) => reveal_value,
                Err(e) => {
                    self.log_excluded(&operation, &e);
                    continue;
                }
            };
            let Ok(commitment) = commitment_from_reveal_value(&reveal_value) else {
                continue;
            };
            grouped.entry(commitment).or_default().push_back(operation);
        }
        grouped
    }

    fn apply(
        &self,
        operation: &AnchoredOperationModel,
        state: Option<&DidState>,
    ) -> Option<DidState> {
        let result = self
            .registry
            .get_operation_processor(operation.transaction_time)
            .and_then(|processor| processor.apply(operation, state));
        match result {
            Ok(next) => next,
            Err(e) => {
                self.log_excluded(operation, &e);
                None
            }
        }
    }

    fn log_excluded(&self, operation: &AnchoredOperationModel, e: &shared_types::SidetreeError) {
        if e.is_invariant() {
            error!(
                did_suffix = %operation.did_unique_suffix,
                transaction_number = operation.transaction_number,
                operation_index = operation.operation_index,
                error = %e,
                "[st-08] Operation excluded from resolution"
            );
        } else {
            debug!(
                did_suffix = %operation.did_unique_suffix,
                transaction_number = operation.transaction_number,
                error = %e,
                "Operation excluded from resolution"
            );
        }
    }
}
