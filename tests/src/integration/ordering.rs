//! # Commitment Replay and Insertion Order
//!
//! Each commitment is consumed once: of several operations revealing the
//! same value, only the earliest valid one in ledger order applies. The
//! resolved state depends on ledger order alone, never on the order the
//! operations reached the store or on how often they were stored.

use std::sync::{Arc, OnceLock};

use node_runtime::{build_registry, in_memory_adapters, NodeConfig};
use proptest::prelude::*;
use serde_json::{json, Value};
use shared_types::ports::{OperationStore, SystemTimeSource};
use shared_types::{AnchoredOperationModel, DidState, NoopEventEmitter, TransactionProcessor};
use st_01_operations::{GeneratedCreate, GeneratedOperation, OperationGenerator};
use st_08_resolver::Resolver;

use super::harness::{service_ids, Harness};

fn add_service(id: &str) -> Vec<Value> {
    vec![json!({
        "action": "add-services",
        "services": [OperationGenerator::service_entry(id)],
    })]
}

/// A create, two updates revealing the create's update key, and an update
/// chained on the first of those.
struct Updates {
    create: GeneratedCreate,
    first: GeneratedOperation,
    replay: GeneratedOperation,
    chained: GeneratedOperation,
}

fn updates() -> Updates {
    let create = OperationGenerator::generate_create_operation().unwrap();
    let did = create.did_unique_suffix.clone();
    let first = OperationGenerator::update_operation_with_patches(
        &did,
        &create.update_key_pair,
        add_service("first"),
    )
    .unwrap();
    let replay = OperationGenerator::update_operation_with_patches(
        &did,
        &create.update_key_pair,
        add_service("replay"),
    )
    .unwrap();
    let next_key = first.next_update_key_pair.as_ref().unwrap();
    let chained =
        OperationGenerator::update_operation_with_patches(&did, next_key, add_service("chained"))
            .unwrap();
    Updates {
        create,
        first,
        replay,
        chained,
    }
}

#[tokio::test]
async fn test_replayed_reveal_value_ignored() {
    let h = Harness::new();
    let u = updates();
    h.anchor_each(
        10,
        &[
            &u.create.operation_buffer,
            &u.first.operation_buffer,
            &u.replay.operation_buffer,
            &u.chained.operation_buffer,
        ],
    )
    .await;
    h.observe().await;

    let state = h.resolve(&u.create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1", "first", "chained"]);
}

#[tokio::test]
async fn test_earlier_replay_wins_and_orphans_chain() {
    let h = Harness::new();
    let u = updates();
    h.anchor_each(
        10,
        &[
            &u.create.operation_buffer,
            &u.replay.operation_buffer,
            &u.first.operation_buffer,
            &u.chained.operation_buffer,
        ],
    )
    .await;
    h.observe().await;

    let state = h.resolve(&u.create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1", "replay"]);
    let replay_delta = u.replay.delta.as_ref().unwrap();
    assert_eq!(
        state.next_update_commitment_hash.as_deref(),
        Some(replay_delta.update_commitment.as_str())
    );
}

#[tokio::test]
async fn test_reprocessing_transaction_is_idempotent() {
    let h = Harness::new();
    let u = updates();
    let transactions = h
        .anchor_each(10, &[&u.create.operation_buffer, &u.first.operation_buffer])
        .await;
    h.observe().await;
    let before = h.resolve(&u.create.did_unique_suffix).await.unwrap();

    for transaction in &transactions {
        let processor = h
            .runtime
            .registry()
            .get_transaction_processor(transaction.transaction_time)
            .unwrap();
        assert!(processor.process_transaction(transaction).await);
    }

    assert_eq!(h.backends.operations.len(), 2);
    assert_eq!(h.resolve(&u.create.did_unique_suffix).await.unwrap(), before);
}

struct History {
    did: String,
    operations: Vec<AnchoredOperationModel>,
    expected: DidState,
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Anchored once, shared by every generated case.
fn history() -> &'static History {
    static HISTORY: OnceLock<History> = OnceLock::new();
    HISTORY.get_or_init(|| {
        block_on(async {
            let h = Harness::new();
            let u = updates();
            let recover = OperationGenerator::generate_recover_operation(
                &u.create.did_unique_suffix,
                &u.create.recovery_key_pair,
            )
            .unwrap();
            let after_recover = OperationGenerator::update_operation_with_patches(
                &u.create.did_unique_suffix,
                recover.next_update_key_pair.as_ref().unwrap(),
                add_service("after-recover"),
            )
            .unwrap();
            h.anchor_each(
                10,
                &[
                    &u.create.operation_buffer,
                    &u.first.operation_buffer,
                    &u.replay.operation_buffer,
                    &u.chained.operation_buffer,
                    &recover.operation_buffer,
                    &after_recover.operation_buffer,
                ],
            )
            .await;
            h.observe().await;

            let did = u.create.did_unique_suffix.clone();
            let operations = h.backends.operations.get(&did).await.unwrap();
            let expected = h.resolve(&did).await.unwrap();
            History {
                did,
                operations,
                expected,
            }
        })
    })
}

fn resolve_after_inserting(
    history: &History,
    operations: Vec<AnchoredOperationModel>,
    repeat: bool,
) -> DidState {
    block_on(async {
        let (adapters, backends) =
            in_memory_adapters("writer-a", Arc::new(SystemTimeSource), 1_000);
        let registry = build_registry(
            &NodeConfig::for_testing(),
            &adapters,
            Arc::new(NoopEventEmitter),
        );
        for operation in &operations {
            backends
                .operations
                .insert_or_replace(vec![operation.clone()])
                .await
                .unwrap();
        }
        if repeat {
            backends.operations.insert_or_replace(operations).await.unwrap();
        }
        Resolver::new(registry, backends.operations.clone())
            .resolve(&history.did)
            .await
            .unwrap()
            .unwrap()
    })
}

#[test]
fn test_history_resolves_through_recovery() {
    let history = history();
    assert_eq!(history.operations.len(), 6);
    assert_eq!(service_ids(&history.expected), vec!["after-recover"]);
    assert_eq!(history.expected.document["publicKeys"][0]["id"], "recoveredKey");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_resolution_independent_of_insertion_order(
        operations in Just(history().operations.clone()).prop_shuffle(),
        repeat in any::<bool>(),
    ) {
        let history = history();
        let state = resolve_after_inserting(history, operations, repeat);
        prop_assert_eq!(state, history.expected.clone());
    }
}
