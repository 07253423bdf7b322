//! Ledger forks seen through the resolver.

use serde_json::json;
use shared_types::events::codes;
use st_01_operations::OperationGenerator;

use super::harness::{service_ids, Harness};

#[tokio::test]
async fn test_forked_update_disappears_then_replacement_applies() {
    let h = Harness::new();
    let create = OperationGenerator::generate_create_operation().unwrap();
    let update = OperationGenerator::generate_update_operation(
        &create.did_unique_suffix,
        &create.update_key_pair,
    )
    .unwrap();
    h.anchor_each(10, &[&create.operation_buffer]).await;
    h.anchor_each(12, &[&update.operation_buffer]).await;
    h.observe().await;
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1", "service2"]);

    h.backends.ledger.reorganize(12);
    h.observe().await;

    assert_eq!(h.events.count(codes::OBSERVER_BLOCK_REORGANIZATION), 1);
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1"]);
    assert_eq!(h.backends.transactions.all().len(), 1);

    // The reveal value of the forked update is usable again.
    let replacement = OperationGenerator::update_operation_with_patches(
        &create.did_unique_suffix,
        &create.update_key_pair,
        vec![json!({
            "action": "add-services",
            "services": [OperationGenerator::service_entry("service3")],
        })],
    )
    .unwrap();
    let transactions = h.anchor_each(13, &[&replacement.operation_buffer]).await;
    h.observe().await;

    let state = h.resolve(&create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1", "service3"]);
    assert_eq!(
        state.last_operation_transaction_number,
        transactions[0].transaction_number
    );
}

#[tokio::test]
async fn test_fork_below_every_stored_transaction_resets_stores() {
    let h = Harness::new();
    let first = OperationGenerator::generate_create_operation().unwrap();
    let second = OperationGenerator::generate_create_operation().unwrap();
    h.anchor_each(10, &[&first.operation_buffer, &second.operation_buffer])
        .await;
    h.observe().await;
    assert_eq!(h.backends.operations.len(), 2);

    h.backends.ledger.reorganize(5);
    h.observe().await;

    assert!(h.backends.transactions.all().is_empty());
    assert!(h.backends.operations.is_empty());
    assert!(h.resolve(&first.did_unique_suffix).await.is_none());
    assert!(h.resolve(&second.did_unique_suffix).await.is_none());
}
