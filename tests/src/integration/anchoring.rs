//! # Anchored Batches
//!
//! Batches written by another node, picked up by the observer and resolved.
//!
//! | Batch | Expected |
//! |-------|----------|
//! | create alone | document from the create patches |
//! | create, then update | update applied on top |
//! | more operations than paid for | whole transaction discarded |
//! | update of a DID created in the same batch | update dropped, create kept |
//! | unavailable chunk file | create stored without delta, filled in on retry |

use serde_json::json;
use shared_types::events::codes;
use shared_types::ports::{CasClient, OperationStore};
use st_01_operations::OperationGenerator;

use super::harness::{service_ids, Harness};

#[tokio::test]
async fn test_create_alone_resolves_to_its_patches() {
    let h = Harness::new();
    let create = OperationGenerator::create_operation_with_patches(vec![json!({
        "action": "add-services",
        "services": [OperationGenerator::service_entry("service1")],
    })])
    .unwrap();
    let batch = h.batch(&[&create.operation_buffer]);
    let transaction = h.anchor(10, &batch, 1).await;

    assert_eq!(h.observe().await, 1);
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();

    assert_eq!(
        state.document,
        json!({ "services": [OperationGenerator::service_entry("service1")] })
    );
    assert_eq!(
        state.next_update_commitment_hash.as_deref(),
        Some(create.delta.update_commitment.as_str())
    );
    assert!(state.next_recovery_commitment_hash.is_some());
    assert_eq!(state.last_operation_transaction_number, transaction.transaction_number);
}

#[tokio::test]
async fn test_create_then_update() {
    let h = Harness::new();
    let create = OperationGenerator::generate_create_operation().unwrap();
    let update = OperationGenerator::generate_update_operation(
        &create.did_unique_suffix,
        &create.update_key_pair,
    )
    .unwrap();
    let transactions = h
        .anchor_each(10, &[&create.operation_buffer, &update.operation_buffer])
        .await;

    assert_eq!(h.observe().await, 2);
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();

    assert_eq!(service_ids(&state), vec!["service1", "service2"]);
    assert_eq!(
        state.last_operation_transaction_number,
        transactions[1].transaction_number
    );
    let delta = update.delta.unwrap();
    assert_eq!(
        state.next_update_commitment_hash.as_deref(),
        Some(delta.update_commitment.as_str())
    );
}

#[tokio::test]
async fn test_operations_above_paid_count_discard_transaction() {
    let h = Harness::new();
    let first = OperationGenerator::generate_create_operation().unwrap();
    let second = OperationGenerator::generate_create_operation().unwrap();
    let batch = h.batch(&[&first.operation_buffer, &second.operation_buffer]);
    h.anchor(10, &batch, 1).await;

    assert_eq!(h.observe().await, 1);

    assert!(h.backends.operations.is_empty());
    assert!(h.resolve(&first.did_unique_suffix).await.is_none());
    assert!(h.resolve(&second.did_unique_suffix).await.is_none());
    assert_eq!(h.events.count(codes::TRANSACTION_PROCESSING_FAILED), 1);
    // Discarded, not retried.
    assert_eq!(h.backends.transactions.all().len(), 1);
    assert!(h.backends.unresolvable_transactions.is_empty());
}

#[tokio::test]
async fn test_update_of_did_created_in_same_batch_dropped() {
    let h = Harness::new();
    let create = OperationGenerator::generate_create_operation().unwrap();
    let update = OperationGenerator::generate_update_operation(
        &create.did_unique_suffix,
        &create.update_key_pair,
    )
    .unwrap();
    let batch = h.batch(&[&create.operation_buffer, &update.operation_buffer]);
    h.anchor(10, &batch, 2).await;

    h.observe().await;

    let stored = h.backends.operations.get(&create.did_unique_suffix).await.unwrap();
    assert_eq!(stored.len(), 1);
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1"]);
    assert_eq!(
        state.next_update_commitment_hash.as_deref(),
        Some(create.delta.update_commitment.as_str())
    );
}

#[tokio::test]
async fn test_missing_chunk_file_filled_in_on_retry() {
    let h = Harness::new();
    let create = OperationGenerator::generate_create_operation().unwrap();
    let batch = h.batch(&[&create.operation_buffer]);
    let chunk = batch.chunk_file_model().unwrap().unwrap();
    let chunk_buffer = st_02_file_codecs::ChunkFile::create_buffer(&chunk).unwrap();
    let chunk_uri = h.backends.cas.write(&chunk_buffer).await.unwrap();
    h.anchor(10, &batch, 1).await;
    h.backends.cas.remove(&chunk_uri);

    assert_eq!(h.observe().await, 1);
    assert_eq!(h.backends.unresolvable_transactions.len(), 1);
    // Stored without a delta: the DID exists with an empty document.
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();
    assert_eq!(state.document, json!({}));
    assert_eq!(state.next_update_commitment_hash, None);

    h.backends.cas.insert(&chunk_uri, chunk_buffer);
    h.clock.advance(60_000);
    assert_eq!(h.runtime.observer().process_unresolvable_transactions().await.unwrap(), 1);

    assert!(h.backends.unresolvable_transactions.is_empty());
    let state = h.resolve(&create.did_unique_suffix).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1"]);
}
