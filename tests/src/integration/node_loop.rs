//! # Node Loop
//!
//! Requests submitted to one node, batched by its writer, observed back
//! from the ledger and resolved.

use std::time::Duration;

use serde_json::json;
use shared_types::events::codes;
use shared_types::ports::OperationQueue;
use st_01_operations::OperationGenerator;

use super::harness::{service_ids, Harness};

impl Harness {
    /// Write the queued batch, observe it, then let enough blocks pass for
    /// the next batch to be allowed.
    async fn write_and_observe(&self) -> Option<usize> {
        let written = self.runtime.scheduler().write_once().await.unwrap();
        self.observe().await;
        let confirmations = self.params.min_confirmations_before_next_batch;
        self.backends.ledger.advance_time(confirmations);
        written
    }
}

#[tokio::test]
async fn test_full_did_lifecycle() {
    let h = Harness::new();
    h.backends.ledger.set_latest_time(5);

    let create = OperationGenerator::generate_create_operation().unwrap();
    let did = h.runtime.submit_operation(create.operation_buffer).await.unwrap();
    assert_eq!(h.write_and_observe().await, Some(1));
    let state = h.resolve(&did).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1"]);

    let update =
        OperationGenerator::generate_update_operation(&did, &create.update_key_pair).unwrap();
    h.runtime.submit_operation(update.operation_buffer).await.unwrap();
    assert_eq!(h.write_and_observe().await, Some(1));
    let state = h.resolve(&did).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1", "service2"]);

    let recover =
        OperationGenerator::generate_recover_operation(&did, &create.recovery_key_pair).unwrap();
    h.runtime.submit_operation(recover.operation_buffer).await.unwrap();
    assert_eq!(h.write_and_observe().await, Some(1));
    let state = h.resolve(&did).await.unwrap();
    assert!(service_ids(&state).is_empty());
    assert_eq!(state.document["publicKeys"][0]["id"], "recoveredKey");

    let deactivate = OperationGenerator::generate_deactivate_operation(
        &did,
        recover.next_recovery_key_pair.as_ref().unwrap(),
    )
    .unwrap();
    h.runtime.submit_operation(deactivate.operation_buffer).await.unwrap();
    assert_eq!(h.write_and_observe().await, Some(1));
    let state = h.resolve(&did).await.unwrap();
    assert!(state.is_deactivated());
    assert_eq!(state.document, json!({}));

    // Nothing applies after deactivation.
    let late_update = OperationGenerator::generate_update_operation(
        &did,
        recover.next_update_key_pair.as_ref().unwrap(),
    )
    .unwrap();
    h.runtime.submit_operation(late_update.operation_buffer).await.unwrap();
    assert_eq!(h.write_and_observe().await, Some(1));
    assert_eq!(h.resolve(&did).await.unwrap(), state);

    assert_eq!(h.backends.ledger.writes().len(), 5);
    assert_eq!(h.backends.transactions.all().len(), 5);
}

#[tokio::test]
async fn test_batch_waits_for_confirmations() {
    let h = Harness::new();
    h.backends.ledger.set_latest_time(5);
    let first = OperationGenerator::generate_create_operation().unwrap();
    h.runtime.submit_operation(first.operation_buffer).await.unwrap();
    assert_eq!(h.runtime.scheduler().write_once().await.unwrap(), Some(1));

    let second = OperationGenerator::generate_create_operation().unwrap();
    h.runtime.submit_operation(second.operation_buffer).await.unwrap();
    // Not observed yet, so the first batch is unconfirmed.
    assert_eq!(h.runtime.scheduler().write_once().await.unwrap(), Some(0));
    assert_eq!(h.backends.operation_queue.size().await.unwrap(), 1);

    h.observe().await;
    h.backends
        .ledger
        .advance_time(h.params.min_confirmations_before_next_batch);
    assert_eq!(h.runtime.scheduler().write_once().await.unwrap(), Some(1));
    h.observe().await;

    assert!(h.resolve(&first.did_unique_suffix).await.is_some());
    assert!(h.resolve(&second.did_unique_suffix).await.is_some());
}

#[tokio::test]
async fn test_one_batch_carries_many_dids() {
    let h = Harness::new();
    let creates: Vec<_> = (0..3)
        .map(|_| OperationGenerator::generate_create_operation().unwrap())
        .collect();
    for create in &creates {
        h.runtime
            .submit_operation(create.operation_buffer.clone())
            .await
            .unwrap();
    }

    assert_eq!(h.write_and_observe().await, Some(3));

    assert_eq!(h.backends.ledger.writes().len(), 1);
    for create in &creates {
        let state = h.resolve(&create.did_unique_suffix).await.unwrap();
        assert_eq!(service_ids(&state), vec!["service1"]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_timers_drive_the_loop() {
    let h = Harness::new();
    let create = OperationGenerator::generate_create_operation().unwrap();
    let did = h.runtime.submit_operation(create.operation_buffer).await.unwrap();

    h.runtime.start().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.runtime.shutdown().await;

    assert!(h.events.count(codes::BATCH_WRITER_PROCESSING_LOOP_SUCCESS) >= 1);
    assert!(h.events.count(codes::OBSERVER_PROCESSING_LOOP_SUCCESS) >= 1);
    assert_eq!(h.events.count(codes::OBSERVER_PROCESSING_LOOP_FAILED), 0);
    let state = h.resolve(&did).await.unwrap();
    assert_eq!(service_ids(&state), vec!["service1"]);
}
