//! Transactions in flight between the ledger read and the transaction store.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::TransactionModel;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Processing,
    Processed,
    /// The processing task failed or panicked; the cycle must be aborted.
    Error,
}

/// One spawned processing task and the transaction it works on.
pub struct TransactionUnderProcessing {
    pub transaction: TransactionModel,
    status: Arc<Mutex<ProcessingStatus>>,
    handle: JoinHandle<()>,
}

impl TransactionUnderProcessing {
    /// Spawn `task`; it reports its outcome through the returned status.
    pub fn spawn<F>(transaction: TransactionModel, task: F) -> Self
    where
        F: std::future::Future<Output = ProcessingStatus> + Send + 'static,
    {
        let status = Arc::new(Mutex::new(ProcessingStatus::Processing));
        let task_status = Arc::clone(&status);
        let handle = tokio::spawn(async move {
            let outcome = task.await;
            *task_status.lock() = outcome;
        });
        Self {
            transaction,
            status,
            handle,
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        // Finished first: a task that ended without reporting panicked.
        if !self.handle.is_finished() {
            return ProcessingStatus::Processing;
        }
        match *self.status.lock() {
            ProcessingStatus::Processing => ProcessingStatus::Error,
            reported => reported,
        }
    }

    /// Wait for the task to end.
    pub async fn wait(&mut self) -> ProcessingStatus {
        match (&mut self.handle).await {
            Ok(()) => self.status(),
            Err(_) => ProcessingStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction() -> TransactionModel {
        TransactionModel {
            transaction_number: 1,
            transaction_time: 1,
            transaction_time_hash: "hash".into(),
            anchor_string: "uri.1".into(),
            transaction_fee_paid: 1,
            normalized_transaction_fee: Some(1),
            writer: "writer".into(),
        }
    }

    #[tokio::test]
    async fn test_reports_outcome() {
        let mut processed = TransactionUnderProcessing::spawn(
            transaction(),
            async { ProcessingStatus::Processed },
        );
        assert_eq!(processed.wait().await, ProcessingStatus::Processed);
        assert_eq!(processed.status(), ProcessingStatus::Processed);

        let mut failed = TransactionUnderProcessing::spawn(
            transaction(),
            async { ProcessingStatus::Error },
        );
        assert_eq!(failed.wait().await, ProcessingStatus::Error);
    }

    #[tokio::test]
    async fn test_pending_until_finished() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut pending = TransactionUnderProcessing::spawn(transaction(), async move {
            let _ = rx.await;
            ProcessingStatus::Processed
        });
        assert_eq!(pending.status(), ProcessingStatus::Processing);

        tx.send(()).unwrap();
        assert_eq!(pending.wait().await, ProcessingStatus::Processed);
    }

    #[tokio::test]
    async fn test_panicked_task_is_error() {
        let fail = true;
        let mut panicked = TransactionUnderProcessing::spawn(transaction(), async move {
            if fail {
                panic!("processing failed");
            }
            ProcessingStatus::Processed
        });
        assert_eq!(panicked.wait().await, ProcessingStatus::Error);
        assert_eq!(panicked.status(), ProcessingStatus::Error);
    }
}
