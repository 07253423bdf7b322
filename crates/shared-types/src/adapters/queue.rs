//! In-memory operation queue.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::entities::QueuedOperation;
use crate::errors::{ErrorCode, SidetreeError};
use crate::ports::OperationQueue;
use crate::Result;

#[derive(Debug, Default)]
pub struct InMemoryOperationQueue {
    queue: Mutex<VecDeque<QueuedOperation>>,
}

impl InMemoryOperationQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OperationQueue for InMemoryOperationQueue {
    async fn enqueue(&self, did_unique_suffix: &str, operation_buffer: Vec<u8>) -> Result<()> {
        let mut queue = self.queue.lock();
        if queue.iter().any(|op| op.did_unique_suffix == did_unique_suffix) {
            return Err(SidetreeError::new(
                ErrorCode::OperationQueueDuplicateDid,
                format!("DID {did_unique_suffix} already has a pending operation"),
            ));
        }
        queue.push_back(QueuedOperation {
            did_unique_suffix: did_unique_suffix.to_string(),
            operation_buffer,
        });
        Ok(())
    }

    async fn peek(&self, count: usize) -> Result<Vec<QueuedOperation>> {
        Ok(self.queue.lock().iter().take(count).cloned().collect())
    }

    async fn dequeue(&self, count: usize) -> Result<Vec<QueuedOperation>> {
        let mut queue = self.queue.lock();
        let count = count.min(queue.len());
        Ok(queue.drain(..count).collect())
    }

    async fn contains(&self, did_unique_suffix: &str) -> Result<bool> {
        Ok(self
            .queue
            .lock()
            .iter()
            .any(|op| op.did_unique_suffix == did_unique_suffix))
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.queue.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_peek_dequeue() {
        let queue = InMemoryOperationQueue::new();
        queue.enqueue("a", vec![1]).await.unwrap();
        queue.enqueue("b", vec![2]).await.unwrap();
        queue.enqueue("c", vec![3]).await.unwrap();

        let peeked = queue.peek(2).await.unwrap();
        assert_eq!(peeked.len(), 2);
        assert_eq!(queue.size().await.unwrap(), 3);

        let dequeued = queue.dequeue(2).await.unwrap();
        assert_eq!(dequeued, peeked);
        assert_eq!(queue.size().await.unwrap(), 1);
        assert!(queue.contains("c").await.unwrap());

        assert_eq!(queue.dequeue(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_did_rejected() {
        let queue = InMemoryOperationQueue::new();
        queue.enqueue("a", vec![1]).await.unwrap();
        let err = queue.enqueue("a", vec![2]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationQueueDuplicateDid);
    }
}
