//! Pending operation queue port.

use async_trait::async_trait;

use crate::entities::QueuedOperation;
use crate::Result;

/// FIFO of operations waiting to be batched.
#[async_trait]
pub trait OperationQueue: Send + Sync {
    /// Append an operation. Fails with `OperationQueueDuplicateDid` when the
    /// DID already has a pending operation.
    async fn enqueue(&self, did_unique_suffix: &str, operation_buffer: Vec<u8>) -> Result<()>;

    /// Up to `count` operations from the head, without removing them.
    async fn peek(&self, count: usize) -> Result<Vec<QueuedOperation>>;

    /// Remove and return up to `count` operations from the head.
    async fn dequeue(&self, count: usize) -> Result<Vec<QueuedOperation>>;

    async fn contains(&self, did_unique_suffix: &str) -> Result<bool>;

    async fn size(&self) -> Result<usize>;
}
