//! In-memory content-addressable store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::hash_then_encode;
use tracing::debug;

use crate::errors::{ErrorCode, SidetreeError};
use crate::ports::{CasClient, FetchResult, FetchResultCode};
use crate::Result;

/// CAS keyed by the encoded multihash of the content.
pub struct InMemoryCas {
    files: RwLock<HashMap<String, Vec<u8>>>,
    reachable: AtomicBool,
    /// Artificial latency applied to every read.
    read_delay: RwLock<Option<Duration>>,
    reads_in_flight: AtomicUsize,
    max_reads_in_flight: AtomicUsize,
    read_count: AtomicUsize,
}

impl InMemoryCas {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            read_delay: RwLock::new(None),
            reads_in_flight: AtomicUsize::new(0),
            max_reads_in_flight: AtomicUsize::new(0),
            read_count: AtomicUsize::new(0),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.write() = delay;
    }

    /// Drop a file, as if it was never pinned anywhere.
    pub fn remove(&self, uri: &str) {
        self.files.write().remove(uri);
    }

    /// Store content under an arbitrary URI.
    pub fn insert(&self, uri: &str, content: Vec<u8>) {
        self.files.write().insert(uri.to_string(), content);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.files.read().contains_key(uri)
    }

    /// Highest number of reads observed running at once.
    pub fn max_concurrent_reads(&self) -> usize {
        self.max_reads_in_flight.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryCas {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CasClient for InMemoryCas {
    async fn write(&self, content: &[u8]) -> Result<String> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(SidetreeError::new(ErrorCode::CasNotReachable, "write failed"));
        }
        let uri = hash_then_encode(content);
        self.files.write().insert(uri.clone(), content.to_vec());
        debug!(uri = %uri, size = content.len(), "CAS write");
        Ok(uri)
    }

    async fn read(&self, uri: &str, max_size_in_bytes: usize) -> FetchResult {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_reads_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.read_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if !self.reachable.load(Ordering::SeqCst) {
            FetchResult::failure(FetchResultCode::CasNotReachable)
        } else {
            match self.files.read().get(uri) {
                None => FetchResult::failure(FetchResultCode::NotFound),
                Some(content) if content.len() > max_size_in_bytes => {
                    FetchResult::failure(FetchResultCode::MaxSizeExceeded)
                }
                Some(content) => FetchResult::success(content.clone()),
            }
        };

        self.reads_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
