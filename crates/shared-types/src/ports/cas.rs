//! Content-addressable store port.

use async_trait::async_trait;

use crate::Result;

/// Outcome class of a CAS read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchResultCode {
    Success,
    NotFound,
    MaxSizeExceeded,
    NotAFile,
    InvalidHash,
    CasNotReachable,
}

/// Result of a CAS read; `content` is set only on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub code: FetchResultCode,
    pub content: Option<Vec<u8>>,
}

impl FetchResult {
    pub fn success(content: Vec<u8>) -> Self {
        Self {
            code: FetchResultCode::Success,
            content: Some(content),
        }
    }

    pub fn failure(code: FetchResultCode) -> Self {
        Self { code, content: None }
    }
}

#[async_trait]
pub trait CasClient: Send + Sync {
    /// Store content, returning its URI.
    async fn write(&self, content: &[u8]) -> Result<String>;

    /// Fetch content no larger than `max_size_in_bytes`.
    async fn read(&self, uri: &str, max_size_in_bytes: usize) -> FetchResult;
}
