//! Bounded concurrent CAS downloads.

use std::sync::Arc;

use shared_types::ports::{CasClient, FetchResultCode};
use shared_types::{ErrorCode, Result, SidetreeError};
use tokio::sync::Semaphore;
use tracing::debug;

/// Caps the number of CAS reads in flight across every transaction being
/// processed. Callers beyond the cap wait for a permit.
pub struct DownloadManager {
    cas: Arc<dyn CasClient>,
    permits: Semaphore,
    max_concurrent_downloads: usize,
}

impl DownloadManager {
    pub fn new(cas: Arc<dyn CasClient>, max_concurrent_downloads: usize) -> Self {
        let max_concurrent_downloads = max_concurrent_downloads.max(1);
        Self {
            cas,
            permits: Semaphore::new(max_concurrent_downloads),
            max_concurrent_downloads,
        }
    }

    pub fn max_concurrent_downloads(&self) -> usize {
        self.max_concurrent_downloads
    }

    /// Download `uri`, failing with a CAS error code unless the read succeeds.
    pub async fn download(&self, uri: &str, max_size_in_bytes: usize) -> Result<Vec<u8>> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            SidetreeError::new(ErrorCode::CasNotReachable, "download manager closed")
        })?;

        let result = self.cas.read(uri, max_size_in_bytes).await;
        debug!(uri, code = ?result.code, "CAS download finished");

        let code = match result.code {
            FetchResultCode::Success => {
                return result.content.ok_or_else(|| {
                    SidetreeError::new(
                        ErrorCode::CasFileNotFound,
                        format!("{uri} returned no content"),
                    )
                })
            }
            FetchResultCode::NotFound => ErrorCode::CasFileNotFound,
            FetchResultCode::CasNotReachable => ErrorCode::CasNotReachable,
            FetchResultCode::MaxSizeExceeded => ErrorCode::CasFileTooLarge,
            FetchResultCode::NotAFile => ErrorCode::CasFileNotAFile,
            FetchResultCode::InvalidHash => ErrorCode::CasFileHashMismatch,
        };
        Err(SidetreeError::new(code, format!("download of {uri} failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::adapters::InMemoryCas;
    use std::time::Duration;

    #[tokio::test]
    async fn test_download_codes() {
        let cas = Arc::new(InMemoryCas::new());
        let uri = cas.write(b"content").await.unwrap();
        let manager = DownloadManager::new(cas.clone(), 2);

        assert_eq!(manager.download(&uri, 100).await.unwrap(), b"content");
        assert_eq!(manager.download(&uri, 3).await.unwrap_err().code, ErrorCode::CasFileTooLarge);
        assert_eq!(
            manager.download("missing", 100).await.unwrap_err().code,
            ErrorCode::CasFileNotFound
        );

        cas.set_reachable(false);
        let err = manager.download(&uri, 100).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CasNotReachable);
        assert!(err.is_availability());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let cas = Arc::new(InMemoryCas::new());
        cas.set_read_delay(Some(Duration::from_millis(20)));
        let uri = cas.write(b"content").await.unwrap();
        let manager = Arc::new(DownloadManager::new(cas.clone(), 3));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                let uri = uri.clone();
                tokio::spawn(async move { manager.download(&uri, 100).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(cas.read_count(), 10);
        assert!(cas.max_concurrent_reads() <= 3);
    }
}
