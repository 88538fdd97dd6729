//! Mock torrent client for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::torrent_client::{
    InjectRequest, InjectResult, TorrentClient, TorrentClientError,
};

/// Mock implementation of the `TorrentClient` trait.
///
/// Records every inject request for assertions and supports scripted
/// failures.
pub struct MockTorrentClient {
    requests: RwLock<Vec<InjectRequest>>,
    next_error: RwLock<Option<TorrentClientError>>,
    supports_categories: AtomicBool,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(Vec::new()),
            next_error: RwLock::new(None),
            supports_categories: AtomicBool::new(true),
        }
    }

    /// Fail the next inject with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Toggle label support.
    pub async fn set_supports_categories(&self, supported: bool) {
        self.supports_categories.store(supported, Ordering::SeqCst);
    }

    /// Every inject request this client accepted.
    pub async fn recorded_requests(&self) -> Vec<InjectRequest> {
        self.requests.read().await.clone()
    }

    pub async fn inject_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_categories(&self) -> bool {
        self.supports_categories.load(Ordering::SeqCst)
    }

    async fn inject(&self, request: InjectRequest) -> Result<InjectResult, TorrentClientError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.requests.write().await.push(request);
        Ok(InjectResult {
            hash: Some("mockhash".to_string()),
        })
    }
}
