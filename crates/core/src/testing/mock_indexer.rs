//! Mock indexer client for testing.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::indexer::{IndexerCandidate, IndexerClient, IndexerError};

/// Mock implementation of the `IndexerClient` trait.
///
/// Records the start time of every request so tests can assert on
/// request spacing, and supports injectable latency and errors.
pub struct MockIndexerClient {
    id: String,
    results: RwLock<Vec<IndexerCandidate>>,
    recent: RwLock<Vec<IndexerCandidate>>,
    request_times: RwLock<Vec<Instant>>,
    next_error: RwLock<Option<IndexerError>>,
    latency: RwLock<Option<Duration>>,
}

impl MockIndexerClient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            results: RwLock::new(Vec::new()),
            recent: RwLock::new(Vec::new()),
            request_times: RwLock::new(Vec::new()),
            next_error: RwLock::new(None),
            latency: RwLock::new(None),
        }
    }

    /// Set the results returned by subsequent searches.
    pub async fn set_results(&self, results: Vec<IndexerCandidate>) {
        *self.results.write().await = results;
    }

    /// Set the recent-listings feed.
    pub async fn set_recent(&self, results: Vec<IndexerCandidate>) {
        *self.recent.write().await = results;
    }

    /// Fail the next request with the given error.
    pub async fn set_next_error(&self, error: IndexerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every response by the given duration.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// Start times of every request this client has seen.
    pub async fn request_times(&self) -> Vec<Instant> {
        self.request_times.read().await.clone()
    }

    async fn record_and_wait(&self) -> Result<(), IndexerError> {
        self.request_times.write().await.push(Instant::now());

        if let Some(latency) = *self.latency.read().await {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(())
    }
}

#[async_trait]
impl IndexerClient for MockIndexerClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, _query: &str) -> Result<Vec<IndexerCandidate>, IndexerError> {
        self.record_and_wait().await?;
        Ok(self.results.read().await.clone())
    }

    async fn recent(&self) -> Result<Vec<IndexerCandidate>, IndexerError> {
        self.record_and_wait().await?;
        Ok(self.recent.read().await.clone())
    }
}
