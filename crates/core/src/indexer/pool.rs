//! Query layer over the configured indexer endpoints.
//!
//! Fan-out is paced, not parallel: successive request starts are spaced
//! by at least the configured delay, across indexers and across
//! searchees, regardless of individual request latency. A timeout or
//! failure on one indexer degrades that entity's result set and nothing
//! else.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::matcher::normalize_title;
use crate::metrics;
use crate::searchee::Searchee;

use super::{IndexerCandidate, IndexerClient, IndexerError};

/// Fans one query out to every configured indexer.
pub struct IndexerPool {
    clients: Vec<Arc<dyn IndexerClient>>,
    delay: Duration,
    search_timeout: Option<Duration>,
    /// Earliest instant the next request may start.
    next_slot: Mutex<Option<Instant>>,
}

impl IndexerPool {
    pub fn new(
        clients: Vec<Arc<dyn IndexerClient>>,
        delay: Duration,
        search_timeout: Option<Duration>,
    ) -> Self {
        Self {
            clients,
            delay,
            search_timeout,
            next_slot: Mutex::new(None),
        }
    }

    pub fn indexer_count(&self) -> usize {
        self.clients.len()
    }

    /// Fetch candidates for one searchee from every indexer.
    pub async fn query(&self, searchee: &Searchee) -> Vec<IndexerCandidate> {
        let query = normalize_title(&searchee.name);
        let mut handles = Vec::with_capacity(self.clients.len());

        for client in &self.clients {
            self.wait_for_slot().await;
            let client = Arc::clone(client);
            let query = query.clone();
            let timeout = self.search_timeout;
            handles.push(tokio::spawn(async move {
                run_request(&client, timeout, client.search(&query)).await
            }));
        }

        collect(handles).await
    }

    /// Fetch the recent-listings feeds from every indexer.
    pub async fn recent(&self) -> Vec<IndexerCandidate> {
        let mut handles = Vec::with_capacity(self.clients.len());

        for client in &self.clients {
            self.wait_for_slot().await;
            let client = Arc::clone(client);
            let timeout = self.search_timeout;
            handles.push(tokio::spawn(async move {
                run_request(&client, timeout, client.recent()).await
            }));
        }

        collect(handles).await
    }

    /// Reserve the next request slot and sleep until it opens.
    ///
    /// Slots are handed out delay-apart even under concurrent callers,
    /// which is what actually enforces the minimum spacing.
    async fn wait_for_slot(&self) {
        let start_at = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let at = match *slot {
                Some(t) if t > now => t,
                _ => now,
            };
            *slot = Some(at + self.delay);
            at
        };
        tokio::time::sleep_until(start_at).await;
    }
}

async fn run_request<F>(
    client: &Arc<dyn IndexerClient>,
    timeout: Option<Duration>,
    fut: F,
) -> Vec<IndexerCandidate>
where
    F: Future<Output = Result<Vec<IndexerCandidate>, IndexerError>>,
{
    let result = match timeout {
        Some(t) => match tokio::time::timeout(t, fut).await {
            Ok(r) => r,
            Err(_) => Err(IndexerError::Timeout),
        },
        None => fut.await,
    };

    match result {
        Ok(candidates) => {
            metrics::CANDIDATES_RETURNED.observe(candidates.len() as f64);
            candidates
        }
        Err(e) => {
            // Degraded result set, not a failed cycle
            metrics::INDEXER_ERRORS.with_label_values(&[client.id()]).inc();
            warn!("Indexer {} failed: {}", client.id(), e);
            Vec::new()
        }
    }
}

async fn collect(
    handles: Vec<tokio::task::JoinHandle<Vec<IndexerCandidate>>>,
) -> Vec<IndexerCandidate> {
    join_all(handles)
        .await
        .into_iter()
        .filter_map(|r| r.ok())
        .flatten()
        .collect()
}
