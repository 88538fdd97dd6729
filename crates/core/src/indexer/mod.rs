//! Indexer query layer.
//!
//! The wire protocol lives behind the `IndexerClient` trait; the
//! `IndexerPool` adds pacing, timeouts and aggregation on top.

mod pool;
mod torznab;
mod types;

pub use pool::IndexerPool;
pub use torznab::TorznabClient;
pub use types::{CandidateFile, IndexerCandidate, IndexerClient, IndexerError};

use std::sync::Arc;

use crate::config::IndexersConfig;

/// Build the indexer pool from configuration, one Torznab client per
/// endpoint URL.
pub fn pool_from_config(config: &IndexersConfig) -> IndexerPool {
    let clients: Vec<Arc<dyn IndexerClient>> = config
        .urls
        .iter()
        .map(|url| Arc::new(TorznabClient::new(url.clone())) as Arc<dyn IndexerClient>)
        .collect();

    IndexerPool::new(
        clients,
        config.delay.as_duration(),
        config.search_timeout.as_ref().map(|t| t.as_duration()),
    )
}
