//! Types for the indexer query layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A result returned by an indexer query.
///
/// Ephemeral: lives for one search cycle and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerCandidate {
    /// Release title as listed by the indexer.
    pub title: String,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Retrieval link: magnet URI or .torrent download URL.
    pub link: String,
    /// Which indexer returned this result.
    pub indexer: String,
    /// When the torrent was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    /// File listing, when the indexer provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<CandidateFile>>,
}

impl IndexerCandidate {
    pub fn is_magnet(&self) -> bool {
        self.link.starts_with("magnet:")
    }
}

/// A file within an indexer candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFile {
    pub path: String,
    pub size_bytes: u64,
}

/// Errors that can occur during indexer queries.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Indexer connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Indexer API error: {0}")]
    ApiError(String),

    #[error("Failed to parse indexer response: {0}")]
    ParseError(String),

    #[error("Request timeout")]
    Timeout,
}

/// One search-capable indexer endpoint.
///
/// The wire protocol lives entirely behind this trait; the query layer
/// only sees parsed candidate listings.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Indexer identifier for logging and candidate attribution.
    fn id(&self) -> &str;

    /// Search for candidates matching a free-text query.
    async fn search(&self, query: &str) -> Result<Vec<IndexerCandidate>, IndexerError>;

    /// Fetch the indexer's most recent listings (no query).
    async fn recent(&self) -> Result<Vec<IndexerCandidate>, IndexerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_is_magnet() {
        let mut candidate = IndexerCandidate {
            title: "X".to_string(),
            size_bytes: 1,
            link: "magnet:?xt=urn:btih:abc".to_string(),
            indexer: "test".to_string(),
            publish_date: None,
            files: None,
        };
        assert!(candidate.is_magnet());

        candidate.link = "http://indexer/dl/1.torrent".to_string();
        assert!(!candidate.is_magnet());
    }

    #[test]
    fn test_candidate_serialization() {
        let candidate = IndexerCandidate {
            title: "Some.Release".to_string(),
            size_bytes: 1000,
            link: "http://indexer/dl/1".to_string(),
            indexer: "indexer-a".to_string(),
            publish_date: None,
            files: Some(vec![CandidateFile {
                path: "Some.Release/file.mkv".to_string(),
                size_bytes: 1000,
            }]),
        };

        let json = serde_json::to_string(&candidate).unwrap();
        let parsed: IndexerCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.title, "Some.Release");
        assert_eq!(parsed.files.unwrap().len(), 1);
    }
}
