//! Types for torrent client backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent already present: {0}")]
    Duplicate(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// Source material for an injection.
#[derive(Debug, Clone)]
pub enum TorrentSource {
    /// Raw .torrent file bytes.
    File {
        data: Vec<u8>,
        filename: Option<String>,
    },
    /// Magnet URI.
    Magnet { uri: String },
}

/// Request to add one torrent to a client.
#[derive(Debug, Clone)]
pub struct InjectRequest {
    pub source: TorrentSource,
    /// Save path override. Absent lets the client decide.
    pub save_path: Option<String>,
    /// Category/label. Ignored by backends without label support.
    pub category: Option<String>,
    /// Skip the client's integrity recheck.
    pub skip_recheck: bool,
}

impl InjectRequest {
    /// Request from raw .torrent bytes with default options.
    pub fn from_file(data: Vec<u8>) -> Self {
        Self {
            source: TorrentSource::File {
                data,
                filename: None,
            },
            save_path: None,
            category: None,
            skip_recheck: false,
        }
    }

    /// Request from a magnet URI with default options.
    pub fn from_magnet(uri: impl Into<String>) -> Self {
        Self {
            source: TorrentSource::Magnet { uri: uri.into() },
            save_path: None,
            category: None,
            skip_recheck: false,
        }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        if let TorrentSource::File { ref mut filename, .. } = self.source {
            *filename = Some(name.into());
        }
        self
    }

    pub fn with_save_path(mut self, path: impl Into<String>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_skip_recheck(mut self, skip: bool) -> Self {
        self.skip_recheck = skip;
        self
    }
}

/// Result of a successful injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectResult {
    /// Info hash of the added torrent, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// One torrent client backend.
///
/// Four wire protocols implement this single contract so the injector
/// never branches on protocol type.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging and injection records.
    fn name(&self) -> &str;

    /// Whether the backend supports categories/labels.
    fn supports_categories(&self) -> bool;

    /// Add a torrent.
    async fn inject(&self, request: InjectRequest) -> Result<InjectResult, TorrentClientError>;
}

/// Extract the info hash from a magnet URI (lowercase hex or base32).
pub fn extract_hash_from_magnet(magnet: &str) -> Option<String> {
    let query = magnet.split('?').nth(1)?;
    for param in query.split('&') {
        if let Some(value) = param.strip_prefix("xt=urn:btih:") {
            return Some(value.to_lowercase());
        }
    }
    None
}
