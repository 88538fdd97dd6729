//! Types for locally-held content entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while enumerating searchees.
#[derive(Debug, Error)]
pub enum SearcheeError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse torrent file {}: {reason}", .path.display())]
    TorrentParse { path: PathBuf, reason: String },

    #[error("Entity has no files: {0}")]
    Empty(String),

    #[error("History store error: {0}")]
    History(String),
}

/// One file belonging to a searchee, relative to its save path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearcheeFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// A locally-held content entity eligible to be cross-searched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Searchee {
    /// Stable identifier: the info hash for torrent-derived entities,
    /// a path-derived id for directory scans.
    pub id: String,
    /// Display/release name used for search queries and title matching.
    pub name: String,
    /// Constituent files. Never empty.
    pub files: Vec<SearcheeFile>,
    /// Total size in bytes. Always the sum of the file sizes.
    pub total_size: u64,
    /// Present only for torrent-file-derived entities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// Category/label, when one can be derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Where the entity's data lives (or where its torrent file sits).
    pub save_path: PathBuf,
    /// When this entity was first observed.
    pub first_seen: DateTime<Utc>,
    /// When this entity was last cross-searched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_searched: Option<DateTime<Utc>>,
}

impl Searchee {
    /// Build a searchee from its parts, enforcing the file-set invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        files: Vec<SearcheeFile>,
        info_hash: Option<String>,
        category: Option<String>,
        save_path: impl Into<PathBuf>,
        first_seen: DateTime<Utc>,
        last_searched: Option<DateTime<Utc>>,
    ) -> Result<Self, SearcheeError> {
        let name = name.into();
        if files.is_empty() {
            return Err(SearcheeError::Empty(name));
        }
        let total_size = files.iter().map(|f| f.size_bytes).sum();
        Ok(Self {
            id: id.into(),
            name,
            files,
            total_size,
            info_hash,
            category,
            save_path: save_path.into(),
            first_seen,
            last_searched,
        })
    }

    /// Whether this entity came from a directory scan rather than a
    /// torrent file.
    pub fn is_data_based(&self) -> bool {
        self.info_hash.is_none()
    }
}

/// Derive the stable id for a directory-scan entity.
pub fn data_entity_id(path: &Path) -> String {
    format!("data:{}", path.display())
}
