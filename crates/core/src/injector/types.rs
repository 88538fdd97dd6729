//! Types for injection outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::torrent_client::TorrentClientError;

/// What to do with a confirmed match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Write the matched torrent to the output directory for manual
    /// handling. No client interaction.
    #[default]
    Save,
    /// Add the matched torrent to the configured client backend.
    Inject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Save => "save",
            Action::Inject => "inject",
        }
    }
}

/// Terminal state of one injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOutcome {
    Injected,
    Saved,
    Failed,
}

impl InjectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionOutcome::Injected => "injected",
            InjectionOutcome::Saved => "saved",
            InjectionOutcome::Failed => "failed",
        }
    }
}

/// Outcome of one injection attempt, written to history for
/// observability. Never re-read by the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionRecord {
    pub id: String,
    pub searchee_id: String,
    pub searchee_name: String,
    pub candidate_title: String,
    pub indexer: String,
    pub outcome: InjectionOutcome,
    /// Target client backend, absent for saves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    /// Category applied at injection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Errors that can occur while applying a match.
#[derive(Debug, Error)]
pub enum InjectorError {
    #[error("Failed to snatch torrent from {url}: {reason}")]
    SnatchFailed { url: String, reason: String },

    #[error("Snatch timed out: {0}")]
    SnatchTimeout(String),

    #[error("Failed to create {link_type} link from {} to {}: {reason}", .source_path.display(), .target.display())]
    LinkFailed {
        link_type: &'static str,
        source_path: std::path::PathBuf,
        target: std::path::PathBuf,
        reason: String,
    },

    #[error("No link directory configured for data-based match")]
    LinkDirMissing,

    #[error("Client error: {0}")]
    Client(#[from] TorrentClientError),

    #[error("No client backend configured")]
    ClientMissing,

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
