//! Search and injection history.
//!
//! The engine treats this as an external collaborator: it records when
//! each entity was first seen and last searched, and keeps injection
//! records for observability. Nothing here feeds back into matching.

mod sqlite;

pub use sqlite::SqliteHistory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::injector::InjectionRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Persistent per-entity search state plus injection records.
pub trait HistoryStore: Send + Sync {
    /// Record the entity if it is new and return its first-seen
    /// timestamp (stable across calls).
    fn ensure_seen(&self, id: &str, name: &str) -> Result<DateTime<Utc>, HistoryError>;

    /// When the entity was last cross-searched, if ever.
    fn last_searched(&self, id: &str) -> Result<Option<DateTime<Utc>>, HistoryError>;

    /// Update the entity's last-searched timestamp.
    fn set_last_searched(&self, id: &str, when: DateTime<Utc>) -> Result<(), HistoryError>;

    /// Append one injection record.
    fn record_injection(&self, record: &InjectionRecord) -> Result<(), HistoryError>;

    /// Most recent injection records, newest first.
    fn recent_injections(&self, limit: u32) -> Result<Vec<InjectionRecord>, HistoryError>;
}
