//! Types for the scheduler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::searchee::SearcheeError;

/// The two periodic tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Lightweight recent-listings poll.
    Rss,
    /// Full per-searchee indexer search.
    Search,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Rss => "rss",
            TaskKind::Search => "search",
        }
    }
}

/// Errors surfaced by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Search budget exhausted ({limit} searches used)")]
    BudgetExhausted { limit: u32 },

    #[error("A {task} run is already in progress")]
    AlreadyRunning { task: &'static str },

    #[error("Searchee enumeration failed: {0}")]
    Source(#[from] SearcheeError),
}

/// Result of one completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub task: String,
    /// Eligible searchees this cycle.
    pub searchees: usize,
    /// Per-searchee searches actually issued (full search only).
    pub searches: usize,
    /// Positive matches found.
    pub matches: usize,
    /// Matches that ended in a successful injection or save.
    pub applied: usize,
    /// Whether the cycle stopped early on budget exhaustion.
    pub budget_exhausted: bool,
}

/// Current scheduler state for the control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub search_runs: u64,
    pub rss_runs: u64,
    pub searches_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<u32>,
}
