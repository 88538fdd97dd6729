//! Types for match evaluation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Matching strictness policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Exact title and file-structure alignment. Never matches on a
    /// shared byte size alone.
    #[default]
    Safe,
    /// Size-only comparison within `fuzzy_size_threshold`. Trades
    /// precision for recall across inconsistently-named indexers.
    Risky,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Safe => "safe",
            MatchMode::Risky => "risky",
        }
    }
}

/// How confident the matcher is in a positive result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Title and structure aligned exactly.
    Exact,
    /// Only the total size was compared (risky mode).
    SizeOnly,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::Exact => "exact",
            MatchConfidence::SizeOnly => "size_only",
        }
    }
}

/// A positive match between one searchee and one indexer candidate.
///
/// Produced by the matcher, consumed immediately by the injector.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Policy that produced the match.
    pub mode: MatchMode,
    pub confidence: MatchConfidence,
    /// Searchee file path -> candidate file path, populated only for
    /// structural (exact) matches where the candidate listed its files.
    pub file_map: Option<HashMap<String, String>>,
}
