//! Match evaluation.
//!
//! `evaluate` is a pure function of its inputs: one searchee, one indexer
//! candidate, a strictness mode and the fuzzy size threshold. No hidden
//! state, so every policy decision can be unit tested against fixed pairs.

mod types;

pub use types::{MatchConfidence, MatchMode, MatchResult};

use std::collections::HashMap;

use crate::indexer::IndexerCandidate;
use crate::searchee::Searchee;

/// Decide whether `candidate` describes the same content as `searchee`.
///
/// Returns `None` for no-match; absence of a match is a normal outcome,
/// never an error.
pub fn evaluate(
    searchee: &Searchee,
    candidate: &IndexerCandidate,
    mode: MatchMode,
    fuzzy_size_threshold: f64,
) -> Option<MatchResult> {
    match mode {
        MatchMode::Safe => evaluate_safe(searchee, candidate),
        MatchMode::Risky => evaluate_risky(searchee, candidate, fuzzy_size_threshold),
    }
}

/// Safe mode: normalized title and file structure must align exactly.
fn evaluate_safe(searchee: &Searchee, candidate: &IndexerCandidate) -> Option<MatchResult> {
    if normalize_title(&candidate.title) != normalize_title(&searchee.name) {
        return None;
    }

    match candidate.files {
        Some(ref candidate_files) => {
            if candidate_files.len() != searchee.files.len() {
                return None;
            }

            // Index candidate files by normalized relative path
            let mut by_path: HashMap<String, (&str, u64)> = HashMap::new();
            for file in candidate_files {
                by_path.insert(normalize_path(&file.path), (file.path.as_str(), file.size_bytes));
            }
            if by_path.len() != candidate_files.len() {
                // Duplicate normalized paths cannot align one-to-one
                return None;
            }

            let mut file_map = HashMap::new();
            for file in &searchee.files {
                let key = normalize_path(&file.path.to_string_lossy());
                match by_path.get(&key) {
                    Some(&(candidate_path, size)) if size == file.size_bytes => {
                        file_map.insert(
                            file.path.to_string_lossy().to_string(),
                            candidate_path.to_string(),
                        );
                    }
                    _ => return None,
                }
            }

            Some(MatchResult {
                mode: MatchMode::Safe,
                confidence: MatchConfidence::Exact,
                file_map: Some(file_map),
            })
        }
        None => {
            // No file listing from the indexer: the title aligned, but a
            // structural check is impossible, so require the exact size.
            if candidate.size_bytes == searchee.total_size {
                Some(MatchResult {
                    mode: MatchMode::Safe,
                    confidence: MatchConfidence::Exact,
                    file_map: None,
                })
            } else {
                None
            }
        }
    }
}

/// Risky mode: relative size difference within the threshold, searchee
/// size as the base. No name comparison at all.
fn evaluate_risky(
    searchee: &Searchee,
    candidate: &IndexerCandidate,
    fuzzy_size_threshold: f64,
) -> Option<MatchResult> {
    if searchee.total_size == 0 {
        return None;
    }

    let diff = candidate.size_bytes.abs_diff(searchee.total_size) as f64;
    if diff / searchee.total_size as f64 <= fuzzy_size_threshold {
        Some(MatchResult {
            mode: MatchMode::Risky,
            confidence: MatchConfidence::SizeOnly,
            file_map: None,
        })
    } else {
        None
    }
}

/// Normalize a release title for comparison: lowercase, separators
/// collapsed to single spaces.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_was_space = true;
    for c in title.chars() {
        let c = match c {
            '.' | '_' | '-' | ' ' | '\t' => ' ',
            c => c.to_ascii_lowercase(),
        };
        if c == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Normalize a relative file path: forward slashes, lowercased segments.
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("/")
}
