//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::config::Span;

/// Floor for the activity poll cadence.
pub const MIN_RSS_CADENCE_SECS: u64 = 600;
/// Floor for the full-search cadence.
pub const MIN_SEARCH_CADENCE_SECS: u64 = 86_400;

/// Configuration for the periodic tasks.
///
/// An absent cadence disables that task entirely; there is no zero
/// cadence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Activity poll cadence. Minimum 10 minutes when set.
    #[serde(default)]
    pub rss_cadence: Option<Span>,
    /// Full-search cadence. Minimum 1 day when set.
    #[serde(default)]
    pub search_cadence: Option<Span>,
    /// Hard ceiling on per-searchee search invocations across all
    /// cycles. Absent means unlimited.
    #[serde(default)]
    pub search_limit: Option<u32>,
}
