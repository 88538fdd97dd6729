//! In-memory history store for testing.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::history::{HistoryError, HistoryStore};
use crate::injector::InjectionRecord;

/// Mock implementation of the `HistoryStore` trait.
#[derive(Default)]
pub struct MockHistory {
    first_seen: Mutex<HashMap<String, DateTime<Utc>>>,
    last_searched: Mutex<HashMap<String, DateTime<Utc>>>,
    injections: Mutex<Vec<InjectionRecord>>,
}

impl MockHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdate an entity's first-seen timestamp.
    pub fn set_first_seen(&self, id: &str, when: DateTime<Utc>) {
        self.first_seen
            .lock()
            .unwrap()
            .insert(id.to_string(), when);
    }

    /// Every injection record written so far.
    pub fn recorded_injections(&self) -> Vec<InjectionRecord> {
        self.injections.lock().unwrap().clone()
    }

    /// Map of entity id to last-searched timestamp.
    pub fn all_last_searched(&self) -> HashMap<String, DateTime<Utc>> {
        self.last_searched.lock().unwrap().clone()
    }
}

impl HistoryStore for MockHistory {
    fn ensure_seen(&self, id: &str, _name: &str) -> Result<DateTime<Utc>, HistoryError> {
        let mut seen = self.first_seen.lock().unwrap();
        Ok(*seen.entry(id.to_string()).or_insert_with(Utc::now))
    }

    fn last_searched(&self, id: &str) -> Result<Option<DateTime<Utc>>, HistoryError> {
        Ok(self.last_searched.lock().unwrap().get(id).copied())
    }

    fn set_last_searched(&self, id: &str, when: DateTime<Utc>) -> Result<(), HistoryError> {
        self.last_searched
            .lock()
            .unwrap()
            .insert(id.to_string(), when);
        Ok(())
    }

    fn record_injection(&self, record: &InjectionRecord) -> Result<(), HistoryError> {
        self.injections.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn recent_injections(&self, limit: u32) -> Result<Vec<InjectionRecord>, HistoryError> {
        let mut records = self.injections.lock().unwrap().clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit as usize);
        Ok(records)
    }
}
