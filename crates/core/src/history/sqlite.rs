//! SQLite-backed history store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::injector::InjectionRecord;

use super::{HistoryError, HistoryStore};

/// SQLite-backed history store.
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Open (or create) the history database at the given path.
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), HistoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS searchees (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                first_seen TEXT NOT NULL,
                last_searched TEXT
            );

            CREATE TABLE IF NOT EXISTS injections (
                id TEXT PRIMARY KEY,
                searchee_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                record TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_injections_timestamp ON injections(timestamp DESC);
            CREATE INDEX IF NOT EXISTS idx_injections_searchee ON injections(searchee_id);
            "#,
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }
}

impl HistoryStore for SqliteHistory {
    fn ensure_seen(&self, id: &str, name: &str) -> Result<DateTime<Utc>, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<String> = conn
            .query_row(
                "SELECT first_seen FROM searchees WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        if let Some(first_seen) = existing {
            return DateTime::parse_from_rfc3339(&first_seen)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| HistoryError::Database(format!("bad first_seen timestamp: {}", e)));
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO searchees (id, name, first_seen, last_searched) VALUES (?1, ?2, ?3, NULL)",
            params![id, name, now.to_rfc3339()],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(now)
    }

    fn last_searched(&self, id: &str) -> Result<Option<DateTime<Utc>>, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let value: Option<Option<String>> = conn
            .query_row(
                "SELECT last_searched FROM searchees WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        match value.flatten() {
            Some(ts) => DateTime::parse_from_rfc3339(&ts)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| HistoryError::Database(format!("bad last_searched timestamp: {}", e))),
            None => Ok(None),
        }
    }

    fn set_last_searched(&self, id: &str, when: DateTime<Utc>) -> Result<(), HistoryError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                "UPDATE searchees SET last_searched = ?2 WHERE id = ?1",
                params![id, when.to_rfc3339()],
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        if updated == 0 {
            // Entity not registered yet; record it with the search time
            conn.execute(
                "INSERT INTO searchees (id, name, first_seen, last_searched) VALUES (?1, '', ?2, ?2)",
                params![id, when.to_rfc3339()],
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        }

        Ok(())
    }

    fn record_injection(&self, record: &InjectionRecord) -> Result<(), HistoryError> {
        let conn = self.conn.lock().unwrap();

        let json =
            serde_json::to_string(record).map_err(|e| HistoryError::Database(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO injections (id, searchee_id, timestamp, record) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.searchee_id,
                record.timestamp.to_rfc3339(),
                json
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }

    fn recent_injections(&self, limit: u32) -> Result<Vec<InjectionRecord>, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT record FROM injections ORDER BY timestamp DESC LIMIT ?1")
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let json = row.map_err(|e| HistoryError::Database(e.to_string()))?;
            match serde_json::from_str(&json) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unparseable injection record: {}", e);
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injector::InjectionOutcome;

    fn record(id: &str, searchee_id: &str, timestamp: DateTime<Utc>) -> InjectionRecord {
        InjectionRecord {
            id: id.to_string(),
            searchee_id: searchee_id.to_string(),
            searchee_name: "Some.Release".to_string(),
            candidate_title: "Some Release".to_string(),
            indexer: "idx".to_string(),
            outcome: InjectionOutcome::Injected,
            client: Some("qbittorrent".to_string()),
            category: Some("movies.cross-seed".to_string()),
            error: None,
            timestamp,
        }
    }

    #[test]
    fn test_ensure_seen_is_stable() {
        let store = SqliteHistory::in_memory().unwrap();

        let first = store.ensure_seen("abc", "Some.Release").unwrap();
        let second = store.ensure_seen("abc", "Some.Release").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_last_searched_roundtrip() {
        let store = SqliteHistory::in_memory().unwrap();
        store.ensure_seen("abc", "X").unwrap();

        assert!(store.last_searched("abc").unwrap().is_none());

        let when = Utc::now();
        store.set_last_searched("abc", when).unwrap();

        let loaded = store.last_searched("abc").unwrap().unwrap();
        // RFC 3339 round-trip keeps sub-second precision
        assert_eq!(loaded.timestamp_millis(), when.timestamp_millis());
    }

    #[test]
    fn test_last_searched_unknown_entity() {
        let store = SqliteHistory::in_memory().unwrap();
        assert!(store.last_searched("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_last_searched_registers_unknown_entity() {
        let store = SqliteHistory::in_memory().unwrap();
        let when = Utc::now();
        store.set_last_searched("fresh", when).unwrap();
        assert!(store.last_searched("fresh").unwrap().is_some());
    }

    #[test]
    fn test_injection_records_newest_first() {
        let store = SqliteHistory::in_memory().unwrap();
        let base = Utc::now();

        store
            .record_injection(&record("r1", "s1", base - chrono::Duration::minutes(2)))
            .unwrap();
        store
            .record_injection(&record("r2", "s1", base - chrono::Duration::minutes(1)))
            .unwrap();
        store.record_injection(&record("r3", "s2", base)).unwrap();

        let records = store.recent_injections(2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "r3");
        assert_eq!(records[1].id, "r2");
    }
}
