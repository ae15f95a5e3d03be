//! SQLite feedback store
//!
//! Persistent feedback log in a single table. Timestamps are stored as
//! fixed-width RFC 3339 strings so SQL range comparisons order correctly.
//! Rows that fail validation on the way back are skipped and logged: one
//! bad row must not poison the batch.

use crate::error::{Result, TariffsenseError};
use crate::feedback::FeedbackStore;
use crate::types::FeedbackEntry;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS feedback_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    predicted_code TEXT NOT NULL,
    correct_code TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_feedback_timestamp ON feedback_entries (timestamp);
";

/// Durable feedback log backed by SQLite
pub struct SqliteFeedbackStore {
    conn: Mutex<Connection>,
}

impl SqliteFeedbackStore {
    /// Open (or create) a feedback database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening feedback store at {}", path.display());

        let conn = Connection::open(path)
            .map_err(|e| TariffsenseError::Store(format!("Failed to open database: {}", e)))?;

        Self::with_connection(conn)
    }

    /// Open an in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TariffsenseError::Store(format!("Failed to open database: {}", e)))?;

        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| TariffsenseError::Store(format!("Failed to initialize schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn format_timestamp(timestamp: DateTime<Utc>) -> String {
        // Micros + "Z" keeps every stored value the same width, so the
        // TEXT comparison in read_since matches chronological order.
        timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

#[async_trait]
impl FeedbackStore for SqliteFeedbackStore {
    async fn append(&self, entry: &FeedbackEntry) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO feedback_entries (description, predicted_code, correct_code, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                entry.description,
                entry.predicted_code,
                entry.correct_code,
                Self::format_timestamp(entry.timestamp),
            ],
        )
        .map_err(|e| TariffsenseError::Store(format!("Failed to append entry: {}", e)))?;

        debug!(
            "Appended feedback entry: {} -> {}",
            entry.predicted_code, entry.correct_code
        );
        Ok(())
    }

    async fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackEntry>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn
            .prepare(
                "SELECT description, predicted_code, correct_code, timestamp
                 FROM feedback_entries
                 WHERE timestamp >= ?1
                 ORDER BY timestamp ASC",
            )
            .map_err(|e| TariffsenseError::Store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(
                rusqlite::params![Self::format_timestamp(cutoff)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .map_err(|e| TariffsenseError::Store(format!("Failed to read entries: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            let (description, predicted_code, correct_code, timestamp_str) =
                row.map_err(|e| TariffsenseError::Store(format!("Failed to read row: {}", e)))?;

            let timestamp = match DateTime::parse_from_rfc3339(&timestamp_str) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!(
                        "Skipping feedback row with unparseable timestamp '{}': {}",
                        timestamp_str, e
                    );
                    continue;
                }
            };

            match FeedbackEntry::new(description, predicted_code, correct_code, timestamp) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Skipping inconsistent feedback row: {}", e);
                }
            }
        }

        Ok(entries)
    }
}
