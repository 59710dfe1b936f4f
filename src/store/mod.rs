//! Durable state shared by the control loops.
//!
//! SQLite is the single source of truth: every component reads and then
//! conditionally writes, and conditional `UPDATE` row counts double as the
//! compare-and-set primitive that serializes concurrent loops. Nothing
//! caches authoritative state across ticks.

mod hashes;
mod jobs;
mod workers;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    ip            TEXT NOT NULL,
    port          INTEGER NOT NULL,
    status        TEXT NOT NULL DEFAULT 'Available',
    last_seen     TEXT,
    failed_checks INTEGER NOT NULL DEFAULT 0,
    UNIQUE (ip, port)
);

CREATE TABLE IF NOT EXISTS hashes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    digest     TEXT NOT NULL UNIQUE,
    plaintext  TEXT,
    status     TEXT NOT NULL DEFAULT 'Scheduled',
    created_at TEXT NOT NULL,
    cracked_at TEXT
);

CREATE TABLE IF NOT EXISTS jobs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    hash_id      INTEGER NOT NULL REFERENCES hashes (id),
    worker_id    INTEGER REFERENCES workers (id),
    start_range  TEXT NOT NULL,
    end_range    TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'Scheduled',
    assigned_at  TEXT,
    completed_at TEXT,
    UNIQUE (hash_id, start_range, end_range)
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);
CREATE INDEX IF NOT EXISTS idx_jobs_worker ON jobs (worker_id);
";

/// Handle to the master database. Cheap to share behind an `Arc`; all
/// access is serialized through one connection.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists. A failure here is fatal to startup.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-statement; nothing to recover.
        self.conn.lock().expect("store mutex poisoned")
    }
}

fn now_str() -> String {
    Utc::now().to_rfc3339()
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn bad_column<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status value: {0}")]
struct UnknownStatus(String);
