//! Worker registry queries.

use rusqlite::{params, OptionalExtension, Row};

use super::{bad_column, now_str, parse_timestamp, Store, UnknownStatus};
use crate::error::{MasterError, Result};
use crate::model::{Worker, WorkerStatus};

fn row_to_worker(row: &Row<'_>) -> rusqlite::Result<Worker> {
    let status: String = row.get(3)?;
    Ok(Worker {
        id: row.get(0)?,
        ip: row.get(1)?,
        port: row.get(2)?,
        status: WorkerStatus::parse(&status)
            .ok_or_else(|| bad_column(3, UnknownStatus(status)))?,
        last_seen: parse_timestamp(row.get(4)?),
        failed_checks: row.get(5)?,
    })
}

const WORKER_COLUMNS: &str = "id, ip, port, status, last_seen, failed_checks";

impl Store {
    /// Inserts a new worker in the `Available` state. The (ip, port) pair is
    /// unique; a second registration surfaces as a conflict.
    pub fn register_worker(&self, ip: &str, port: u16) -> Result<i64> {
        let conn = self.conn();
        match conn.execute(
            "INSERT INTO workers (ip, port, status, last_seen) VALUES (?1, ?2, 'Available', ?3)",
            params![ip, port, now_str()],
        ) {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(MasterError::DuplicateWorker(format!("{ip}:{port}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn worker_exists(&self, ip: &str, port: u16) -> Result<bool> {
        let exists: Option<i64> = self
            .conn()
            .query_row(
                "SELECT id FROM workers WHERE ip = ?1 AND port = ?2",
                params![ip, port],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    pub fn worker(&self, id: i64) -> Result<Option<Worker>> {
        let worker = self
            .conn()
            .query_row(
                &format!("SELECT {WORKER_COLUMNS} FROM workers WHERE id = ?1"),
                params![id],
                row_to_worker,
            )
            .optional()?;
        Ok(worker)
    }

    pub fn all_workers(&self) -> Result<Vec<Worker>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {WORKER_COLUMNS} FROM workers ORDER BY id"))?;
        let workers = stmt
            .query_map([], row_to_worker)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(workers)
    }

    /// Workers currently eligible for dispatch.
    pub fn available_workers(&self) -> Result<Vec<Worker>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers WHERE status = 'Available' ORDER BY id"
        ))?;
        let workers = stmt
            .query_map([], row_to_worker)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(workers)
    }

    pub fn set_worker_status(&self, id: i64, status: WorkerStatus) -> Result<()> {
        self.conn().execute(
            "UPDATE workers SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    /// Successful probe: worker is reachable and free. Resets the failure
    /// counter and refreshes the liveness timestamp.
    pub fn mark_worker_available(&self, id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE workers SET status = 'Available', failed_checks = 0, last_seen = ?1
             WHERE id = ?2",
            params![now_str(), id],
        )?;
        Ok(())
    }

    /// Successful probe without a state change.
    pub fn reset_failed_checks(&self, id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE workers SET failed_checks = 0, last_seen = ?1 WHERE id = ?2",
            params![now_str(), id],
        )?;
        Ok(())
    }

    /// Records one failed probe. On reaching `threshold` consecutive
    /// failures while not yet `Unavailable`, demotes the worker and
    /// reschedules every job it held in progress, all in one transaction.
    /// Returns whether the worker was demoted. `last_seen` is deliberately
    /// left untouched on failure.
    pub fn record_failed_probe(&self, id: i64, threshold: u32) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let current: Option<(String, u32)> = tx
            .query_row(
                "SELECT status, failed_checks FROM workers WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((status, failed_checks)) = current else {
            return Err(MasterError::WorkerNotFound(id));
        };

        let failed_checks = failed_checks + 1;
        let demote = failed_checks >= threshold
            && WorkerStatus::parse(&status) != Some(WorkerStatus::Unavailable);

        if demote {
            tx.execute(
                "UPDATE workers SET status = 'Unavailable', failed_checks = ?1 WHERE id = ?2",
                params![failed_checks, id],
            )?;
            let orphaned = tx.execute(
                "UPDATE jobs SET status = 'Scheduled', worker_id = NULL, assigned_at = NULL
                 WHERE worker_id = ?1 AND status = 'InProgress'",
                params![id],
            )?;
            if orphaned > 0 {
                tracing::info!(worker_id = id, orphaned, "Rescheduled jobs of demoted worker");
            }
        } else {
            tx.execute(
                "UPDATE workers SET failed_checks = ?1 WHERE id = ?2",
                params![failed_checks, id],
            )?;
        }

        tx.commit()?;
        Ok(demote)
    }
}
