//! Job assignment queries.
//!
//! Status transitions are compare-and-set updates so that a dispatch pass,
//! a reconciliation scan, and a result report racing over the same job
//! settle on exactly one winner. `Completed` is terminal.

use rusqlite::{params, OptionalExtension, Row};

use super::{bad_column, now_str, parse_timestamp, Store, UnknownStatus};
use crate::error::Result;
use crate::keyspace::SubRange;
use crate::model::{InFlightJob, JobAssignment, JobStatus};

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<JobAssignment> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(JobAssignment {
        id: row.get(0)?,
        hash_id: row.get(1)?,
        worker_id: row.get(2)?,
        range: SubRange::new(
            start.parse().map_err(|e| bad_column(3, e))?,
            end.parse().map_err(|e| bad_column(4, e))?,
        ),
        status: JobStatus::parse(&status).ok_or_else(|| bad_column(5, UnknownStatus(status)))?,
        assigned_at: parse_timestamp(row.get(6)?),
        completed_at: parse_timestamp(row.get(7)?),
    })
}

const JOB_COLUMNS: &str =
    "id, hash_id, worker_id, start_range, end_range, status, assigned_at, completed_at";

impl Store {
    /// Creates the full set of sub-range jobs for one hash and advances the
    /// hash `Scheduled → InProgress`, all in a single transaction: either
    /// every sub-range lands or none does. Returns the number of jobs
    /// created; zero means another caller already advanced the hash.
    pub fn create_jobs_for_hash(
        &self,
        hash_id: i64,
        ranges: impl Iterator<Item = SubRange>,
    ) -> Result<u64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // Advancing the status first is the idempotence guard: a second
        // caller sees zero rows changed and inserts nothing.
        let advanced = tx.execute(
            "UPDATE hashes SET status = 'InProgress' WHERE id = ?1 AND status = 'Scheduled'",
            params![hash_id],
        )?;
        if advanced == 0 {
            return Ok(0);
        }

        let mut created = 0u64;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO jobs (hash_id, start_range, end_range, status)
                 VALUES (?1, ?2, ?3, 'Scheduled')",
            )?;
            for range in ranges {
                stmt.execute(params![
                    hash_id,
                    range.start.to_string(),
                    range.end.to_string()
                ])?;
                created += 1;
            }
        }

        tx.commit()?;
        Ok(created)
    }

    /// Oldest scheduled jobs, up to `limit`.
    pub fn scheduled_jobs(&self, limit: usize) -> Result<Vec<JobAssignment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'Scheduled' ORDER BY id LIMIT ?1"
        ))?;
        let jobs = stmt
            .query_map(params![limit as i64], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    /// All in-flight jobs together with the digest they search.
    pub fn in_progress_jobs(&self) -> Result<Vec<InFlightJob>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT j.id, j.hash_id, j.worker_id, j.start_range, j.end_range, j.status,
                    j.assigned_at, j.completed_at, h.digest
             FROM jobs j
             JOIN hashes h ON h.id = j.hash_id
             WHERE j.status = 'InProgress'
             ORDER BY j.id",
        )?;
        let jobs = stmt
            .query_map([], |row| {
                Ok(InFlightJob {
                    job: row_to_job(row)?,
                    digest: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    pub fn job_by_range(&self, hash_id: i64, range: &SubRange) -> Result<Option<JobAssignment>> {
        let job = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     WHERE hash_id = ?1 AND start_range = ?2 AND end_range = ?3"
                ),
                params![hash_id, range.start.to_string(), range.end.to_string()],
                row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    /// Binds a worker to a scheduled job and moves it in flight. Fails the
    /// compare-and-set (returns false) if the job is no longer `Scheduled`,
    /// so two dispatch passes cannot both claim it.
    pub fn claim_job(&self, job_id: i64, worker_id: i64) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE jobs SET worker_id = ?1, status = 'InProgress', assigned_at = ?2
             WHERE id = ?3 AND status = 'Scheduled'",
            params![worker_id, now_str(), job_id],
        )?;
        Ok(changed > 0)
    }

    /// Returns a lost in-flight job to the scheduled pool with its worker
    /// unbound. The (hash, range) key is untouched: no sub-range is ever
    /// lost to a worker failure.
    pub fn reschedule_job(&self, job_id: i64) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE jobs SET status = 'Scheduled', worker_id = NULL, assigned_at = NULL
             WHERE id = ?1 AND status = 'InProgress'",
            params![job_id],
        )?;
        Ok(changed > 0)
    }

    /// Terminal transition; re-application is a no-op.
    pub fn complete_job(&self, job_id: i64) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE jobs SET status = 'Completed', completed_at = ?1
             WHERE id = ?2 AND status = 'InProgress'",
            params![now_str(), job_id],
        )?;
        Ok(changed > 0)
    }

    /// Drops every job of a cracked hash; no further searching is needed.
    pub fn delete_jobs_for_hash(&self, hash_id: i64) -> Result<u64> {
        let deleted = self
            .conn()
            .execute("DELETE FROM jobs WHERE hash_id = ?1", params![hash_id])?;
        Ok(deleted as u64)
    }

    /// Jobs of a hash that have not completed yet; zero means the keyspace
    /// is exhausted for that hash.
    pub fn unfinished_jobs_for_hash(&self, hash_id: i64) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM jobs WHERE hash_id = ?1 AND status != 'Completed'",
            params![hash_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
