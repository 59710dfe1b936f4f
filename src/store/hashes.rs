//! Target digest queries.

use rusqlite::{params, OptionalExtension, Row};

use super::{bad_column, now_str, parse_timestamp, Store, UnknownStatus};
use crate::error::Result;
use crate::model::{HashRecord, HashReport, HashStatus};

fn row_to_hash(row: &Row<'_>) -> rusqlite::Result<HashRecord> {
    let status: String = row.get(3)?;
    Ok(HashRecord {
        id: row.get(0)?,
        digest: row.get(1)?,
        plaintext: row.get(2)?,
        status: HashStatus::parse(&status).ok_or_else(|| bad_column(3, UnknownStatus(status)))?,
        created_at: parse_timestamp(row.get(4)?),
        cracked_at: parse_timestamp(row.get(5)?),
    })
}

const HASH_COLUMNS: &str = "id, digest, plaintext, status, created_at, cracked_at";

impl Store {
    /// Inserts unseen digests as `Scheduled` hashes; duplicates are silently
    /// ignored. The digest alone is the uniqueness key. Returns how many
    /// were newly added.
    pub fn add_digests(&self, digests: &[String]) -> Result<u64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut added = 0u64;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO hashes (digest, status, created_at)
                 VALUES (?1, 'Scheduled', ?2)",
            )?;
            let now = now_str();
            for digest in digests {
                added += stmt.execute(params![digest, now])? as u64;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    pub fn hash_by_digest(&self, digest: &str) -> Result<Option<HashRecord>> {
        let hash = self
            .conn()
            .query_row(
                &format!("SELECT {HASH_COLUMNS} FROM hashes WHERE digest = ?1"),
                params![digest],
                row_to_hash,
            )
            .optional()?;
        Ok(hash)
    }

    pub fn hash_by_id(&self, id: i64) -> Result<Option<HashRecord>> {
        let hash = self
            .conn()
            .query_row(
                &format!("SELECT {HASH_COLUMNS} FROM hashes WHERE id = ?1"),
                params![id],
                row_to_hash,
            )
            .optional()?;
        Ok(hash)
    }

    /// Hashes awaiting partitioning, oldest first.
    pub fn scheduled_hashes(&self) -> Result<Vec<HashRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {HASH_COLUMNS} FROM hashes WHERE status = 'Scheduled' ORDER BY created_at"
        ))?;
        let hashes = stmt
            .query_map([], row_to_hash)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hashes)
    }

    /// Stores the recovered plaintext and advances the hash to `Cracked`.
    /// A no-op if the hash is already cracked; returns whether it advanced.
    pub fn mark_hash_cracked(&self, id: i64, plaintext: &str) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE hashes SET plaintext = ?1, status = 'Cracked', cracked_at = ?2
             WHERE id = ?3 AND status != 'Cracked'",
            params![plaintext, now_str(), id],
        )?;
        Ok(changed > 0)
    }

    /// Terminal transition for a hash whose whole keyspace was searched
    /// without a match. Only applies while the hash is still in progress.
    pub fn mark_hash_uncracked(&self, id: i64) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE hashes SET status = 'UnCracked' WHERE id = ?1 AND status = 'InProgress'",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Per-hash progress rollup. Job counts are meaningful only for hashes
    /// still being searched; a cracked hash has no job rows left.
    pub fn hash_reports(&self) -> Result<Vec<HashReport>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT h.id, h.digest, h.plaintext, h.status, h.created_at, h.cracked_at,
                    COUNT(j.id),
                    COALESCE(SUM(CASE WHEN j.status = 'Completed' THEN 1 ELSE 0 END), 0)
             FROM hashes h
             LEFT JOIN jobs j ON j.hash_id = h.id
             GROUP BY h.id
             ORDER BY h.id",
        )?;
        let reports = stmt
            .query_map([], |row| {
                let status: String = row.get(3)?;
                let status =
                    HashStatus::parse(&status).ok_or_else(|| bad_column(3, UnknownStatus(status)))?;
                let total: u64 = row.get(6)?;
                let completed: u64 = row.get(7)?;
                let counts_apply = status != HashStatus::Cracked;
                Ok(HashReport {
                    hash_id: row.get(0)?,
                    digest: row.get(1)?,
                    plaintext: row.get(2)?,
                    status,
                    total_jobs: counts_apply.then_some(total),
                    completed_jobs: counts_apply.then_some(completed),
                    created_at: parse_timestamp(row.get(4)?),
                    cracked_at: parse_timestamp(row.get(5)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reports)
    }
}
