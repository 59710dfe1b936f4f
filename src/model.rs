//! Domain entities and their lifecycle status types.
//!
//! Every status is a closed enum with a single string form used both in the
//! store and on the wire; transitions are enforced by the store's
//! conditional updates, never by ad hoc string comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keyspace::SubRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    Available,
    Busy,
    Unavailable,
}

impl WorkerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerStatus::Available => "Available",
            WorkerStatus::Busy => "Busy",
            WorkerStatus::Unavailable => "Unavailable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(WorkerStatus::Available),
            "Busy" => Some(WorkerStatus::Busy),
            "Unavailable" => Some(WorkerStatus::Unavailable),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashStatus {
    Scheduled,
    InProgress,
    Cracked,
    /// Terminal: the full keyspace was exhausted without a match.
    UnCracked,
}

impl HashStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HashStatus::Scheduled => "Scheduled",
            HashStatus::InProgress => "InProgress",
            HashStatus::Cracked => "Cracked",
            HashStatus::UnCracked => "UnCracked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Scheduled" => Some(HashStatus::Scheduled),
            "InProgress" => Some(HashStatus::InProgress),
            "Cracked" => Some(HashStatus::Cracked),
            "UnCracked" => Some(HashStatus::UnCracked),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Scheduled => "Scheduled",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Scheduled" => Some(JobStatus::Scheduled),
            "InProgress" => Some(JobStatus::InProgress),
            "Completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered compute node. Workers execute one job at a time and are
/// never deleted; stale ones persist as `Unavailable`.
#[derive(Debug, Clone, Serialize)]
pub struct Worker {
    pub id: i64,
    pub ip: String,
    pub port: u16,
    pub status: WorkerStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub failed_checks: u32,
}

impl Worker {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// A target digest to crack.
#[derive(Debug, Clone, Serialize)]
pub struct HashRecord {
    pub id: i64,
    pub digest: String,
    pub plaintext: Option<String>,
    pub status: HashStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub cracked_at: Option<DateTime<Utc>>,
}

/// One bounded unit of work: a hash searched over one keyspace sub-range.
#[derive(Debug, Clone, Serialize)]
pub struct JobAssignment {
    pub id: i64,
    pub hash_id: i64,
    pub worker_id: Option<i64>,
    pub range: SubRange,
    pub status: JobStatus,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An in-flight job joined with the digest it searches, as the scanner
/// needs both to query the owning worker.
#[derive(Debug, Clone)]
pub struct InFlightJob {
    pub job: JobAssignment,
    pub digest: String,
}

/// Per-hash progress summary served to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashReport {
    pub hash_id: i64,
    pub digest: String,
    pub plaintext: Option<String>,
    pub status: HashStatus,
    /// Job counts are reported only while the hash is still being searched;
    /// a cracked hash has had its jobs deleted.
    pub total_jobs: Option<u64>,
    pub completed_jobs: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub cracked_at: Option<DateTime<Utc>>,
}
