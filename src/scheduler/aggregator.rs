//! Crack-result aggregation.

use std::sync::Arc;

use crate::error::Result;
use crate::keyspace::SubRange;
use crate::model::WorkerStatus;
use crate::protocol::CrackResult;
use crate::store::Store;

/// Checks that a reported plaintext actually hashes to the target digest.
/// Workers are not trusted: a compromised or buggy one must not be able to
/// poison the hash table.
pub fn verify_plaintext(digest: &str, candidate: &str) -> bool {
    let computed = hex::encode(md5::compute(candidate.as_bytes()).as_ref());
    computed.eq_ignore_ascii_case(digest)
}

/// What one result application changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Jobs moved to `Completed`.
    pub completed: usize,
    /// Hashes that gained a verified plaintext.
    pub cracked: usize,
    /// Hashes whose keyspace ran out without a match.
    pub exhausted: usize,
}

/// Applies worker-reported results to hash and job state, idempotently:
/// replaying a result against an already-cracked hash or completed job
/// changes nothing.
pub struct ResultAggregator {
    store: Arc<Store>,
}

impl ResultAggregator {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn apply(&self, result: &CrackResult) -> Result<ApplyReport> {
        let range = SubRange::new(result.range_start, result.range_end);
        let mut report = ApplyReport::default();

        for (digest, outcome) in &result.results {
            // Unknown digest or unknown (hash, range) pair: a stale or
            // confused worker, not an error.
            let Some(hash) = self.store.hash_by_digest(digest)? else {
                tracing::debug!(digest, "Result for unknown digest, skipping");
                continue;
            };
            let Some(job) = self.store.job_by_range(hash.id, &range)? else {
                tracing::debug!(digest, %range, "Result for unknown job, skipping");
                continue;
            };

            match outcome.password() {
                None => {
                    // The completion CAS is the idempotence gate: a replayed
                    // result finds the job already Completed and must not
                    // touch the worker, which may be busy with another job.
                    if self.store.complete_job(job.id)? {
                        if let Some(worker_id) = job.worker_id {
                            self.store.set_worker_status(worker_id, WorkerStatus::Available)?;
                        }
                        report.completed += 1;
                        if hash.plaintext.is_none()
                            && self.store.unfinished_jobs_for_hash(hash.id)? == 0
                            && self.store.mark_hash_uncracked(hash.id)?
                        {
                            report.exhausted += 1;
                            tracing::info!(digest, "Keyspace exhausted without a match");
                        }
                    }
                }
                Some(password) => {
                    if !verify_plaintext(digest, password) {
                        // Leave the job in flight; the scanner will pick the
                        // range up again rather than trusting this worker.
                        tracing::warn!(
                            digest,
                            job_id = job.id,
                            "Reported plaintext failed re-verification, discarding"
                        );
                        continue;
                    }
                    if self.store.mark_hash_cracked(hash.id, password)? {
                        report.cracked += 1;
                        tracing::info!(digest, "Hash cracked");
                    }
                    if self.store.complete_job(job.id)? {
                        report.completed += 1;
                        if let Some(worker_id) = job.worker_id {
                            self.store.set_worker_status(worker_id, WorkerStatus::Available)?;
                        }
                    }
                    let deleted = self.store.delete_jobs_for_hash(hash.id)?;
                    tracing::debug!(digest, deleted, "Dropped remaining jobs of cracked hash");
                }
            }
        }

        Ok(report)
    }
}
