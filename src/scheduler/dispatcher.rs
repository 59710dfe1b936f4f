//! Greedy job dispatch.

use std::sync::Arc;

use crate::comms::{PushOutcome, WorkerClient};
use crate::config::DispatchPolicy;
use crate::error::Result;
use crate::model::{JobAssignment, Worker, WorkerStatus};
use crate::protocol::CrackRequest;
use crate::store::Store;

/// Pairs the oldest scheduled jobs with the available worker pool, one
/// push at a time. Each placement is claimed through a compare-and-set,
/// so concurrent passes never double-assign a job.
pub struct JobDispatcher {
    store: Arc<Store>,
    client: Arc<dyn WorkerClient>,
    policy: DispatchPolicy,
}

impl JobDispatcher {
    pub fn new(store: Arc<Store>, client: Arc<dyn WorkerClient>, policy: DispatchPolicy) -> Self {
        Self {
            store,
            client,
            policy,
        }
    }

    /// Runs one dispatch pass and returns the number of jobs placed.
    pub async fn dispatch_pass(&self) -> Result<usize> {
        let mut pool = self.store.available_workers()?;
        if pool.is_empty() {
            return Ok(0);
        }
        let jobs = self.store.scheduled_jobs(pool.len())?;
        if jobs.is_empty() {
            return Ok(0);
        }
        tracing::debug!(
            workers = pool.len(),
            jobs = jobs.len(),
            "Starting dispatch pass"
        );

        let mut dispatched = 0;
        for job in jobs {
            let mut placed = false;
            let mut candidate = 0;
            while candidate < pool.len() {
                if self.try_place(&pool[candidate], &job).await? {
                    pool.remove(candidate);
                    dispatched += 1;
                    placed = true;
                    break;
                }
                candidate += 1;
            }
            if pool.is_empty() {
                break;
            }
            if !placed && self.policy == DispatchPolicy::StopOnUnplaced {
                tracing::debug!(job_id = job.id, "No worker accepted job, ending pass");
                break;
            }
        }

        if dispatched > 0 {
            tracing::info!(dispatched, "Dispatch pass placed jobs");
        }
        Ok(dispatched)
    }

    async fn try_place(&self, worker: &Worker, job: &JobAssignment) -> Result<bool> {
        let address = worker.address();

        // The pool snapshot can go stale between the query and the push;
        // a cheap probe filters out workers that died or got busy since.
        if !self.client.probe_health(&address).await.is_reachable() {
            tracing::debug!(worker_id = worker.id, "Worker unreachable, skipping");
            return Ok(false);
        }

        let Some(hash) = self.store.hash_by_id(job.hash_id)? else {
            tracing::debug!(job_id = job.id, "Job references a deleted hash, skipping");
            return Ok(false);
        };

        let request = CrackRequest {
            hashes: vec![hash.digest],
            start_range: job.range.start,
            end_range: job.range.end,
        };
        match self.client.push_job(&address, &request).await {
            PushOutcome::Accepted => {
                if !self.store.claim_job(job.id, worker.id)? {
                    // Lost the claim race; the worker will report a result
                    // nobody asked for and the aggregator will absorb it.
                    tracing::warn!(job_id = job.id, "Job was claimed elsewhere after push");
                    return Ok(false);
                }
                self.store.set_worker_status(worker.id, WorkerStatus::Busy)?;
                tracing::info!(
                    job_id = job.id,
                    worker_id = worker.id,
                    range = %job.range,
                    "Job dispatched"
                );
                Ok(true)
            }
            PushOutcome::Rejected => {
                tracing::debug!(worker_id = worker.id, "Worker rejected job as busy");
                Ok(false)
            }
            PushOutcome::Failed(failure) => {
                tracing::debug!(worker_id = worker.id, %failure, "Job push failed");
                Ok(false)
            }
        }
    }
}
