//! Reconciliation scanning of in-flight jobs.

use std::sync::Arc;

use crate::comms::{StatusOutcome, WorkerClient};
use crate::error::Result;
use crate::model::{JobStatus, WorkerStatus};
use crate::protocol::CrackResult;
use crate::scheduler::aggregator::ResultAggregator;
use crate::store::Store;

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Jobs collected as finished via their worker's status report.
    pub completed: usize,
    /// Jobs returned to the scheduled pool.
    pub rescheduled: usize,
}

/// Walks every in-flight job, asks its worker where the job stands, and
/// reconciles: finished work is harvested even if the worker's own result
/// report got lost, and jobs on dead or amnesiac workers go back to the
/// scheduled pool.
pub struct ProgressScanner {
    store: Arc<Store>,
    client: Arc<dyn WorkerClient>,
    aggregator: ResultAggregator,
    failure_threshold: u32,
}

impl ProgressScanner {
    pub fn new(
        store: Arc<Store>,
        client: Arc<dyn WorkerClient>,
        failure_threshold: u32,
    ) -> Self {
        let aggregator = ResultAggregator::new(Arc::clone(&store));
        Self {
            store,
            client,
            aggregator,
            failure_threshold,
        }
    }

    pub async fn scan(&self) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        for in_flight in self.store.in_progress_jobs()? {
            let job = in_flight.job;
            let Some(worker_id) = job.worker_id else {
                continue;
            };
            let Some(worker) = self.store.worker(worker_id)? else {
                continue;
            };

            match self
                .client
                .query_status(&worker.address(), &in_flight.digest, &job.range)
                .await
            {
                StatusOutcome::Reported(status) => match JobStatus::parse(&status.status) {
                    Some(JobStatus::Completed) => {
                        let result = CrackResult {
                            range_start: job.range.start,
                            range_end: job.range.end,
                            results: status.hashes,
                        };
                        let applied = self.aggregator.apply(&result)?;
                        summary.completed += applied.completed;
                        tracing::info!(job_id = job.id, "Collected finished job from scan");
                    }
                    Some(_) => {
                        // Still queued or running on the worker.
                    }
                    None => {
                        tracing::warn!(
                            job_id = job.id,
                            status = %status.status,
                            "Worker reported unrecognized job status, rescheduling"
                        );
                        if self.store.reschedule_job(job.id)? {
                            summary.rescheduled += 1;
                        }
                        self.store
                            .set_worker_status(worker_id, WorkerStatus::Available)?;
                    }
                },
                StatusOutcome::NotFound => {
                    // The worker restarted and forgot the job; it is alive,
                    // so it stays eligible for dispatch.
                    tracing::info!(
                        job_id = job.id,
                        worker_id,
                        "Worker has no record of job, rescheduling"
                    );
                    if self.store.reschedule_job(job.id)? {
                        summary.rescheduled += 1;
                    }
                    self.store
                        .set_worker_status(worker_id, WorkerStatus::Available)?;
                }
                StatusOutcome::Failed(failure) => {
                    tracing::debug!(job_id = job.id, worker_id, %failure, "Status query failed");
                    if self.store.reschedule_job(job.id)? {
                        summary.rescheduled += 1;
                    }
                    // Counts toward the same threshold the health monitor
                    // uses; repeated scan failures demote the worker too.
                    if self
                        .store
                        .record_failed_probe(worker_id, self.failure_threshold)?
                    {
                        tracing::warn!(worker_id, "Worker demoted during scan");
                    }
                }
            }
        }
        Ok(summary)
    }
}
