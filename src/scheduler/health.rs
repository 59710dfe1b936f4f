//! Periodic worker liveness probing.

use std::sync::Arc;

use crate::comms::{ProbeOutcome, WorkerClient};
use crate::error::Result;
use crate::model::{Worker, WorkerStatus};
use crate::protocol::WorkerSignal;
use crate::store::Store;

/// Probes every registered worker once per tick and reconciles the registry
/// with what the probe reports. A worker is only demoted after
/// `failure_threshold` consecutive failed probes, so one dropped packet
/// never costs a worker its jobs.
pub struct HealthMonitor {
    store: Arc<Store>,
    client: Arc<dyn WorkerClient>,
    failure_threshold: u32,
}

impl HealthMonitor {
    pub fn new(store: Arc<Store>, client: Arc<dyn WorkerClient>, failure_threshold: u32) -> Self {
        Self {
            store,
            client,
            failure_threshold,
        }
    }

    pub async fn tick(&self) -> Result<()> {
        for worker in self.store.all_workers()? {
            match self.client.probe_health(&worker.address()).await {
                ProbeOutcome::Reported(signal) => self.record_success(&worker, signal)?,
                ProbeOutcome::Failed(failure) => {
                    tracing::debug!(worker_id = worker.id, %failure, "Health probe failed");
                    if self
                        .store
                        .record_failed_probe(worker.id, self.failure_threshold)?
                    {
                        tracing::warn!(
                            worker_id = worker.id,
                            address = %worker.address(),
                            "Worker unresponsive, marked unavailable"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn record_success(&self, worker: &Worker, signal: WorkerSignal) -> Result<()> {
        match (worker.status, signal) {
            // The worker finished its job without us collecting the result
            // yet; the scanner will pick the result up.
            (WorkerStatus::Busy, WorkerSignal::Available) => {
                tracing::info!(worker_id = worker.id, "Busy worker reports idle");
                self.store.mark_worker_available(worker.id)
            }
            (WorkerStatus::Unavailable, _) => {
                tracing::info!(worker_id = worker.id, "Worker recovered");
                self.store.mark_worker_available(worker.id)
            }
            _ => self.store.reset_failed_checks(worker.id),
        }
    }
}
