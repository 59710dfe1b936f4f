//! Master service that orchestrates all components.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::comms::{HttpWorkerClient, WorkerClient};
use crate::config::MasterConfig;
use crate::error::{MasterError, Result};
use crate::model::{HashReport, Worker};
use crate::protocol::CrackResult;
use crate::scheduler::{
    ApplyReport, HealthMonitor, JobDispatcher, ProgressScanner, ResultAggregator,
};
use crate::store::Store;

/// Outcome of a hash submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitSummary {
    /// Digests not seen before.
    pub hashes_added: u64,
    /// Jobs created across all newly partitioned hashes.
    pub jobs_created: u64,
}

/// The coordinator. Owns the store and the scheduling components; the HTTP
/// API and the periodic loops both drive it through `Arc<Master>`.
pub struct Master {
    config: MasterConfig,
    store: Arc<Store>,
    client: Arc<dyn WorkerClient>,
    health: HealthMonitor,
    dispatcher: JobDispatcher,
    scanner: ProgressScanner,
    aggregator: ResultAggregator,
}

impl Master {
    pub fn new(config: MasterConfig) -> Result<Self> {
        let store = Arc::new(Store::open(&config.db_path)?);
        let client: Arc<dyn WorkerClient> = Arc::new(HttpWorkerClient::new(
            config.probe_timeout,
            config.push_timeout,
        ));
        Ok(Self::with_parts(config, store, client))
    }

    /// Builds a master over an existing store and worker client. This is the
    /// seam the tests use to substitute a scripted fleet.
    pub fn with_parts(
        config: MasterConfig,
        store: Arc<Store>,
        client: Arc<dyn WorkerClient>,
    ) -> Self {
        let health = HealthMonitor::new(
            Arc::clone(&store),
            Arc::clone(&client),
            config.failure_threshold,
        );
        let dispatcher = JobDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&client),
            config.dispatch_policy,
        );
        let scanner = ProgressScanner::new(
            Arc::clone(&store),
            Arc::clone(&client),
            config.failure_threshold,
        );
        let aggregator = ResultAggregator::new(Arc::clone(&store));
        Self {
            config,
            store,
            client,
            health,
            dispatcher,
            scanner,
            aggregator,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Registers a worker after confirming it answers health probes.
    /// A worker that cannot be reached at registration time would only sit
    /// in the registry accumulating failed checks.
    pub async fn register_worker(&self, ip: IpAddr, port: u16) -> Result<i64> {
        let ip = ip.to_string();
        let address = format!("{ip}:{port}");
        if self.store.worker_exists(&ip, port)? {
            return Err(MasterError::DuplicateWorker(address));
        }
        if !self.client.probe_health(&address).await.is_reachable() {
            return Err(MasterError::WorkerUnreachable(address));
        }
        let id = self.store.register_worker(&ip, port)?;
        tracing::info!(worker_id = id, %address, "Worker registered");
        Ok(id)
    }

    pub fn list_workers(&self) -> Result<Vec<Worker>> {
        self.store.all_workers()
    }

    /// Accepts digests to crack, partitions the keyspace into jobs for each
    /// new hash, and kicks off a dispatch pass in the background.
    pub async fn submit_hashes(self: &Arc<Self>, digests: Vec<String>) -> Result<SubmitSummary> {
        let hashes_added = self.store.add_digests(&digests)?;
        let jobs_created = self.create_job_assignments()?;
        tracing::info!(hashes_added, jobs_created, "Hashes submitted");

        let master = Arc::clone(self);
        tokio::spawn(async move {
            master.dispatch_now().await;
        });

        Ok(SubmitSummary {
            hashes_added,
            jobs_created,
        })
    }

    /// Partitions every hash still waiting for jobs. One hash failing does
    /// not block the rest; its transaction rolls back and it stays
    /// `Scheduled` for the next attempt.
    fn create_job_assignments(&self) -> Result<u64> {
        let mut total = 0;
        for hash in self.store.scheduled_hashes()? {
            let ranges = self
                .config
                .keyspace
                .partition(self.config.passwords_per_job);
            match self.store.create_jobs_for_hash(hash.id, ranges) {
                Ok(created) => {
                    if created > 0 {
                        tracing::info!(digest = %hash.digest, jobs = created, "Hash partitioned");
                    }
                    total += created;
                }
                Err(e) => {
                    tracing::error!(
                        digest = %hash.digest,
                        error = %e,
                        "Job creation failed, hash stays scheduled"
                    );
                }
            }
        }
        Ok(total)
    }

    /// Applies a worker-pushed crack result. Completed jobs free a worker,
    /// so a pass is dispatched right away instead of waiting for the next
    /// periodic tick.
    pub async fn report_result(self: &Arc<Self>, result: CrackResult) -> Result<ApplyReport> {
        let report = self.aggregator.apply(&result)?;
        if report.completed > 0 {
            let master = Arc::clone(self);
            tokio::spawn(async move {
                master.dispatch_now().await;
            });
        }
        Ok(report)
    }

    pub fn hash_reports(&self) -> Result<Vec<HashReport>> {
        self.store.hash_reports()
    }

    async fn dispatch_now(&self) {
        if let Err(e) = self.dispatcher.dispatch_pass().await {
            tracing::error!(error = %e, "Dispatch pass failed");
        }
    }

    /// Runs the master: spawns the three periodic loops and serves the HTTP
    /// API until the shutdown token fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let health_master = Arc::clone(&self);
        let health_token = shutdown.clone();
        tokio::spawn(async move {
            health_master
                .health_loop(health_master.config.health_check_interval, health_token)
                .await;
        });

        let dispatch_master = Arc::clone(&self);
        let dispatch_token = shutdown.clone();
        tokio::spawn(async move {
            dispatch_master
                .dispatch_loop(dispatch_master.config.dispatch_interval, dispatch_token)
                .await;
        });

        let scan_master = Arc::clone(&self);
        let scan_token = shutdown.clone();
        tokio::spawn(async move {
            scan_master
                .scan_loop(scan_master.config.scan_interval, scan_token)
                .await;
        });

        let app = crate::api::router(Arc::clone(&self));
        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| MasterError::Internal(format!("bind {}: {e}", self.config.listen_addr)))?;
        tracing::info!(addr = %self.config.listen_addr, "Master listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| MasterError::Internal(format!("server error: {e}")))?;
        tracing::info!("Master shut down");
        Ok(())
    }

    async fn health_loop(&self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.health.tick().await {
                        tracing::error!(error = %e, "Health tick failed");
                    }
                }
            }
        }
    }

    async fn dispatch_loop(&self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.dispatch_now().await,
            }
        }
    }

    async fn scan_loop(&self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    match self.scanner.scan().await {
                        // Rescheduled jobs and freed workers both mean a
                        // pass can make progress immediately.
                        Ok(summary) if summary.completed > 0 || summary.rescheduled > 0 => {
                            tracing::info!(
                                completed = summary.completed,
                                rescheduled = summary.rescheduled,
                                "Scan reconciled jobs"
                            );
                            self.dispatch_now().await;
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Scan failed"),
                    }
                }
            }
        }
    }
}
