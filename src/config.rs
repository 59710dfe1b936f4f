use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::keyspace::Keyspace;

/// What the dispatcher does when no available worker accepts a job.
///
/// `StopOnUnplaced` ends the whole pass so failing workers cannot starve the
/// oldest job, at the cost of head-of-line blocking. `SkipUnplaced` moves on
/// to the next scheduled job instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DispatchPolicy {
    #[default]
    StopOnUnplaced,
    SkipUnplaced,
}

#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Address the master API listens on.
    pub listen_addr: SocketAddr,
    /// Path of the SQLite database file.
    pub db_path: PathBuf,

    /// Cadence of the worker health-check loop.
    pub health_check_interval: Duration,
    /// Cadence of the periodic dispatch loop.
    pub dispatch_interval: Duration,
    /// Cadence of the in-flight job reconciliation loop.
    pub scan_interval: Duration,

    /// Consecutive failed probes before a worker is marked unavailable.
    pub failure_threshold: u32,
    /// Timeout for health probes and status queries.
    pub probe_timeout: Duration,
    /// Timeout for pushing a job payload to a worker.
    pub push_timeout: Duration,

    /// Candidates per job.
    pub passwords_per_job: u64,
    /// Search-order definition of the full keyspace.
    pub keyspace: Keyspace,
    pub dispatch_policy: DispatchPolicy,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000"
                .parse()
                .expect("default listen address is valid"),
            db_path: PathBuf::from("MasterCracker.db"),
            health_check_interval: Duration::from_secs(10),
            dispatch_interval: Duration::from_secs(30),
            scan_interval: Duration::from_secs(30),
            failure_threshold: 5,
            probe_timeout: Duration::from_secs(3),
            push_timeout: Duration::from_secs(5),
            passwords_per_job: 100_000,
            keyspace: Keyspace::priority(),
            dispatch_policy: DispatchPolicy::StopOnUnplaced,
        }
    }
}
