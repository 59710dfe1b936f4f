//! Scheduling engine: health probing, job dispatch, reconciliation
//! scanning and result aggregation. The master wires these into periodic
//! loops; each component exposes a single-pass entry point so tests can
//! drive them deterministically.

pub mod aggregator;
pub mod dispatcher;
pub mod health;
pub mod scanner;

pub use aggregator::{ApplyReport, ResultAggregator};
pub use dispatcher::JobDispatcher;
pub use health::HealthMonitor;
pub use scanner::{ProgressScanner, ScanSummary};
