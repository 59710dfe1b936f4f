//! Master→worker protocol client.
//!
//! Every call is bounded by a short timeout and resolves to a closed
//! outcome type; network trouble is data for the health and reschedule
//! logic, never an error that propagates.

use std::time::Duration;

use async_trait::async_trait;

use crate::keyspace::SubRange;
use crate::protocol::{CrackRequest, CrackStatus, HealthResponse, WorkerSignal};

/// Why a worker call did not produce a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    Timeout,
    Connection,
    /// Reachable but spoke nonsense: unexpected status code or body.
    Protocol,
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeFailure::Timeout => f.write_str("timeout"),
            ProbeFailure::Connection => f.write_str("connection error"),
            ProbeFailure::Protocol => f.write_str("protocol error"),
        }
    }
}

/// Result of `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reported(WorkerSignal),
    Failed(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reported(_))
    }
}

/// Result of `POST /crack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    /// Worker is already running a job (conflict response).
    Rejected,
    Failed(ProbeFailure),
}

/// Result of `GET /status/{digest}/{start}/{end}`.
#[derive(Debug, Clone)]
pub enum StatusOutcome {
    Reported(CrackStatus),
    /// The worker has no record of this job (it restarted or lost it).
    NotFound,
    Failed(ProbeFailure),
}

/// Seam between the scheduling engine and the fleet. The scheduler loops
/// only ever talk to workers through this trait.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn probe_health(&self, address: &str) -> ProbeOutcome;
    async fn push_job(&self, address: &str, request: &CrackRequest) -> PushOutcome;
    async fn query_status(&self, address: &str, digest: &str, range: &SubRange) -> StatusOutcome;
}

/// Production client speaking plain HTTP/JSON to workers.
pub struct HttpWorkerClient {
    http: reqwest::Client,
    probe_timeout: Duration,
    push_timeout: Duration,
}

impl HttpWorkerClient {
    pub fn new(probe_timeout: Duration, push_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            probe_timeout,
            push_timeout,
        }
    }
}

fn classify(err: &reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::Timeout
    } else if err.is_connect() {
        ProbeFailure::Connection
    } else {
        ProbeFailure::Protocol
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn probe_health(&self, address: &str) -> ProbeOutcome {
        let url = format!("http://{address}/health");
        let response = match self.http.get(&url).timeout(self.probe_timeout).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Failed(classify(&e)),
        };
        if !response.status().is_success() {
            return ProbeOutcome::Failed(ProbeFailure::Protocol);
        }
        match response.json::<HealthResponse>().await {
            Ok(body) => ProbeOutcome::Reported(body.status),
            Err(_) => ProbeOutcome::Failed(ProbeFailure::Protocol),
        }
    }

    async fn push_job(&self, address: &str, request: &CrackRequest) -> PushOutcome {
        let url = format!("http://{address}/crack");
        match self
            .http
            .post(&url)
            .json(request)
            .timeout(self.push_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => PushOutcome::Accepted,
            Ok(response) if response.status() == reqwest::StatusCode::CONFLICT => {
                PushOutcome::Rejected
            }
            Ok(_) => PushOutcome::Failed(ProbeFailure::Protocol),
            Err(e) => PushOutcome::Failed(classify(&e)),
        }
    }

    async fn query_status(&self, address: &str, digest: &str, range: &SubRange) -> StatusOutcome {
        let url = format!(
            "http://{address}/status/{digest}/{}/{}",
            range.start, range.end
        );
        let response = match self.http.get(&url).timeout(self.probe_timeout).send().await {
            Ok(response) => response,
            Err(e) => return StatusOutcome::Failed(classify(&e)),
        };
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return StatusOutcome::NotFound;
        }
        if !response.status().is_success() {
            return StatusOutcome::Failed(ProbeFailure::Protocol);
        }
        match response.json::<CrackStatus>().await {
            Ok(body) => StatusOutcome::Reported(body),
            Err(_) => StatusOutcome::Failed(ProbeFailure::Protocol),
        }
    }
}
