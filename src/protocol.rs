//! Wire types shared between master and workers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::keyspace::PhoneNumber;

/// Availability signal a worker reports from its health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerSignal {
    Available,
    Busy,
}

/// Body of the worker's `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: WorkerSignal,
}

/// Payload pushed to a worker: search `start_range..=end_range` for
/// plaintexts matching any of `hashes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrackRequest {
    pub hashes: Vec<String>,
    pub start_range: PhoneNumber,
    pub end_range: PhoneNumber,
}

/// Per-digest outcome for a finished sub-range. On the wire this is either
/// the plaintext string or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CrackOutcome {
    Found(String),
    NotFound(bool),
}

impl CrackOutcome {
    pub fn not_found() -> Self {
        CrackOutcome::NotFound(false)
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            CrackOutcome::Found(password) => Some(password),
            CrackOutcome::NotFound(_) => None,
        }
    }
}

/// Result set a worker reports for one completed sub-range, keyed by digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrackResult {
    pub range_start: PhoneNumber,
    pub range_end: PhoneNumber,
    pub results: HashMap<String, CrackOutcome>,
}

/// Body of the worker's `GET /status/{digest}/{start}/{end}` response.
///
/// `status` is left as a raw string: a value the master does not recognize
/// is a protocol mismatch, handled defensively by the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrackStatus {
    pub status: String,
    #[serde(default)]
    pub hashes: HashMap<String, CrackOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crack_outcome_accepts_string_or_false() {
        let json = r#"{
            "range_start": "050-0000000",
            "range_end": "050-0000099",
            "results": {
                "519595c185061cd0709ea7d63cc99674": "050-1234567",
                "d41d8cd98f00b204e9800998ecf8427e": false
            }
        }"#;
        let result: CrackResult = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.results["519595c185061cd0709ea7d63cc99674"].password(),
            Some("050-1234567")
        );
        assert_eq!(
            result.results["d41d8cd98f00b204e9800998ecf8427e"].password(),
            None
        );
    }

    #[test]
    fn not_found_serializes_as_false() {
        let json = serde_json::to_string(&CrackOutcome::not_found()).unwrap();
        assert_eq!(json, "false");
    }

    #[test]
    fn crack_request_uses_plain_range_strings() {
        let request = CrackRequest {
            hashes: vec!["abc".to_string()],
            start_range: "050-0000000".parse().unwrap(),
            end_range: "050-0000049".parse().unwrap(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["start_range"], "050-0000000");
        assert_eq!(json["end_range"], "050-0000049");
    }

    #[test]
    fn crack_status_defaults_to_empty_results() {
        let status: CrackStatus = serde_json::from_str(r#"{"status":"InProgress"}"#).unwrap();
        assert_eq!(status.status, "InProgress");
        assert!(status.hashes.is_empty());
    }
}
