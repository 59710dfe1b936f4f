//! HTTP API of the master.

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::MasterError;
use crate::master::Master;
use crate::protocol::CrackResult;

#[derive(Deserialize)]
pub struct RegisterWorkerRequest {
    pub ip: IpAddr,
    pub port: u16,
}

#[derive(Serialize)]
struct RegisterWorkerResponse {
    worker_id: i64,
}

#[derive(Serialize)]
struct WorkerResponse {
    id: i64,
    address: String,
    status: String,
    last_seen: Option<String>,
    failed_checks: u32,
}

#[derive(Deserialize)]
pub struct SubmitHashesRequest {
    pub hashes: Vec<String>,
}

#[derive(Serialize)]
struct SubmitHashesResponse {
    hashes_added: u64,
    jobs_created: u64,
}

#[derive(Serialize)]
struct AcceptedResponse {
    completed: usize,
    cracked: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(err: MasterError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        MasterError::DuplicateWorker(_) => StatusCode::CONFLICT,
        MasterError::WorkerUnreachable(_) | MasterError::InvalidPhoneNumber(_) => {
            StatusCode::BAD_REQUEST
        }
        MasterError::WorkerNotFound(_) => StatusCode::NOT_FOUND,
        MasterError::Storage(_) | MasterError::Internal(_) => {
            tracing::error!(error = %err, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

pub fn router(master: Arc<Master>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/workers", post(register_worker_handler))
        .route("/workers", get(list_workers_handler))
        .route("/hashes", post(submit_hashes_handler))
        .route("/crack-result", post(crack_result_handler))
        .route("/hash-reports", get(hash_reports_handler))
        .layer(cors)
        .with_state(master)
}

async fn register_worker_handler(
    State(master): State<Arc<Master>>,
    Json(request): Json<RegisterWorkerRequest>,
) -> impl IntoResponse {
    if request.port == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "port must be non-zero".to_string(),
            }),
        )
            .into_response();
    }
    match master.register_worker(request.ip, request.port).await {
        Ok(worker_id) => (
            StatusCode::CREATED,
            Json(RegisterWorkerResponse { worker_id }),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn list_workers_handler(State(master): State<Arc<Master>>) -> impl IntoResponse {
    match master.list_workers() {
        Ok(workers) => {
            let workers: Vec<WorkerResponse> = workers
                .into_iter()
                .map(|w| WorkerResponse {
                    id: w.id,
                    address: w.address(),
                    status: w.status.to_string(),
                    last_seen: w.last_seen.map(|t| t.to_rfc3339()),
                    failed_checks: w.failed_checks,
                })
                .collect();
            Json(workers).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

async fn submit_hashes_handler(
    State(master): State<Arc<Master>>,
    Json(request): Json<SubmitHashesRequest>,
) -> impl IntoResponse {
    match master.submit_hashes(request.hashes).await {
        Ok(summary) => (
            StatusCode::ACCEPTED,
            Json(SubmitHashesResponse {
                hashes_added: summary.hashes_added,
                jobs_created: summary.jobs_created,
            }),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn crack_result_handler(
    State(master): State<Arc<Master>>,
    Json(result): Json<CrackResult>,
) -> impl IntoResponse {
    match master.report_result(result).await {
        Ok(report) => Json(AcceptedResponse {
            completed: report.completed,
            cracked: report.cracked,
        })
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn hash_reports_handler(State(master): State<Arc<Master>>) -> impl IntoResponse {
    match master.hash_reports() {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
