use thiserror::Error;

#[derive(Error, Debug)]
pub enum MasterError {
    #[error("Worker already registered at {0}")]
    DuplicateWorker(String),

    #[error("Worker at {0} failed its registration health check")]
    WorkerUnreachable(String),

    #[error("Worker not found: {0}")]
    WorkerNotFound(i64),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MasterError>;
