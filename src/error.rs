use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NumismaError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backup format not recognized: {0}")]
    Format(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl NumismaError {
    /// Whether this error came from the record store (quota, aborted
    /// transaction, unavailable database).
    pub fn is_storage(&self) -> bool {
        matches!(self, NumismaError::DuckDb(_))
    }
}

pub type Result<T> = std::result::Result<T, NumismaError>;
