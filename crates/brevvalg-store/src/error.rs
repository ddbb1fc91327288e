use std::path::PathBuf;

use brevvalg_core::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported export format: {0} (expected .json or .csv)")]
    UnsupportedFormat(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}
