use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("row {row}: missing value for {column}")]
    MissingValue { row: usize, column: &'static str },

    #[error("row {row}: {column} is not a flag: {value:?}")]
    InvalidFlag {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: {column} has unsupported type {kind}")]
    UnsupportedValue {
        row: usize,
        column: &'static str,
        kind: String,
    },

    #[error("expected a JSON array of objects")]
    NotAnArray,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
