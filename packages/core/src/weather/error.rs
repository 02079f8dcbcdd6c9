//! Error types for weather ingestion

use thiserror::Error;

/// Reasons a boundary timestamp is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Timestamp has no UTC offset: {value}")]
    MissingOffset { value: String },

    #[error("Unparseable timestamp: {value}")]
    Malformed { value: String },
}

/// Errors that abort ingestion of a whole result set.
///
/// Row-level problems never surface here; those rows are skipped and counted.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Result set is missing required column: {column}")]
    MissingColumn { column: String },
}

impl IngestError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn { column: column.into() }
    }
}
