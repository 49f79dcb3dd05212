//! Error types for the starmart pipeline.
//!
//! Per-row data defects are never raised as errors: the transform engine
//! collects them in its issue log and the validation engine reports them in
//! the verdict. `EtlError` covers the conditions that abort a run instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the ETL pipeline.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A table or column was requested that the schema registry does not
    /// declare. Fatal; the registry is fixed at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A raw input file declared by the registry is absent.
    #[error("missing raw table '{table}' at {path}")]
    MissingTable { table: String, path: PathBuf },

    /// A table cannot be transformed at all, e.g. a required column is
    /// missing from the raw extract or a primary key column is wholly
    /// un-coercible.
    #[error("schema error in table '{table}': {message}")]
    Schema { table: String, message: String },

    /// A validation check could not be evaluated.
    #[error("check '{check}' failed to evaluate: {message}")]
    CheckEvaluation { check: String, message: String },

    /// The commit of a passing dataset could not be completed.
    #[error("commit failed: {0}")]
    Commit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EtlError {
    /// Creates a check evaluation error.
    pub fn check_evaluation(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CheckEvaluation {
            check: check.into(),
            message: message.into(),
        }
    }

    /// Creates a schema error for the given table.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, EtlError>;
