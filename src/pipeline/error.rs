//! Error types for the activity-recognition pipeline.
//!
//! Every variant is fatal for the current run. The binary wraps these in
//! `anyhow` at the boundary; library callers can match on the variant.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file unreadable or malformed.
    #[error("Failed to ingest {}: {reason}", path.display())]
    Ingestion { path: PathBuf, reason: String },

    /// A value does not parse into its column's semantic type.
    #[error("Column '{column}' row {row}: cannot parse '{value}' as {expected}")]
    TypeCoercion {
        column: String,
        /// 1-based data row (header excluded)
        row: usize,
        value: String,
        expected: String,
    },

    /// A table handed to a fitted recipe lacks a predictor it requires.
    #[error("Schema mismatch on column '{column}': {reason}")]
    SchemaMismatch { column: String, reason: String },

    /// A cross-validation fold cannot produce a ranking metric for some class.
    #[error(
        "Fold {fold} is degenerate for class '{class}': {positives} positive(s), {negatives} negative(s) in the held-out rows"
    )]
    DegenerateFold {
        fold: usize,
        class: String,
        positives: usize,
        negatives: usize,
    },

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The grid search ran past its deadline.
    #[error("Search deadline of {limit_secs}s exceeded after {completed} of {total} model fits")]
    DeadlineExceeded {
        limit_secs: u64,
        completed: usize,
        total: usize,
    },

    /// Model fitting or prediction failed.
    #[error("Model error: {0}")]
    Model(String),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn ingestion(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn schema_mismatch(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
