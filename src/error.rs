//! Error types for churn-flux

use thiserror::Error;

/// Errors that can occur while loading artifacts or computing predictions
#[derive(Debug, Error)]
pub enum ChurnError {
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Failed to load artifact from {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset error: {0}")]
    Dataset(#[from] polars::error::PolarsError),

    #[error("Feature vector has {actual} values, model expects {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Numeric columns missing or non-numeric, cannot scale: {}", .0.join(", "))]
    IncompleteNumeric(Vec<String>),

    #[error("Row {row}: unrecognized churn label {value:?}")]
    InvalidLabel { row: usize, value: String },

    #[error("Invalid customer record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
