//! Churn Flux - Inference core for telecom customer churn prediction
//!
//! Flux turns a raw customer record into a churn prediction through a
//! deterministic pipeline: normalization → feature encoding → column alignment
//! → model scoring.
//!
//! ## Modules
//!
//! - **Inference Pipeline**: Score single records or batches against frozen artifacts
//! - **Training Artifacts**: Fit scaling parameters and the training schema from a labeled table
//! - **Evaluation**: Classification metrics, model comparison and feature importance

pub mod aligner;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod importance;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod scaler;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{ArtifactPaths, ChurnConfig};
pub use error::ChurnError;
pub use models::{ChurnClassifier, ModelAdapter, ModelArtifact};
pub use pipeline::{
    encode_for_model, encode_for_model_strict, fit_preprocessing, predict, predict_batch, ArtifactBundle, ChurnPredictor,
    PredictionReport,
};
pub use scaler::ScalingParameters;
pub use schema::TrainingSchema;
pub use types::{
    BatchPrediction, CustomerRecord, EncodedFeatureVector, FieldValue, PredictionLabel,
    PredictionResult, RiskThresholds, RiskTier,
};

/// Library version reported in JSON predictions
pub const CHURN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for JSON predictions
pub const PRODUCER_NAME: &str = "churn-flux";
