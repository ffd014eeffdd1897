//! Pre-trained classifiers
//!
//! A trained model is an opaque capability: given a feature vector in training
//! schema order it classifies and scores probabilities. This module defines that
//! capability, evaluators for the persisted model kinds, and the adapter that
//! turns raw model output into a `PredictionResult`.

mod adapter;
mod artifact;
mod ensemble;
mod forest;
mod logistic;

pub use adapter::ModelAdapter;
pub use artifact::{ModelArtifact, SoftVotingArtifact};
pub use ensemble::SoftVotingModel;
pub use forest::{DecisionTree, RandomForestModel};
pub use logistic::LogisticRegressionModel;

use crate::error::ChurnError;

/// Trait for pre-trained binary churn classifiers
pub trait ChurnClassifier: Send + Sync {
    /// Short model kind name for logs and reports
    fn kind(&self) -> &'static str;

    /// Number of features the model was trained on
    fn feature_count(&self) -> usize;

    /// Probabilities of (no churn, churn)
    fn score_probabilities(&self, features: &[f64]) -> Result<(f64, f64), ChurnError>;

    /// Predicted class, 1 for churn. Ties go to class 0.
    fn classify(&self, features: &[f64]) -> Result<u8, ChurnError> {
        let (p0, p1) = self.score_probabilities(features)?;
        Ok(u8::from(p1 > p0))
    }

    /// Relative importance per feature, summing to 1, when the model exposes it
    fn feature_importances(&self) -> Option<Vec<f64>>;
}

pub(crate) fn check_feature_count(expected: usize, features: &[f64]) -> Result<(), ChurnError> {
    if features.len() != expected {
        return Err(ChurnError::FeatureCount {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Scale non-negative weights to sum to 1; None when they sum to zero
pub(crate) fn normalize_weights(weights: Vec<f64>) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        Some(weights.into_iter().map(|w| w / total).collect())
    } else {
        None
    }
}
