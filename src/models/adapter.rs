//! Model adapter
//!
//! Translates an aligned feature vector into the classifier call and the raw
//! output into a `PredictionResult`.

use super::{ChurnClassifier, ModelArtifact};
use crate::error::ChurnError;
use crate::types::{EncodedFeatureVector, PredictionLabel, PredictionResult};
use std::path::Path;
use tracing::info;

/// Uniform predict / predict-probability wrapper around a loaded classifier
pub struct ModelAdapter {
    classifier: Box<dyn ChurnClassifier>,
}

impl ModelAdapter {
    pub fn new(classifier: Box<dyn ChurnClassifier>) -> Self {
        Self { classifier }
    }

    /// Load a model artifact; failure is fatal to the caller
    pub fn load(path: &Path) -> Result<Self, ChurnError> {
        let classifier = ModelArtifact::load(path)?;
        info!(
            path = %path.display(),
            kind = classifier.kind(),
            features = classifier.feature_count(),
            "Model loaded"
        );
        Ok(Self::new(classifier))
    }

    pub fn classifier(&self) -> &dyn ChurnClassifier {
        self.classifier.as_ref()
    }

    pub fn kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn feature_count(&self) -> usize {
        self.classifier.feature_count()
    }

    /// Score one aligned vector.
    ///
    /// Probabilities are clamped to [0, 1] and renormalized so they sum to 1.
    /// The label is the more probable class after renormalization, with ties
    /// going to No Churn.
    pub fn predict(&self, vector: &EncodedFeatureVector) -> Result<PredictionResult, ChurnError> {
        let features = vector.as_slice();
        if features.len() != self.feature_count() {
            return Err(ChurnError::FeatureCount {
                expected: self.feature_count(),
                actual: features.len(),
            });
        }

        let (p0, p1) = self.classifier.score_probabilities(features)?;
        if !p0.is_finite() || !p1.is_finite() {
            return Err(ChurnError::InvalidArtifact(format!(
                "{} produced non-finite probabilities",
                self.kind()
            )));
        }

        let (p0, p1) = (p0.clamp(0.0, 1.0), p1.clamp(0.0, 1.0));
        let total = p0 + p1;
        let (no_churn_probability, churn_probability) = if total > 0.0 {
            (p0 / total, p1 / total)
        } else {
            (0.5, 0.5)
        };
        let class = u8::from(churn_probability > no_churn_probability);

        Ok(PredictionResult {
            label: PredictionLabel::from_class(class),
            churn_probability,
            no_churn_probability,
        })
    }
}
