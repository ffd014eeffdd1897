//! Persisted model artifacts
//!
//! Models are stored as JSON tagged by `kind`. Loading validates the whole
//! structure up front; a missing or corrupt artifact is a fatal error for the
//! caller, never retried.

use super::{ChurnClassifier, LogisticRegressionModel, RandomForestModel, SoftVotingModel};
use crate::error::ChurnError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serialized form of a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegressionModel),
    RandomForest(RandomForestModel),
    SoftVoting(SoftVotingArtifact),
}

/// Serialized soft-voting ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingArtifact {
    pub members: Vec<ModelArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read and validate an artifact file into a ready classifier
    pub fn load(path: &Path) -> Result<Box<dyn ChurnClassifier>, ChurnError> {
        let fail = |reason: String| ChurnError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };
        let json = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let artifact = Self::from_json(&json).map_err(|e| fail(e.to_string()))?;
        artifact.into_classifier().map_err(|e| fail(e.to_string()))
    }

    /// Validate and convert into a classifier.
    ///
    /// Forests are already checked when they are built or parsed.
    pub fn into_classifier(self) -> Result<Box<dyn ChurnClassifier>, ChurnError> {
        match self {
            ModelArtifact::LogisticRegression(model) => {
                model.validate()?;
                Ok(Box::new(model))
            }
            ModelArtifact::RandomForest(model) => Ok(Box::new(model)),
            ModelArtifact::SoftVoting(ensemble) => {
                let members = ensemble
                    .members
                    .into_iter()
                    .map(ModelArtifact::into_classifier)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(SoftVotingModel::new(members, ensemble.weights)?))
            }
        }
    }
}
