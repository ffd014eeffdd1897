//! Configuration
//!
//! Artifact locations and display thresholds, loadable from a JSON file. Every
//! field has a default so a partial (or absent) file is fine.

use crate::error::ChurnError;
use crate::types::RiskThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations of the three persisted training artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Trained classifier
    pub model: PathBuf,
    /// Frozen scaling parameters
    pub scaling: PathBuf,
    /// Frozen training schema (encoded column list)
    pub schema: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/model.json"),
            scaling: PathBuf::from("models/scaler.json"),
            schema: PathBuf::from("models/feature_columns.json"),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    pub artifacts: ArtifactPaths,
    pub risk_thresholds: RiskThresholds,
    /// Fail instead of warning when a record lacks a numeric column
    pub strict_scaling: bool,
}

impl ChurnConfig {
    pub fn from_json(json: &str) -> Result<Self, ChurnError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ChurnError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ChurnError> {
        let json = fs::read_to_string(path)
            .map_err(|e| ChurnError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ChurnError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ChurnError> {
        self.risk_thresholds.validate().map_err(ChurnError::Config)
    }
}
