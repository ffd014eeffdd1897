//! Standardization parameters
//!
//! Per-column (mean, scale) pairs fitted once on training data and frozen.
//! Inference always reuses the persisted statistics; recomputing them on
//! request data would shift the feature distribution the model was trained on.

use crate::error::ChurnError;
use crate::schema::SCALED_COLUMNS;
use crate::types::CustomerRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Mean and scale for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

impl ColumnScale {
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Frozen scaling parameters for the standardized numeric columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalingFile", into = "ScalingFile")]
pub struct ScalingParameters {
    columns: Vec<ColumnScale>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalingFile {
    columns: Vec<ColumnScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScalingFile> for ScalingParameters {
    type Error = ChurnError;

    fn try_from(file: ScalingFile) -> Result<Self, Self::Error> {
        let mut params = ScalingParameters::new(file.columns)?;
        params.created_at = file.created_at;
        Ok(params)
    }
}

impl From<ScalingParameters> for ScalingFile {
    fn from(params: ScalingParameters) -> Self {
        ScalingFile {
            columns: params.columns,
            created_at: params.created_at,
        }
    }
}

impl ScalingParameters {
    /// Build from explicit pairs.
    ///
    /// Every standardized column must appear exactly once with a finite mean
    /// and a finite, non-zero scale.
    pub fn new(columns: Vec<ColumnScale>) -> Result<Self, ChurnError> {
        for expected in SCALED_COLUMNS {
            let count = columns.iter().filter(|c| c.column == expected).count();
            if count != 1 {
                return Err(ChurnError::InvalidArtifact(format!(
                    "scaling parameters must list {expected:?} exactly once (found {count})"
                )));
            }
        }
        if let Some(extra) = columns.iter().find(|c| !SCALED_COLUMNS.contains(&c.column.as_str())) {
            return Err(ChurnError::InvalidArtifact(format!(
                "scaling parameters name unexpected column {:?}",
                extra.column
            )));
        }
        if let Some(bad) = columns
            .iter()
            .find(|c| !c.mean.is_finite() || !c.scale.is_finite() || c.scale == 0.0)
        {
            return Err(ChurnError::InvalidArtifact(format!(
                "column {:?} has unusable mean {} / scale {}",
                bad.column, bad.mean, bad.scale
            )));
        }
        Ok(Self {
            columns,
            created_at: None,
        })
    }

    /// Fit population mean and standard deviation on normalized training records.
    ///
    /// A zero standard deviation is stored as scale 1.0. Records without a
    /// numeric value for a column do not contribute to that column.
    pub fn fit(records: &[CustomerRecord]) -> Result<Self, ChurnError> {
        let mut columns = Vec::with_capacity(SCALED_COLUMNS.len());

        for column in SCALED_COLUMNS {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|r| r.get(column).and_then(|v| v.as_number()))
                .collect();

            if values.is_empty() {
                return Err(ChurnError::InvalidRecord(format!(
                    "no numeric values for {column:?} in training data"
                )));
            }

            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            let scale = if std > 0.0 { std } else { 1.0 };

            info!(column, mean, scale, samples = values.len(), "Fitted scaling parameters");

            columns.push(ColumnScale {
                column: column.to_string(),
                mean,
                scale,
            });
        }

        let mut params = Self::new(columns)?;
        params.created_at = Some(Utc::now());
        Ok(params)
    }

    pub fn columns(&self) -> &[ColumnScale] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&ColumnScale> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn load(path: &Path) -> Result<Self, ChurnError> {
        let json = fs::read_to_string(path).map_err(|e| ChurnError::ArtifactLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json).map_err(|e| ChurnError::ArtifactLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ChurnError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scale(column: &str, mean: f64, scale: f64) -> ColumnScale {
        ColumnScale {
            column: column.to_string(),
            mean,
            scale,
        }
    }

    fn record(tenure: f64, monthly: f64, total: f64) -> CustomerRecord {
        CustomerRecord::new()
            .with_field("tenure", tenure)
            .with_field("MonthlyCharges", monthly)
            .with_field("TotalCharges", total)
    }

    #[test]
    fn test_fit_population_statistics() {
        let records = vec![record(1.0, 20.0, 5.0), record(3.0, 40.0, 5.0)];
        let params = ScalingParameters::fit(&records).unwrap();

        assert_eq!(params.get("tenure"), Some(&scale("tenure", 2.0, 1.0)));
        assert_eq!(params.get("MonthlyCharges"), Some(&scale("MonthlyCharges", 30.0, 10.0)));
        // constant column keeps unit scale
        assert_eq!(params.get("TotalCharges"), Some(&scale("TotalCharges", 5.0, 1.0)));
        assert!(params.created_at().is_some());
    }

    #[test]
    fn test_fit_requires_values() {
        let records = vec![CustomerRecord::new().with_field("tenure", 1.0)];
        assert!(matches!(
            ScalingParameters::fit(&records),
            Err(ChurnError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_apply() {
        let s = scale("tenure", 32.0, 24.5);
        assert!((s.apply(56.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation() {
        let ok = vec![
            scale("tenure", 32.4, 24.6),
            scale("MonthlyCharges", 64.8, 30.1),
            scale("TotalCharges", 2279.7, 2266.6),
        ];
        assert!(ScalingParameters::new(ok.clone()).is_ok());

        let mut missing = ok.clone();
        missing.pop();
        assert!(ScalingParameters::new(missing).is_err());

        let mut zero = ok.clone();
        zero[0].scale = 0.0;
        assert!(ScalingParameters::new(zero).is_err());

        let mut extra = ok;
        extra.push(scale("SeniorCitizen", 0.16, 0.37));
        assert!(ScalingParameters::new(extra).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let params = ScalingParameters::fit(&[record(1.0, 20.0, 20.0), record(2.0, 30.0, 60.0)]).unwrap();
        let loaded = ScalingParameters::from_json(&params.to_json().unwrap()).unwrap();
        assert_eq!(loaded, params);
        assert!(ScalingParameters::from_json(r#"{"columns": []}"#).is_err());
    }
}
