//! Feature importance reporting

use crate::error::ChurnError;
use crate::models::ModelAdapter;
use crate::schema::{is_scaled_column, TrainingSchema};
use serde::{Deserialize, Serialize};

/// One schema column with its importance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    pub column: String,
    pub importance: f64,
}

/// Schema columns ranked by model importance, most important first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    ranked: Vec<RankedFeature>,
}

impl FeatureImportance {
    /// Pair importances with schema columns and sort descending.
    ///
    /// Equal importances keep schema order.
    pub fn rank(schema: &TrainingSchema, importances: &[f64]) -> Result<Self, ChurnError> {
        if importances.len() != schema.len() {
            return Err(ChurnError::FeatureCount {
                expected: schema.len(),
                actual: importances.len(),
            });
        }
        let mut ranked: Vec<RankedFeature> = schema
            .columns()
            .iter()
            .zip(importances)
            .map(|(column, &importance)| RankedFeature {
                column: column.clone(),
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Ok(Self { ranked })
    }

    /// Rank the importances a loaded model exposes
    pub fn from_model(model: &ModelAdapter, schema: &TrainingSchema) -> Result<Self, ChurnError> {
        let importances = model.classifier().feature_importances().ok_or_else(|| {
            ChurnError::InvalidArtifact(format!(
                "{} model exposes no feature importances",
                model.kind()
            ))
        })?;
        Self::rank(schema, &importances)
    }

    pub fn ranked(&self) -> &[RankedFeature] {
        &self.ranked
    }

    pub fn top(&self, n: usize) -> &[RankedFeature] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// Share of total importance held by the standardized numeric columns
    pub fn numeric_share(&self) -> f64 {
        self.share(is_scaled_column)
    }

    /// Share held by everything else, indicator columns included
    pub fn categorical_share(&self) -> f64 {
        self.share(|column| !is_scaled_column(column))
    }

    fn share(&self, include: impl Fn(&str) -> bool) -> f64 {
        let total: f64 = self.ranked.iter().map(|f| f.importance).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let part: f64 = self
            .ranked
            .iter()
            .filter(|f| include(f.column.as_str()))
            .map(|f| f.importance)
            .sum();
        part / total
    }
}
