//! Feature encoding
//!
//! This module turns normalized records into named numeric columns:
//! 1. The three numeric columns are standardized with the frozen parameters
//! 2. Text fields expand into `<column>_<value>` indicator columns
//!
//! Scaling runs strictly before expansion, while the numeric columns are still
//! identifiable by name. The encoder never looks at the training schema; its
//! output may have extra or missing columns, which the aligner reconciles.

use crate::error::ChurnError;
use crate::scaler::ScalingParameters;
use crate::schema::{TrainingSchema, ID_COLUMN, SCALED_COLUMNS, TARGET_COLUMN};
use crate::types::{CustomerRecord, FieldValue};
use std::collections::BTreeSet;
use tracing::warn;

/// Whether numeric standardization was applied to a record
#[derive(Debug, Clone, PartialEq)]
pub enum ScalingOutcome {
    Scaled,
    /// Scaling was skipped because these columns were absent or non-numeric
    Skipped { missing: Vec<String> },
}

/// Encoded record: named numeric columns in encounter order
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    values: Vec<(String, f64)>,
    scaling: ScalingOutcome,
}

impl EncodedRecord {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == column).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn scaling(&self) -> &ScalingOutcome {
        &self.scaling
    }
}

/// Name of the indicator column for a categorical value
pub fn indicator_name(column: &str, value: &str) -> String {
    format!("{column}_{value}")
}

/// Encoder bound to frozen scaling parameters
pub struct FeatureEncoder<'a> {
    scaling: &'a ScalingParameters,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(scaling: &'a ScalingParameters) -> Self {
        Self { scaling }
    }

    /// Encode one normalized record.
    ///
    /// Every text value yields an indicator, including the training reference
    /// category; that column is absent from the schema and gets dropped at
    /// alignment, which reproduces drop-first encoding for a single row.
    pub fn encode(&self, record: &CustomerRecord) -> EncodedRecord {
        let missing: Vec<String> = SCALED_COLUMNS
            .iter()
            .filter(|c| record.get(c).and_then(FieldValue::as_number).is_none())
            .map(|c| c.to_string())
            .collect();

        let scaling = if missing.is_empty() {
            ScalingOutcome::Scaled
        } else {
            warn!(
                missing = ?missing,
                "Numeric columns incomplete, leaving all numeric values unscaled"
            );
            ScalingOutcome::Skipped { missing }
        };

        let mut values = Vec::with_capacity(record.len());
        for (name, value) in record.iter() {
            match value {
                FieldValue::Number(n) => {
                    let n = match (&scaling, self.scaling.get(name)) {
                        (ScalingOutcome::Scaled, Some(params)) => params.apply(*n),
                        _ => *n,
                    };
                    values.push((name.to_string(), n));
                }
                FieldValue::Text(text) => values.push((indicator_name(name, text), 1.0)),
                FieldValue::Missing => {}
            }
        }

        EncodedRecord { values, scaling }
    }

    /// Build the training schema from a normalized training table.
    ///
    /// Numeric columns come first in first-seen order, followed by indicator
    /// columns per categorical column (first-seen order), each with its values
    /// sorted and the first one dropped as the reference category. A column is
    /// categorical when any row holds text for it. The identifier and target
    /// columns are excluded.
    pub fn fit_schema(records: &[CustomerRecord]) -> Result<TrainingSchema, ChurnError> {
        let mut order: Vec<&str> = Vec::new();
        for record in records {
            for name in record.field_names() {
                if name != ID_COLUMN && name != TARGET_COLUMN && !order.contains(&name) {
                    order.push(name);
                }
            }
        }

        let mut numeric = Vec::new();
        let mut indicators = Vec::new();

        for column in order {
            let is_categorical = records
                .iter()
                .any(|r| matches!(r.get(column), Some(FieldValue::Text(_))));

            if !is_categorical {
                numeric.push(column.to_string());
                continue;
            }

            let categories: BTreeSet<String> = records
                .iter()
                .filter_map(|r| r.get(column))
                .filter(|v| !v.is_missing())
                .map(FieldValue::render)
                .collect();

            indicators.extend(
                categories
                    .iter()
                    .skip(1)
                    .map(|value| indicator_name(column, value)),
            );
        }

        if numeric.is_empty() && indicators.is_empty() {
            return Err(ChurnError::InvalidRecord(
                "training data yields no feature columns".to_string(),
            ));
        }

        numeric.extend(indicators);
        Ok(TrainingSchema::new(numeric)?.created_now())
    }
}
