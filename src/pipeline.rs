//! Pipeline orchestration
//!
//! This module provides the public inference API. It composes the stages in
//! a fixed order:
//! 1. Normalizer - canonicalize the raw record
//! 2. FeatureEncoder - scale numeric columns and expand categoricals
//! 3. ColumnAligner - conform to the frozen training schema
//! 4. ModelAdapter - score the aligned vector
//!
//! Artifacts are always passed in explicitly, either as references to the free
//! functions or owned by a `ChurnPredictor`.

use crate::aligner::ColumnAligner;
use crate::config::{ArtifactPaths, ChurnConfig};
use crate::encoder::{FeatureEncoder, ScalingOutcome};
use crate::error::ChurnError;
use crate::models::ModelAdapter;
use crate::normalizer::Normalizer;
use crate::scaler::ScalingParameters;
use crate::schema::{TrainingSchema, ID_COLUMN};
use crate::types::{
    BatchPrediction, CustomerRecord, EncodedFeatureVector, PredictionResult, RiskThresholds,
    RiskTier,
};
use crate::{CHURN_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Normalize, encode and align one raw record.
///
/// The result always has exactly `schema.len()` values in schema order.
pub fn encode_for_model(
    raw: CustomerRecord,
    scaling: &ScalingParameters,
    schema: &TrainingSchema,
) -> EncodedFeatureVector {
    encode_stages(raw, scaling, schema).0
}

/// Like [`encode_for_model`], but a record missing a scaled numeric column is
/// rejected with `IncompleteNumeric` instead of passing through unscaled.
pub fn encode_for_model_strict(
    raw: CustomerRecord,
    scaling: &ScalingParameters,
    schema: &TrainingSchema,
) -> Result<EncodedFeatureVector, ChurnError> {
    match encode_stages(raw, scaling, schema) {
        (vector, ScalingOutcome::Scaled) => Ok(vector),
        (_, ScalingOutcome::Skipped { missing }) => Err(ChurnError::IncompleteNumeric(missing)),
    }
}

/// Predict churn for one raw record.
///
/// # Example
/// ```ignore
/// let record = CustomerRecord::from_json(r#"{"tenure": 12, "Contract": "One year"}"#)?;
/// let result = predict(record, &scaling, &schema, &model)?;
/// println!("{} ({:.1}%)", result.label, result.churn_probability * 100.0);
/// ```
pub fn predict(
    raw: CustomerRecord,
    scaling: &ScalingParameters,
    schema: &TrainingSchema,
    model: &ModelAdapter,
) -> Result<PredictionResult, ChurnError> {
    let vector = encode_for_model(raw, scaling, schema);
    model.predict(&vector)
}

/// Predict every record independently, preserving input order.
///
/// The `customerID` is captured before normalization removes it and is only
/// carried through for display.
pub fn predict_batch(
    records: Vec<CustomerRecord>,
    scaling: &ScalingParameters,
    schema: &TrainingSchema,
    model: &ModelAdapter,
) -> Result<Vec<BatchPrediction>, ChurnError> {
    records
        .into_iter()
        .map(|record| {
            let customer_id = customer_id(&record);
            let result = predict(record, scaling, schema, model)?;
            Ok(BatchPrediction { customer_id, result })
        })
        .collect()
}

/// Fit the scaling parameters and training schema on a labeled table
pub fn fit_preprocessing(
    records: Vec<CustomerRecord>,
) -> Result<(ScalingParameters, TrainingSchema), ChurnError> {
    if records.is_empty() {
        return Err(ChurnError::InvalidRecord("training table is empty".to_string()));
    }
    let normalized = Normalizer::normalize_training(records);
    let scaling = ScalingParameters::fit(&normalized)?;
    let schema = FeatureEncoder::fit_schema(&normalized)?;
    info!(
        rows = normalized.len(),
        columns = schema.len(),
        "Fitted preprocessing artifacts"
    );
    Ok((scaling, schema))
}

fn customer_id(record: &CustomerRecord) -> Option<String> {
    record
        .get(ID_COLUMN)
        .filter(|v| !v.is_missing())
        .map(|v| v.render())
}

fn encode_stages(
    raw: CustomerRecord,
    scaling: &ScalingParameters,
    schema: &TrainingSchema,
) -> (EncodedFeatureVector, ScalingOutcome) {
    let normalized = Normalizer::normalize(raw);
    let encoded = FeatureEncoder::new(scaling).encode(&normalized);
    let (vector, report) = ColumnAligner::align_with_report(&encoded, schema);
    if !report.is_exact() {
        debug!(
            filled = ?report.filled,
            dropped = ?report.dropped,
            "Aligned record to training schema"
        );
    }
    (vector, encoded.scaling().clone())
}

/// The three frozen training artifacts, loaded together
pub struct ArtifactBundle {
    pub model: ModelAdapter,
    pub scaling: ScalingParameters,
    pub schema: TrainingSchema,
}

impl ArtifactBundle {
    /// Bundle artifacts, checking the model and schema agree on width
    pub fn new(
        model: ModelAdapter,
        scaling: ScalingParameters,
        schema: TrainingSchema,
    ) -> Result<Self, ChurnError> {
        if model.feature_count() != schema.len() {
            return Err(ChurnError::FeatureCount {
                expected: model.feature_count(),
                actual: schema.len(),
            });
        }
        Ok(Self {
            model,
            scaling,
            schema,
        })
    }

    /// Load all three artifacts; any failure is fatal
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ChurnError> {
        let model = ModelAdapter::load(&paths.model)?;
        let scaling = ScalingParameters::load(&paths.scaling)?;
        let schema = TrainingSchema::load(&paths.schema)?;
        Self::new(model, scaling, schema)
    }
}

/// Service identity stamped on JSON predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
}

/// JSON form of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub risk_tier: RiskTier,
    /// Numeric columns that prevented scaling, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unscaled: Vec<String>,
    pub producer: Producer,
    pub computed_at: DateTime<Utc>,
}

/// Inference service holding loaded artifacts for reuse across calls.
///
/// Artifacts are immutable after construction, so a predictor can be shared
/// across threads by reference.
pub struct ChurnPredictor {
    artifacts: ArtifactBundle,
    thresholds: RiskThresholds,
    strict_scaling: bool,
    instance_id: Uuid,
}

impl ChurnPredictor {
    /// Create a predictor with default thresholds and lenient scaling
    pub fn new(artifacts: ArtifactBundle) -> Self {
        Self {
            artifacts,
            thresholds: RiskThresholds::default(),
            strict_scaling: false,
            instance_id: Uuid::new_v4(),
        }
    }

    /// Load artifacts and settings from a configuration
    pub fn from_config(config: &ChurnConfig) -> Result<Self, ChurnError> {
        config.validate()?;
        let artifacts = ArtifactBundle::load(&config.artifacts)?;
        Ok(Self::new(artifacts)
            .with_thresholds(config.risk_thresholds.clone())
            .with_strict_scaling(config.strict_scaling))
    }

    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Reject records missing a numeric column instead of skipping scaling
    pub fn with_strict_scaling(mut self, strict: bool) -> Self {
        self.strict_scaling = strict;
        self
    }

    pub fn artifacts(&self) -> &ArtifactBundle {
        &self.artifacts
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn risk_tier(&self, result: &PredictionResult) -> RiskTier {
        result.risk_tier(&self.thresholds)
    }

    pub fn predict(&self, raw: CustomerRecord) -> Result<PredictionResult, ChurnError> {
        self.run(raw).map(|(result, _)| result)
    }

    pub fn predict_batch(
        &self,
        records: Vec<CustomerRecord>,
    ) -> Result<Vec<BatchPrediction>, ChurnError> {
        records
            .into_iter()
            .map(|record| {
                let customer_id = customer_id(&record);
                let result = self.predict(record)?;
                Ok(BatchPrediction { customer_id, result })
            })
            .collect()
    }

    /// Predict from a JSON object and return a JSON report
    pub fn predict_json(&self, json: &str) -> Result<String, ChurnError> {
        let record = CustomerRecord::from_json(json)?;
        let report = self.report(record)?;
        Ok(serde_json::to_string(&report)?)
    }

    /// Predict and attach the risk tier and producer metadata
    pub fn report(&self, raw: CustomerRecord) -> Result<PredictionReport, ChurnError> {
        let (result, scaling) = self.run(raw)?;
        let unscaled = match scaling {
            ScalingOutcome::Scaled => Vec::new(),
            ScalingOutcome::Skipped { missing } => missing,
        };
        Ok(PredictionReport {
            risk_tier: self.risk_tier(&result),
            result,
            unscaled,
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: CHURN_VERSION.to_string(),
                instance_id: self.instance_id,
            },
            computed_at: Utc::now(),
        })
    }

    fn run(&self, raw: CustomerRecord) -> Result<(PredictionResult, ScalingOutcome), ChurnError> {
        let (vector, scaling) = encode_stages(raw, &self.artifacts.scaling, &self.artifacts.schema);
        if let ScalingOutcome::Skipped { missing } = &scaling {
            if self.strict_scaling {
                return Err(ChurnError::IncompleteNumeric(missing.clone()));
            }
        }
        let result = self.artifacts.model.predict(&vector)?;
        Ok((result, scaling))
    }
}
