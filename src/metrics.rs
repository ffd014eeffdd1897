//! Model evaluation
//!
//! Binary classification metrics with class 1 (churn) as the positive class.
//! Ratios with a zero denominator are reported as 0.

use crate::error::ChurnError;
use crate::models::ModelAdapter;
use crate::pipeline::{encode_for_model, encode_for_model_strict};
use crate::scaler::ScalingParameters;
use crate::schema::TrainingSchema;
use crate::types::{CustomerRecord, EncodedFeatureVector, PredictionLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Counts of each prediction outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: &[u8], predictions: &[u8]) -> Self {
        let mut matrix = Self::default();
        for (&actual, &predicted) in labels.iter().zip(predictions) {
            match (actual == 1, predicted == 1) {
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (true, true) => matrix.true_positive += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Summary metrics for one model on one labeled set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// ROC AUC; absent when only one class is present
    pub auc: Option<f64>,
    pub confusion: ConfusionMatrix,
}

impl ClassificationMetrics {
    /// Compute metrics from true labels, hard predictions and churn scores
    pub fn compute(labels: &[u8], predictions: &[u8], scores: &[f64]) -> Result<Self, ChurnError> {
        if labels.is_empty() {
            return Err(ChurnError::InvalidRecord("no rows to evaluate".to_string()));
        }
        if predictions.len() != labels.len() || scores.len() != labels.len() {
            return Err(ChurnError::InvalidRecord(format!(
                "{} labels but {} predictions and {} scores",
                labels.len(),
                predictions.len(),
                scores.len()
            )));
        }

        let confusion = ConfusionMatrix::from_predictions(labels, predictions);
        let tp = confusion.true_positive as f64;
        let accuracy = (confusion.true_positive + confusion.true_negative) as f64
            / confusion.total() as f64;
        let precision = ratio(tp, tp + confusion.false_positive as f64);
        let recall = ratio(tp, tp + confusion.false_negative as f64);
        let f1 = ratio(2.0 * precision * recall, precision + recall);

        Ok(Self {
            accuracy,
            precision,
            recall,
            f1,
            auc: roc_auc(labels, scores),
            confusion,
        })
    }
}

impl fmt::Display for ClassificationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.confusion;
        writeln!(f, "accuracy   {:.4}", self.accuracy)?;
        writeln!(f, "precision  {:.4}", self.precision)?;
        writeln!(f, "recall     {:.4}", self.recall)?;
        writeln!(f, "f1         {:.4}", self.f1)?;
        match self.auc {
            Some(auc) => writeln!(f, "auc        {auc:.4}")?,
            None => writeln!(f, "auc        n/a")?,
        }
        writeln!(
            f,
            "confusion  [[{} {}] [{} {}]]",
            m.true_negative, m.false_positive, m.false_negative, m.true_positive
        )
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
///
/// Tied scores share the average of their ranks. Returns `None` unless both
/// classes are present.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 || scores.len() != labels.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; the tie group spans start+1..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = average;
        }
        start = end;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Score pre-aligned vectors with one model
pub fn evaluate(
    model: &ModelAdapter,
    vectors: &[EncodedFeatureVector],
    labels: &[u8],
) -> Result<ClassificationMetrics, ChurnError> {
    let mut predictions = Vec::with_capacity(vectors.len());
    let mut scores = Vec::with_capacity(vectors.len());
    for vector in vectors {
        let result = model.predict(vector)?;
        predictions.push(u8::from(result.label == PredictionLabel::Churn));
        scores.push(result.churn_probability);
    }
    ClassificationMetrics::compute(labels, &predictions, &scores)
}

/// Metrics for one named model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub name: String,
    #[serde(flatten)]
    pub metrics: ClassificationMetrics,
}

/// Evaluate several models on the same records, one row per model in input order.
///
/// Records are encoded once and shared by every model. With `strict_scaling`
/// a record missing a scaled numeric column fails the whole evaluation.
pub fn compare_models(
    models: &[(String, ModelAdapter)],
    records: &[CustomerRecord],
    labels: &[u8],
    scaling: &ScalingParameters,
    schema: &TrainingSchema,
    strict_scaling: bool,
) -> Result<Vec<ModelComparison>, ChurnError> {
    let vectors = records
        .iter()
        .map(|r| {
            if strict_scaling {
                encode_for_model_strict(r.clone(), scaling, schema)
            } else {
                Ok(encode_for_model(r.clone(), scaling, schema))
            }
        })
        .collect::<Result<Vec<EncodedFeatureVector>, ChurnError>>()?;

    models
        .iter()
        .map(|(name, model)| {
            let metrics = evaluate(model, &vectors, labels)?;
            info!(
                model = %name,
                accuracy = metrics.accuracy,
                f1 = metrics.f1,
                auc = ?metrics.auc,
                "Evaluated model"
            );
            Ok(ModelComparison {
                name: name.clone(),
                metrics,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogisticRegressionModel;
    use crate::scaler::ColumnScale;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_confusion_matrix() {
        let labels = [1, 1, 1, 0, 0, 0, 0, 1];
        let predictions = [1, 1, 0, 0, 0, 1, 0, 1];
        let scores = [0.9, 0.8, 0.4, 0.1, 0.2, 0.7, 0.3, 0.6];

        let m = ClassificationMetrics::compute(&labels, &predictions, &scores).unwrap();

        assert_eq!(
            m.confusion,
            ConfusionMatrix {
                true_negative: 3,
                false_positive: 1,
                false_negative: 1,
                true_positive: 3,
            }
        );
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.precision, 0.75);
        assert_eq!(m.recall, 0.75);
        assert!((m.f1 - 0.75).abs() < 1e-12);
        // 14 of 16 positive/negative pairs are ordered correctly
        assert_eq!(m.auc, Some(14.0 / 16.0));
    }

    #[test]
    fn test_zero_division_reports_zero() {
        let m = ClassificationMetrics::compute(&[0, 1], &[0, 0], &[0.2, 0.4]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.auc, Some(1.0));
    }

    #[test]
    fn test_auc_ties_and_single_class() {
        assert_eq!(roc_auc(&[0, 1], &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]), Some(0.75));
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.9]), None);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(ClassificationMetrics::compute(&[0, 1], &[0], &[0.1, 0.2]).is_err());
        assert!(ClassificationMetrics::compute(&[], &[], &[]).is_err());
    }

    #[test]
    fn test_compare_models_in_input_order() {
        let scaling = ScalingParameters::new(vec![
            ColumnScale { column: "tenure".into(), mean: 24.0, scale: 12.0 },
            ColumnScale { column: "MonthlyCharges".into(), mean: 60.0, scale: 20.0 },
            ColumnScale { column: "TotalCharges".into(), mean: 1500.0, scale: 1000.0 },
        ])
        .unwrap();
        let schema =
            TrainingSchema::new(vec!["tenure".to_string(), "Contract_Two year".to_string()])
                .unwrap();

        let records = vec![
            CustomerRecord::new()
                .with_field("tenure", 1)
                .with_field("MonthlyCharges", 80.0)
                .with_field("TotalCharges", 80.0)
                .with_field("Contract", "Month-to-month"),
            CustomerRecord::new()
                .with_field("tenure", 60)
                .with_field("MonthlyCharges", 40.0)
                .with_field("TotalCharges", 2400.0)
                .with_field("Contract", "Two year"),
        ];
        let labels = [1, 0];

        let good = ModelAdapter::new(Box::new(LogisticRegressionModel {
            coefficients: vec![-2.0, -1.0],
            intercept: 0.0,
        }));
        let backwards = ModelAdapter::new(Box::new(LogisticRegressionModel {
            coefficients: vec![2.0, 1.0],
            intercept: 0.0,
        }));
        let models = vec![("tenure_aware".to_string(), good), ("backwards".to_string(), backwards)];

        let rows = compare_models(&models, &records, &labels, &scaling, &schema, false).unwrap();

        assert_eq!(
            rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["tenure_aware", "backwards"]
        );
        assert_eq!(rows[0].metrics.accuracy, 1.0);
        assert_eq!(rows[0].metrics.auc, Some(1.0));
        assert_eq!(rows[1].metrics.accuracy, 0.0);
        assert_eq!(rows[1].metrics.auc, Some(0.0));
    }

    #[test]
    fn test_compare_models_honors_strict_scaling() {
        let scaling = ScalingParameters::new(vec![
            ColumnScale { column: "tenure".into(), mean: 24.0, scale: 12.0 },
            ColumnScale { column: "MonthlyCharges".into(), mean: 60.0, scale: 20.0 },
            ColumnScale { column: "TotalCharges".into(), mean: 1500.0, scale: 1000.0 },
        ])
        .unwrap();
        let schema = TrainingSchema::new(vec!["tenure".to_string()]).unwrap();
        let records = vec![CustomerRecord::new().with_field("tenure", 12)];
        let models = vec![(
            "tenure_only".to_string(),
            ModelAdapter::new(Box::new(LogisticRegressionModel {
                coefficients: vec![-1.0],
                intercept: 0.0,
            })),
        )];

        let lenient = compare_models(&models, &records, &[1], &scaling, &schema, false).unwrap();
        assert_eq!(lenient.len(), 1);

        let err = compare_models(&models, &records, &[1], &scaling, &schema, true).unwrap_err();
        match err {
            ChurnError::IncompleteNumeric(missing) => {
                assert_eq!(missing, vec!["MonthlyCharges".to_string(), "TotalCharges".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_report() {
        let m = ClassificationMetrics::compute(&[1], &[1], &[0.9]).unwrap();
        let text = m.to_string();
        assert!(text.contains("accuracy   1.0000"));
        assert!(text.contains("auc        n/a"));
    }
}
