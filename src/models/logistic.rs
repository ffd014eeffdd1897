//! Logistic regression evaluator

use super::{check_feature_count, normalize_weights, ChurnClassifier};
use crate::error::ChurnError;
use serde::{Deserialize, Serialize};

/// Linear model: P(churn) = sigmoid(w · x + b)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegressionModel {
    pub fn validate(&self) -> Result<(), ChurnError> {
        if self.coefficients.is_empty() {
            return Err(ChurnError::InvalidArtifact(
                "logistic regression has no coefficients".to_string(),
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ChurnError::InvalidArtifact(
                "logistic regression has non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }

    pub fn decision_function(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl ChurnClassifier for LogisticRegressionModel {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn feature_count(&self) -> usize {
        self.coefficients.len()
    }

    fn score_probabilities(&self, features: &[f64]) -> Result<(f64, f64), ChurnError> {
        check_feature_count(self.feature_count(), features)?;
        let p1 = sigmoid(self.decision_function(features));
        Ok((1.0 - p1, p1))
    }

    /// Normalized coefficient magnitudes; meaningful because inputs are standardized
    fn feature_importances(&self) -> Option<Vec<f64>> {
        normalize_weights(self.coefficients.iter().map(|c| c.abs()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LogisticRegressionModel {
        LogisticRegressionModel {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
        }
    }

    #[test]
    fn test_probabilities() {
        let m = model();
        let (p0, p1) = m.score_probabilities(&[0.0, 0.5]).unwrap();
        assert!((p1 - 0.5).abs() < 1e-12);
        assert!((p0 + p1 - 1.0).abs() < 1e-12);

        let (_, high) = m.score_probabilities(&[3.0, 0.0]).unwrap();
        assert!(high > 0.99);
        assert_eq!(m.classify(&[3.0, 0.0]).unwrap(), 1);
        assert_eq!(m.classify(&[-3.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_tie_goes_to_no_churn() {
        assert_eq!(model().classify(&[0.0, 0.5]).unwrap(), 0);
    }

    #[test]
    fn test_extreme_inputs_stay_finite() {
        let m = model();
        let (p0, p1) = m.score_probabilities(&[-1e6, 0.0]).unwrap();
        assert_eq!((p0, p1), (1.0, 0.0));
        let (p0, p1) = m.score_probabilities(&[1e6, 0.0]).unwrap();
        assert_eq!((p0, p1), (0.0, 1.0));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            model().score_probabilities(&[1.0]),
            Err(ChurnError::FeatureCount { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_importances() {
        let imp = model().feature_importances().unwrap();
        assert!((imp[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((imp[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation() {
        assert!(model().validate().is_ok());
        let empty = LogisticRegressionModel { coefficients: vec![], intercept: 0.0 };
        assert!(empty.validate().is_err());
        let nan = LogisticRegressionModel { coefficients: vec![f64::NAN], intercept: 0.0 };
        assert!(nan.validate().is_err());
    }
}
