//! Soft-voting ensemble

use super::{check_feature_count, normalize_weights, ChurnClassifier};
use crate::error::ChurnError;

/// Weighted mean of member probabilities
pub struct SoftVotingModel {
    members: Vec<Box<dyn ChurnClassifier>>,
    weights: Vec<f64>,
    n_features: usize,
}

impl SoftVotingModel {
    /// Combine members; `weights` defaults to equal weighting.
    ///
    /// Members must agree on the feature count and weights must be
    /// non-negative with a positive sum.
    pub fn new(
        members: Vec<Box<dyn ChurnClassifier>>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, ChurnError> {
        let Some(first) = members.first() else {
            return Err(ChurnError::InvalidArtifact("soft voting ensemble has no members".to_string()));
        };
        let n_features = first.feature_count();
        if let Some(bad) = members.iter().find(|m| m.feature_count() != n_features) {
            return Err(ChurnError::InvalidArtifact(format!(
                "ensemble member {} expects {} features, first member expects {}",
                bad.kind(),
                bad.feature_count(),
                n_features
            )));
        }

        let weights = weights.unwrap_or_else(|| vec![1.0; members.len()]);
        if weights.len() != members.len() {
            return Err(ChurnError::InvalidArtifact(format!(
                "ensemble has {} members but {} weights",
                members.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ChurnError::InvalidArtifact(
                "ensemble weights must be finite and non-negative".to_string(),
            ));
        }
        let weights = normalize_weights(weights).ok_or_else(|| {
            ChurnError::InvalidArtifact("ensemble weights sum to zero".to_string())
        })?;

        Ok(Self {
            members,
            weights,
            n_features,
        })
    }

    pub fn members(&self) -> impl Iterator<Item = (&dyn ChurnClassifier, f64)> {
        self.members
            .iter()
            .map(|m| &**m)
            .zip(self.weights.iter().copied())
    }
}

impl ChurnClassifier for SoftVotingModel {
    fn kind(&self) -> &'static str {
        "soft_voting"
    }

    fn feature_count(&self) -> usize {
        self.n_features
    }

    fn score_probabilities(&self, features: &[f64]) -> Result<(f64, f64), ChurnError> {
        check_feature_count(self.n_features, features)?;
        let mut p0 = 0.0;
        let mut p1 = 0.0;
        for (member, weight) in self.members() {
            let (m0, m1) = member.score_probabilities(features)?;
            p0 += weight * m0;
            p1 += weight * m1;
        }
        Ok((p0, p1))
    }

    /// Weighted mean over the members that expose importances
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let mut combined = vec![0.0; self.n_features];
        let mut any = false;
        for (member, weight) in self.members() {
            if let Some(importances) = member.feature_importances() {
                any = true;
                for (slot, value) in combined.iter_mut().zip(importances) {
                    *slot += weight * value;
                }
            }
        }
        if any {
            normalize_weights(combined)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogisticRegressionModel;

    fn lr(coef: f64, intercept: f64) -> Box<dyn ChurnClassifier> {
        Box::new(LogisticRegressionModel {
            coefficients: vec![coef],
            intercept,
        })
    }

    #[test]
    fn test_equal_weights_average() {
        let model = SoftVotingModel::new(vec![lr(0.0, 0.0), lr(0.0, 100.0)], None).unwrap();
        let (p0, p1) = model.score_probabilities(&[1.0]).unwrap();
        assert!((p1 - 0.75).abs() < 1e-9);
        assert!((p0 + p1 - 1.0).abs() < 1e-12);
        assert_eq!(model.classify(&[1.0]).unwrap(), 1);
    }

    #[test]
    fn test_custom_weights() {
        let model =
            SoftVotingModel::new(vec![lr(0.0, -100.0), lr(0.0, 100.0)], Some(vec![3.0, 1.0])).unwrap();
        let (_, p1) = model.score_probabilities(&[0.0]).unwrap();
        assert!((p1 - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(SoftVotingModel::new(vec![], None).is_err());
        assert!(SoftVotingModel::new(vec![lr(1.0, 0.0)], Some(vec![1.0, 2.0])).is_err());
        assert!(SoftVotingModel::new(vec![lr(1.0, 0.0)], Some(vec![0.0])).is_err());
        assert!(SoftVotingModel::new(vec![lr(1.0, 0.0)], Some(vec![-1.0])).is_err());

        let wide: Box<dyn ChurnClassifier> = Box::new(LogisticRegressionModel {
            coefficients: vec![1.0, 1.0],
            intercept: 0.0,
        });
        assert!(SoftVotingModel::new(vec![lr(1.0, 0.0), wide], None).is_err());
    }

    #[test]
    fn test_importances_combined() {
        let a: Box<dyn ChurnClassifier> = Box::new(LogisticRegressionModel {
            coefficients: vec![1.0, 0.0],
            intercept: 0.0,
        });
        let b: Box<dyn ChurnClassifier> = Box::new(LogisticRegressionModel {
            coefficients: vec![0.0, 1.0],
            intercept: 0.0,
        });
        let model = SoftVotingModel::new(vec![a, b], Some(vec![3.0, 1.0])).unwrap();
        assert_eq!(model.feature_importances(), Some(vec![0.75, 0.25]));
    }
}
