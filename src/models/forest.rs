//! Random forest evaluator
//!
//! Trees use the flattened node-array layout common to tree exporters: node `i`
//! is a leaf when `children_left[i] == -1`, otherwise samples with
//! `x[feature[i]] <= threshold[i]` go left. Leaf `value` holds per-class
//! weights, either as `[a, b]` or in the per-output form `[[a, b]]`; the forest
//! probability is the mean of the normalized leaf values.
//!
//! Trees and forests are validated when built or deserialized, so a value of
//! either type can always be traversed.

use super::{check_feature_count, normalize_weights, ChurnClassifier};
use crate::error::ChurnError;
use serde::{Deserialize, Serialize};

const LEAF: i64 = -1;

/// One decision tree in flattened form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeArrays")]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<[f64; 2]>,
}

/// Leaf weights as exported, with or without the output axis
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NodeValue {
    Flat([f64; 2]),
    PerOutput(Vec<[f64; 2]>),
}

#[derive(Debug, Clone, Deserialize)]
struct TreeArrays {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<NodeValue>,
}

impl TryFrom<TreeArrays> for DecisionTree {
    type Error = ChurnError;

    fn try_from(arrays: TreeArrays) -> Result<Self, Self::Error> {
        let value = arrays
            .value
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                NodeValue::Flat(weights) => Ok(weights),
                NodeValue::PerOutput(outputs) => match outputs.as_slice() {
                    [weights] => Ok(*weights),
                    _ => Err(ChurnError::InvalidArtifact(format!(
                        "node {i} has {} outputs, expected 1",
                        outputs.len()
                    ))),
                },
            })
            .collect::<Result<Vec<_>, _>>()?;
        DecisionTree::new(
            arrays.children_left,
            arrays.children_right,
            arrays.feature,
            arrays.threshold,
            value,
        )
    }
}

impl DecisionTree {
    /// Build a tree from its node arrays.
    ///
    /// Child indices must be strictly greater than their parent, which rules
    /// out cycles and bounds traversal by the node count.
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<[f64; 2]>,
    ) -> Result<Self, ChurnError> {
        let n = children_left.len();
        if n == 0 {
            return Err(ChurnError::InvalidArtifact("decision tree has no nodes".to_string()));
        }
        if children_right.len() != n
            || feature.len() != n
            || threshold.len() != n
            || value.len() != n
        {
            return Err(ChurnError::InvalidArtifact(
                "decision tree node arrays differ in length".to_string(),
            ));
        }

        for i in 0..n {
            let (left, right) = (children_left[i], children_right[i]);
            if left == LEAF {
                if right != LEAF {
                    return Err(ChurnError::InvalidArtifact(format!(
                        "node {i} has only one child"
                    )));
                }
                let [a, b] = value[i];
                if !(a.is_finite() && b.is_finite() && a >= 0.0 && b >= 0.0 && a + b > 0.0) {
                    return Err(ChurnError::InvalidArtifact(format!(
                        "leaf {i} has unusable class weights"
                    )));
                }
                continue;
            }

            for child in [left, right] {
                if child <= i as i64 || child >= n as i64 {
                    return Err(ChurnError::InvalidArtifact(format!(
                        "node {i} links to invalid child {child}"
                    )));
                }
            }
            if feature[i] < 0 {
                return Err(ChurnError::InvalidArtifact(format!(
                    "node {i} splits on negative feature {}",
                    feature[i]
                )));
            }
            if !threshold[i].is_finite() {
                return Err(ChurnError::InvalidArtifact(format!(
                    "node {i} has a non-finite threshold"
                )));
            }
        }

        Ok(Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
        })
    }

    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    /// Widest feature vector any split reads, 0 for a single leaf
    pub fn required_features(&self) -> usize {
        self.split_features().map(|f| f + 1).max().unwrap_or(0)
    }

    fn split_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.children_left
            .iter()
            .zip(&self.feature)
            .filter(|(&left, _)| left != LEAF)
            .map(|(_, &feature)| feature as usize)
    }

    /// Normalized class distribution of the leaf reached by `features`.
    ///
    /// Callers pass at least `required_features()` values.
    fn leaf_distribution(&self, features: &[f64]) -> (f64, f64) {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = features[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let [a, b] = self.value[node];
        let total = a + b;
        (a / total, b / total)
    }
}

/// Ensemble of decision trees averaged by probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForestArrays")]
pub struct RandomForestModel {
    n_features: usize,
    trees: Vec<DecisionTree>,
    /// Importances computed by the exporter, if it provided them
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_importances: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ForestArrays {
    n_features: usize,
    trees: Vec<DecisionTree>,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
}

impl TryFrom<ForestArrays> for RandomForestModel {
    type Error = ChurnError;

    fn try_from(arrays: ForestArrays) -> Result<Self, Self::Error> {
        RandomForestModel::new(arrays.n_features, arrays.trees, arrays.feature_importances)
    }
}

impl RandomForestModel {
    /// Build a forest over `n_features` inputs; every split must read a feature in range
    pub fn new(
        n_features: usize,
        trees: Vec<DecisionTree>,
        feature_importances: Option<Vec<f64>>,
    ) -> Result<Self, ChurnError> {
        if n_features == 0 {
            return Err(ChurnError::InvalidArtifact("random forest has zero features".to_string()));
        }
        if trees.is_empty() {
            return Err(ChurnError::InvalidArtifact("random forest has no trees".to_string()));
        }
        for (i, tree) in trees.iter().enumerate() {
            let required = tree.required_features();
            if required > n_features {
                return Err(ChurnError::InvalidArtifact(format!(
                    "tree {i} splits on feature {}, model has {n_features}",
                    required - 1
                )));
            }
        }
        if let Some(importances) = &feature_importances {
            if importances.len() != n_features {
                return Err(ChurnError::InvalidArtifact(format!(
                    "random forest lists {} importances for {n_features} features",
                    importances.len()
                )));
            }
        }
        Ok(Self {
            n_features,
            trees,
            feature_importances,
        })
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl ChurnClassifier for RandomForestModel {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn feature_count(&self) -> usize {
        self.n_features
    }

    fn score_probabilities(&self, features: &[f64]) -> Result<(f64, f64), ChurnError> {
        check_feature_count(self.n_features, features)?;
        let (sum0, sum1) = self
            .trees
            .iter()
            .map(|t| t.leaf_distribution(features))
            .fold((0.0, 0.0), |(a0, a1), (p0, p1)| (a0 + p0, a1 + p1));
        let n = self.trees.len() as f64;
        Ok((sum0 / n, sum1 / n))
    }

    /// Exported importances, or the share of splits made on each feature
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if let Some(importances) = &self.feature_importances {
            return normalize_weights(importances.clone());
        }
        let mut counts = vec![0.0; self.n_features];
        for feature in self.trees.iter().flat_map(DecisionTree::split_features) {
            counts[feature] += 1.0;
        }
        normalize_weights(counts)
    }
}
