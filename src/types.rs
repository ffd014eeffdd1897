//! Core types for the churn-flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw customer records, encoded feature vectors, and prediction output.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single field value in a customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Render the value the way it appears in an indicator column name
    pub fn render(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Missing => String::new(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(value as f64)
    }
}

/// Raw customer record: an ordered mapping from field name to value.
///
/// Insertion order is kept for display, but nothing downstream depends on it.
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerRecord {
    fields: Vec<(String, FieldValue)>,
}

impl CustomerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Parse a single JSON object into a record
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl<K, V> FromIterator<(K, V)> for CustomerRecord
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = CustomerRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for CustomerRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CustomerRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = CustomerRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a flat JSON object of customer fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = CustomerRecord::new();
                while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Fixed-length model input, one value per training schema column
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector(Vec<f64>);

impl EncodedFeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Predicted class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionLabel {
    #[serde(rename = "No Churn")]
    NoChurn,
    #[serde(rename = "Churn")]
    Churn,
}

impl PredictionLabel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            PredictionLabel::Churn
        } else {
            PredictionLabel::NoChurn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Churn => "Churn",
            PredictionLabel::NoChurn => "No Churn",
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model output for one customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: PredictionLabel,
    pub churn_probability: f64,
    pub no_churn_probability: f64,
}

impl PredictionResult {
    pub fn risk_tier(&self, thresholds: &RiskThresholds) -> RiskTier {
        RiskTier::from_probability(self.churn_probability, thresholds)
    }
}

/// Display-only bucketing of churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// `> high` is high, `(medium, high]` is medium, everything else low
    pub fn from_probability(probability: f64, thresholds: &RiskThresholds) -> Self {
        if probability > thresholds.high {
            RiskTier::High
        } else if probability > thresholds.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Configurable risk tier boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.5,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.medium) || !(0.0..=1.0).contains(&self.high) {
            return Err("risk thresholds must lie in [0, 1]".to_string());
        }
        if self.medium > self.high {
            return Err(format!(
                "medium threshold {} exceeds high threshold {}",
                self.medium, self.high
            ));
        }
        Ok(())
    }
}

/// One row of batch output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    #[serde(rename = "customerID")]
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub result: PredictionResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = CustomerRecord::new()
            .with_field("gender", "Female")
            .with_field("tenure", 12);
        record.insert("gender", "Male");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("gender"), Some(&FieldValue::Text("Male".to_string())));
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["gender", "tenure"]);
    }

    #[test]
    fn test_record_json_preserves_order() {
        let record = CustomerRecord::from_json(
            r#"{"tenure": 12, "gender": "Female", "TotalCharges": " ", "Partner": null}"#,
        )
        .unwrap();

        assert_eq!(
            record.field_names().collect::<Vec<_>>(),
            vec!["tenure", "gender", "TotalCharges", "Partner"]
        );
        assert_eq!(record.get("tenure"), Some(&FieldValue::Number(12.0)));
        assert_eq!(record.get("TotalCharges"), Some(&FieldValue::Text(" ".to_string())));
        assert_eq!(record.get("Partner"), Some(&FieldValue::Missing));

        let back = serde_json::to_string(&record).unwrap();
        assert_eq!(
            back,
            r#"{"tenure":12.0,"gender":"Female","TotalCharges":" ","Partner":null}"#
        );
    }

    #[test]
    fn test_record_rejects_non_object() {
        assert!(CustomerRecord::from_json("[1, 2]").is_err());
        assert!(CustomerRecord::from_json(r#"{"nested": {"a": 1}}"#).is_err());
    }

    #[test]
    fn test_risk_tier_boundaries() {
        let t = RiskThresholds::default();
        assert_eq!(RiskTier::from_probability(0.71, &t), RiskTier::High);
        assert_eq!(RiskTier::from_probability(0.7, &t), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.51, &t), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.5, &t), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.0, &t), RiskTier::Low);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(RiskThresholds::default().validate().is_ok());
        assert!(RiskThresholds { high: 0.4, medium: 0.6 }.validate().is_err());
        assert!(RiskThresholds { high: 1.2, medium: 0.5 }.validate().is_err());
    }

    #[test]
    fn test_prediction_serialization() {
        let row = BatchPrediction {
            customer_id: Some("7590-VHVEG".to_string()),
            result: PredictionResult {
                label: PredictionLabel::Churn,
                churn_probability: 0.75,
                no_churn_probability: 0.25,
            },
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["customerID"], "7590-VHVEG");
        assert_eq!(value["prediction"], "Churn");
        assert_eq!(value["churn_probability"], 0.75);
    }
}
