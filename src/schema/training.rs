//! Frozen training schema
//!
//! The ordered list of encoded column names captured once at training time.
//! A trained model identifies features by position, so inference must produce
//! exactly these columns in exactly this order.

use crate::error::ChurnError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Immutable ordered list of encoded feature columns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaFile", into = "SchemaFile")]
pub struct TrainingSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    created_at: Option<DateTime<Utc>>,
}

/// On-disk form of the training schema
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaFile {
    columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<SchemaFile> for TrainingSchema {
    type Error = ChurnError;

    fn try_from(file: SchemaFile) -> Result<Self, Self::Error> {
        let mut schema = TrainingSchema::new(file.columns)?;
        schema.created_at = file.created_at;
        Ok(schema)
    }
}

impl From<TrainingSchema> for SchemaFile {
    fn from(schema: TrainingSchema) -> Self {
        SchemaFile {
            columns: schema.columns,
            created_at: schema.created_at,
        }
    }
}

impl PartialEq for TrainingSchema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl TrainingSchema {
    /// Build a schema from column names.
    ///
    /// An empty list, empty names and duplicates are rejected.
    pub fn new(columns: Vec<String>) -> Result<Self, ChurnError> {
        if columns.is_empty() {
            return Err(ChurnError::InvalidArtifact(
                "training schema has no columns".to_string(),
            ));
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if col.is_empty() {
                return Err(ChurnError::InvalidArtifact(format!(
                    "training schema column {i} has an empty name"
                )));
            }
            if index.insert(col.clone(), i).is_some() {
                return Err(ChurnError::InvalidArtifact(format!(
                    "training schema lists column {col:?} twice"
                )));
            }
        }
        Ok(Self {
            columns,
            index,
            created_at: None,
        })
    }

    /// Stamp the schema with its creation time
    pub fn created_now(mut self) -> Self {
        self.created_at = Some(Utc::now());
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
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

    /// Load a persisted schema; any failure is reported with the path
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
