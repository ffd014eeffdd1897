//! Column alignment
//!
//! Reconciles an encoded record against the frozen training schema. A trained
//! model reads features by position, so any missing, extra, or reordered
//! column would silently produce a wrong prediction rather than an error.
//! Alignment guarantees the output has exactly the schema's columns in the
//! schema's order.

use crate::encoder::EncodedRecord;
use crate::schema::TrainingSchema;
use crate::types::EncodedFeatureVector;
use std::collections::HashMap;

/// What alignment had to change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentReport {
    /// Schema columns absent from the encoded record, filled with 0
    pub filled: Vec<String>,
    /// Encoded columns not in the schema, discarded
    pub dropped: Vec<String>,
}

impl AlignmentReport {
    pub fn is_exact(&self) -> bool {
        self.filled.is_empty() && self.dropped.is_empty()
    }
}

/// Aligner for encoded records
pub struct ColumnAligner;

impl ColumnAligner {
    /// Produce a vector with one value per schema column, in schema order
    pub fn align(encoded: &EncodedRecord, schema: &TrainingSchema) -> EncodedFeatureVector {
        Self::align_with_report(encoded, schema).0
    }

    /// Align and report which columns were filled or dropped
    pub fn align_with_report(
        encoded: &EncodedRecord,
        schema: &TrainingSchema,
    ) -> (EncodedFeatureVector, AlignmentReport) {
        let lookup: HashMap<&str, f64> = encoded.iter().collect();
        let mut report = AlignmentReport::default();

        let values = schema
            .columns()
            .iter()
            .map(|column| match lookup.get(column.as_str()) {
                Some(v) => *v,
                None => {
                    report.filled.push(column.clone());
                    0.0
                }
            })
            .collect();

        report.dropped = encoded
            .columns()
            .filter(|c| !schema.contains(c))
            .map(str::to_string)
            .collect();

        (EncodedFeatureVector::new(values), report)
    }
}
