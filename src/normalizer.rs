//! Record normalization
//!
//! This module canonicalizes raw customer records before encoding:
//! - The identifier column is removed (it carries no predictive signal)
//! - `TotalCharges` is coerced to a number; unparseable values become 0
//! - Numeric-looking text in the other numeric columns is parsed
//!
//! Normalization never fails. Categorical values pass through verbatim and
//! unknown categories are left for the aligner to discard.

use crate::schema::{ID_COLUMN, NUMERIC_COLUMNS, TOTAL_CHARGES};
use crate::types::{CustomerRecord, FieldValue};

/// Normalizer for raw customer records
pub struct Normalizer;

impl Normalizer {
    /// Normalize a record for inference
    pub fn normalize(record: CustomerRecord) -> CustomerRecord {
        Self::normalize_with_fill(record, 0.0)
    }

    /// Normalize a training table.
    ///
    /// Unparseable `TotalCharges` values are filled with the median of the
    /// parseable ones instead of zero.
    pub fn normalize_training(records: Vec<CustomerRecord>) -> Vec<CustomerRecord> {
        let mut parsed: Vec<f64> = records
            .iter()
            .filter_map(|r| r.get(TOTAL_CHARGES))
            .filter_map(coerce_number)
            .collect();
        let fill = median(&mut parsed).unwrap_or(0.0);

        records
            .into_iter()
            .map(|r| Self::normalize_with_fill(r, fill))
            .collect()
    }

    fn normalize_with_fill(mut record: CustomerRecord, fill: f64) -> CustomerRecord {
        record.remove(ID_COLUMN);

        for column in NUMERIC_COLUMNS {
            let Some(value) = record.get(column) else {
                continue;
            };
            if column == TOTAL_CHARGES {
                let number = coerce_number(value).unwrap_or(fill);
                record.insert(column, number);
            } else if let FieldValue::Text(_) = value {
                if let Some(number) = coerce_number(value) {
                    record.insert(column, number);
                }
            }
        }

        record
    }
}

/// Parse a field as a finite number; blanks and non-numeric text yield None
pub fn coerce_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) if n.is_finite() => Some(*n),
        FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identifier_removed() {
        let record = CustomerRecord::new()
            .with_field(ID_COLUMN, "7590-VHVEG")
            .with_field("gender", "Female");
        let normalized = Normalizer::normalize(record);
        assert!(!normalized.contains(ID_COLUMN));
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn test_blank_total_charges_becomes_zero() {
        let record = CustomerRecord::new().with_field(TOTAL_CHARGES, " ");
        let normalized = Normalizer::normalize(record);
        assert_eq!(normalized.get(TOTAL_CHARGES), Some(&FieldValue::Number(0.0)));
    }

    #[test]
    fn test_total_charges_variants() {
        for (raw, expected) in [
            (FieldValue::from("844.2"), 844.2),
            (FieldValue::from(" 29.85 "), 29.85),
            (FieldValue::from("n/a"), 0.0),
            (FieldValue::from("nan"), 0.0),
            (FieldValue::Missing, 0.0),
            (FieldValue::Number(12.5), 12.5),
        ] {
            let record = CustomerRecord::new().with_field(TOTAL_CHARGES, raw);
            let normalized = Normalizer::normalize(record);
            assert_eq!(normalized.get(TOTAL_CHARGES), Some(&FieldValue::Number(expected)));
        }
    }

    #[test]
    fn test_absent_total_charges_stays_absent() {
        let record = CustomerRecord::new().with_field("tenure", 3);
        let normalized = Normalizer::normalize(record);
        assert!(!normalized.contains(TOTAL_CHARGES));
    }

    #[test]
    fn test_numeric_text_parsed_categorical_untouched() {
        let record = CustomerRecord::new()
            .with_field("tenure", "12")
            .with_field("MonthlyCharges", "lots")
            .with_field("Contract", "One year");
        let normalized = Normalizer::normalize(record);
        assert_eq!(normalized.get("tenure"), Some(&FieldValue::Number(12.0)));
        assert_eq!(normalized.get("MonthlyCharges"), Some(&FieldValue::from("lots")));
        assert_eq!(normalized.get("Contract"), Some(&FieldValue::from("One year")));
    }

    #[test]
    fn test_training_fill_uses_median() {
        let records = vec![
            CustomerRecord::new().with_field(TOTAL_CHARGES, "10"),
            CustomerRecord::new().with_field(TOTAL_CHARGES, " "),
            CustomerRecord::new().with_field(TOTAL_CHARGES, 30.0),
            CustomerRecord::new().with_field(TOTAL_CHARGES, "20"),
        ];
        let normalized = Normalizer::normalize_training(records);
        let values: Vec<f64> = normalized
            .iter()
            .map(|r| r.get(TOTAL_CHARGES).and_then(FieldValue::as_number).unwrap())
            .collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0, 20.0]);
    }

    #[test]
    fn test_median_even_count() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut values), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}
