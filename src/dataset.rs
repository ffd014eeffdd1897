//! Tabular data loading and prediction export using Polars
//!
//! CSV columns keep the types Polars infers: all-numeric columns become
//! numbers, anything else stays text. Empty cells are missing values. A
//! column like `TotalCharges` with a blank entry therefore arrives as text and
//! is coerced later by the normalizer.

use crate::error::ChurnError;
use crate::schema::{ID_COLUMN, TARGET_COLUMN};
use crate::types::{BatchPrediction, CustomerRecord, FieldValue};
use polars::prelude::*;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Column headers of the batch prediction output
pub const OUTPUT_COLUMNS: [&str; 3] = [ID_COLUMN, "prediction", "churn_probability"];

/// Load a CSV file with a header row into records
pub fn read_records(path: &Path) -> Result<Vec<CustomerRecord>, ChurnError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset"
    );
    records_from_frame(&df)
}

/// Convert a data frame into records, one per row, keeping column order
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<CustomerRecord>, ChurnError> {
    let mut records = vec![CustomerRecord::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();

        if matches!(series.dtype(), DataType::String) {
            for (record, value) in records.iter_mut().zip(series.str()?.into_iter()) {
                record.insert(name.as_str(), value.map_or(FieldValue::Missing, FieldValue::from));
            }
        } else {
            let numbers = series.cast(&DataType::Float64)?;
            for (record, value) in records.iter_mut().zip(numbers.f64()?.into_iter()) {
                record.insert(name.as_str(), value.map_or(FieldValue::Missing, FieldValue::Number));
            }
        }
    }

    Ok(records)
}

/// Load a labeled CSV, splitting off the `Churn` column as 0/1 labels.
///
/// The returned records no longer contain the label column.
pub fn read_labeled(path: &Path) -> Result<(Vec<CustomerRecord>, Vec<u8>), ChurnError> {
    let records = read_records(path)?;
    split_labels(records)
}

/// Remove the `Churn` column from every record and parse it as a label
pub fn split_labels(
    mut records: Vec<CustomerRecord>,
) -> Result<(Vec<CustomerRecord>, Vec<u8>), ChurnError> {
    let labels = records
        .iter_mut()
        .enumerate()
        .map(|(i, record)| {
            let value = record.remove(TARGET_COLUMN).unwrap_or(FieldValue::Missing);
            parse_label(i + 1, &value)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((records, labels))
}

/// `Yes`/`No` (any case) or numeric 1/0; `row` is 1-based for messages
pub fn parse_label(row: usize, value: &FieldValue) -> Result<u8, ChurnError> {
    let label = match value {
        FieldValue::Number(n) if *n == 1.0 => Some(1),
        FieldValue::Number(n) if *n == 0.0 => Some(0),
        FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" => Some(1),
            "no" | "0" => Some(0),
            _ => None,
        },
        _ => None,
    };
    label.ok_or_else(|| ChurnError::InvalidLabel {
        row,
        value: value.render(),
    })
}

/// Write batch predictions as CSV: `customerID,prediction,churn_probability`.
///
/// Missing identifiers are written as empty fields.
pub fn write_predictions<W: Write>(writer: W, rows: &[BatchPrediction]) -> Result<(), ChurnError> {
    let ids: Vec<Option<String>> = rows.iter().map(|r| r.customer_id.clone()).collect();
    let labels: Vec<&str> = rows.iter().map(|r| r.result.label.as_str()).collect();
    let probabilities: Vec<f64> = rows.iter().map(|r| r.result.churn_probability).collect();

    let mut df = df!(
        OUTPUT_COLUMNS[0] => ids,
        OUTPUT_COLUMNS[1] => labels,
        OUTPUT_COLUMNS[2] => probabilities,
    )?;

    CsvWriter::new(writer).include_header(true).finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::types::{PredictionLabel, PredictionResult};
    use pretty_assertions::assert_eq;
    use std::fs;

    const TELCO_SAMPLE: &str = "\
customerID,gender,SeniorCitizen,tenure,Contract,MonthlyCharges,TotalCharges,Churn
7590-VHVEG,Female,0,1,Month-to-month,29.85,29.85,No
5575-GNVDE,Male,0,34,One year,56.95, ,No
3668-QPYBK,,1,2,Month-to-month,53.85,108.15,Yes
";

    fn write_sample(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("telco.csv");
        fs::write(&path, TELCO_SAMPLE).unwrap();
        path
    }

    #[test]
    fn test_read_records_infers_types() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_records(&write_sample(&dir)).unwrap();

        assert_eq!(records.len(), 3);
        let first = &records[0];
        assert_eq!(
            first.field_names().collect::<Vec<_>>(),
            vec![
                "customerID",
                "gender",
                "SeniorCitizen",
                "tenure",
                "Contract",
                "MonthlyCharges",
                "TotalCharges",
                "Churn"
            ]
        );
        assert_eq!(first.get("customerID"), Some(&FieldValue::from("7590-VHVEG")));
        assert_eq!(first.get("tenure"), Some(&FieldValue::Number(1.0)));
        assert_eq!(first.get("MonthlyCharges"), Some(&FieldValue::Number(29.85)));
        assert_eq!(records[2].get("gender"), Some(&FieldValue::Missing));
    }

    #[test]
    fn test_blank_total_charges_normalizes_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_records(&write_sample(&dir)).unwrap();

        let normalized: Vec<_> = records.into_iter().map(Normalizer::normalize).collect();
        let totals: Vec<_> = normalized
            .iter()
            .map(|r| r.get("TotalCharges").and_then(FieldValue::as_number))
            .collect();
        assert_eq!(totals, vec![Some(29.85), Some(0.0), Some(108.15)]);
    }

    #[test]
    fn test_read_labeled_splits_target() {
        let dir = tempfile::tempdir().unwrap();
        let (records, labels) = read_labeled(&write_sample(&dir)).unwrap();

        assert_eq!(labels, vec![0, 0, 1]);
        assert!(records.iter().all(|r| !r.contains(TARGET_COLUMN)));
    }

    #[test]
    fn test_invalid_label_names_row() {
        let records = vec![
            CustomerRecord::new().with_field(TARGET_COLUMN, "Yes"),
            CustomerRecord::new().with_field(TARGET_COLUMN, "Maybe"),
        ];
        let err = split_labels(records).unwrap_err();
        assert!(matches!(err, ChurnError::InvalidLabel { row: 2, ref value } if value == "Maybe"));

        assert!(split_labels(vec![CustomerRecord::new()]).is_err());
        assert_eq!(parse_label(1, &FieldValue::Number(1.0)).unwrap(), 1);
        assert_eq!(parse_label(1, &FieldValue::from("no")).unwrap(), 0);
    }

    #[test]
    fn test_prediction_csv_round_trip() {
        let rows = vec![
            BatchPrediction {
                customer_id: Some("7590-VHVEG".to_string()),
                result: PredictionResult {
                    label: PredictionLabel::Churn,
                    churn_probability: 0.75,
                    no_churn_probability: 0.25,
                },
            },
            BatchPrediction {
                customer_id: None,
                result: PredictionResult {
                    label: PredictionLabel::NoChurn,
                    churn_probability: 0.125,
                    no_churn_probability: 0.875,
                },
            },
        ];

        let mut buffer = Vec::new();
        write_predictions(&mut buffer, &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("customerID,prediction,churn_probability\n"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        fs::write(&path, &text).unwrap();
        let back = read_records(&path).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0].get(ID_COLUMN), Some(&FieldValue::from("7590-VHVEG")));
        assert_eq!(back[0].get("prediction"), Some(&FieldValue::from("Churn")));
        assert_eq!(back[0].get("churn_probability"), Some(&FieldValue::Number(0.75)));
        assert_eq!(back[1].get(ID_COLUMN), Some(&FieldValue::Missing));
        assert_eq!(back[1].get("prediction"), Some(&FieldValue::from("No Churn")));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_records(Path::new("/nonexistent/telco.csv")).is_err());
    }
}
