use crate::error::{M3gpError, Result};
use polars::prelude::*;

pub struct DataValidator;

impl DataValidator {
    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(M3gpError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Check the frame has at least `min_columns` columns
    pub fn validate_minimum_columns(df: &DataFrame, min_columns: usize) -> Result<()> {
        if df.width() < min_columns {
            return Err(M3gpError::DataLoading(format!(
                "Insufficient columns: {}, minimum {} required",
                df.width(),
                min_columns
            )));
        }
        Ok(())
    }

    /// Report columns containing nulls (empty cells)
    pub fn check_nulls(df: &DataFrame) -> Vec<(String, usize)> {
        df.get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect()
    }

    /// Cast a column to f64, failing on the first empty or unparsable cell
    pub fn numeric_values(column: &Column) -> Result<Vec<f64>> {
        let casted = column.cast(&DataType::Float64)?;
        let values = casted.f64()?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    M3gpError::DataLoading(format!(
                        "Column '{}' row {}: missing or unparsable numeric value",
                        column.name(),
                        row
                    ))
                })
            })
            .collect()
    }

    /// Render a column as string labels, failing on empty cells
    pub fn label_values(column: &Column) -> Result<Vec<String>> {
        let casted = column.cast(&DataType::String)?;
        let values = casted.str()?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(label) if !label.trim().is_empty() => Ok(label.trim().to_string()),
                _ => Err(M3gpError::DataLoading(format!(
                    "Column '{}' row {}: missing label",
                    column.name(),
                    row
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_numeric_values() {
        let df = df! {
            "a" => &[1.0, 2.5, 3.0],
        }
        .unwrap();
        let values = DataValidator::numeric_values(&df.get_columns()[0]).unwrap();
        assert_eq!(values, vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_unparsable_numeric_value() {
        let df = df! {
            "a" => &["1.0", "oops", "3.0"],
        }
        .unwrap();
        let result = DataValidator::numeric_values(&df.get_columns()[0]);
        assert!(matches!(result, Err(M3gpError::DataLoading(_))));
    }

    #[test]
    fn test_integer_labels_become_strings() {
        let df = df! {
            "class" => &[0i64, 1, 1],
        }
        .unwrap();
        let labels = DataValidator::label_values(&df.get_columns()[0]).unwrap();
        assert_eq!(labels, vec!["0", "1", "1"]);
    }

    #[test]
    fn test_minimum_rows_and_columns() {
        let df = df! {
            "a" => &[1.0, 2.0],
        }
        .unwrap();
        assert!(DataValidator::validate_minimum_rows(&df, 2).is_ok());
        assert!(DataValidator::validate_minimum_rows(&df, 3).is_err());
        assert!(DataValidator::validate_minimum_columns(&df, 2).is_err());
        assert!(DataValidator::check_nulls(&df).is_empty());
    }
}
