use super::validator::DataValidator;
use crate::data::Dataset;
use crate::error::{M3gpError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Two classes need at least two rows
const MIN_ROWS: usize = 2;

/// Parsing options for delimited input files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvOptions {
    pub has_header: bool,
    pub separator: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            separator: ',',
        }
    }
}

pub struct CsvConnector;

impl CsvConnector {
    /// Load a delimited file into a DataFrame
    pub fn load<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<DataFrame> {
        if !options.separator.is_ascii() {
            return Err(M3gpError::Configuration(format!(
                "separator: '{}' is not a single-byte character",
                options.separator
            )));
        }
        let separator = options.separator as u8;

        let df = CsvReadOptions::default()
            .with_has_header(options.has_header)
            .map_parse_options(|parse| parse.with_separator(separator))
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| {
                M3gpError::DataLoading(format!(
                    "Failed to read {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?;

        Ok(df)
    }

    /// Load one file whose last column holds the class label
    pub fn load_dataset<P: AsRef<Path>>(
        path: P,
        options: &CsvOptions,
        train_fraction: f64,
    ) -> Result<Dataset> {
        let df = Self::load(&path, options)?;
        DataValidator::validate_minimum_columns(&df, 2)?;
        DataValidator::validate_minimum_rows(&df, MIN_ROWS)?;
        Self::warn_nulls(&df);

        let columns = df.get_columns();
        let (label_column, feature_columns) = columns
            .split_last()
            .ok_or_else(|| M3gpError::DataLoading("No columns found".to_string()))?;

        let features = Self::feature_rows(feature_columns, df.height())?;
        let labels = DataValidator::label_values(label_column)?;

        log::info!(
            "Loaded {} rows x {} features from {}",
            features.len(),
            feature_columns.len(),
            path.as_ref().display()
        );

        Dataset::new(features, labels, train_fraction)
    }

    /// Load features and labels from two aligned files
    pub fn load_split_dataset<P: AsRef<Path>, Q: AsRef<Path>>(
        features_path: P,
        labels_path: Q,
        options: &CsvOptions,
        train_fraction: f64,
    ) -> Result<Dataset> {
        let features_df = Self::load(&features_path, options)?;
        let labels_df = Self::load(&labels_path, options)?;
        DataValidator::validate_minimum_columns(&features_df, 1)?;
        DataValidator::validate_minimum_columns(&labels_df, 1)?;
        DataValidator::validate_minimum_rows(&features_df, MIN_ROWS)?;

        if features_df.height() != labels_df.height() {
            return Err(M3gpError::DataLoading(format!(
                "{} has {} rows but {} has {}",
                features_path.as_ref().display(),
                features_df.height(),
                labels_path.as_ref().display(),
                labels_df.height()
            )));
        }

        let features = Self::feature_rows(features_df.get_columns(), features_df.height())?;
        let labels = DataValidator::label_values(&labels_df.get_columns()[0])?;

        log::info!(
            "Loaded {} rows x {} features from {}",
            features.len(),
            features_df.width(),
            features_path.as_ref().display()
        );

        Dataset::new(features, labels, train_fraction)
    }

    /// Transpose numeric columns into rows
    fn feature_rows(columns: &[Column], height: usize) -> Result<Vec<Vec<f64>>> {
        let mut rows = vec![Vec::with_capacity(columns.len()); height];
        for column in columns {
            let values = DataValidator::numeric_values(column)?;
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(rows)
    }

    fn warn_nulls(df: &DataFrame) {
        let null_report = DataValidator::check_nulls(df);
        if !null_report.is_empty() {
            log::warn!("Null values detected: {:?}", null_report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("m3gp_csv_{}_{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_dataset_last_column_label() {
        let path = write_temp(
            "single.csv",
            "a,b,class\n1.0,2.0,yes\n3.0,4.0,no\n5.0,6.0,yes\n7.0,8.0,no\n",
        );
        let ds = CsvConnector::load_dataset(&path, &CsvOptions::default(), 0.5).unwrap();

        assert_eq!(ds.len(), 4);
        assert_eq!(ds.num_features(), 2);
        assert_eq!(ds.row(1), &[3.0, 4.0]);
        assert_eq!(ds.label(0), "yes");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_split_dataset_semicolon() {
        let x = write_temp("x.csv", "1;2\n3;4\n5;6\n7;8\n");
        let y = write_temp("y.csv", "1\n2\n1\n2\n");
        let options = CsvOptions {
            has_header: false,
            separator: ';',
        };
        let ds = CsvConnector::load_split_dataset(&x, &y, &options, 0.5).unwrap();

        assert_eq!(ds.len(), 4);
        assert_eq!(ds.row(3), &[7.0, 8.0]);
        assert_eq!(ds.label(3), "2");
        std::fs::remove_file(x).ok();
        std::fs::remove_file(y).ok();
    }

    #[test]
    fn test_mismatched_files_rejected() {
        let x = write_temp("x_bad.csv", "1,2\n3,4\n5,6\n");
        let y = write_temp("y_bad.csv", "a\nb\n");
        let options = CsvOptions {
            has_header: false,
            separator: ',',
        };
        let result = CsvConnector::load_split_dataset(&x, &y, &options, 0.5);
        assert!(matches!(result, Err(M3gpError::DataLoading(_))));
        std::fs::remove_file(x).ok();
        std::fs::remove_file(y).ok();
    }

    #[test]
    fn test_unparsable_cell_rejected() {
        let path = write_temp("bad_cell.csv", "a,class\n1.0,x\nfoo,y\n2.0,x\n3.0,y\n");
        let result = CsvConnector::load_dataset(&path, &CsvOptions::default(), 0.5);
        assert!(matches!(result, Err(M3gpError::DataLoading(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_single_row_rejected() {
        let path = write_temp("one_row.csv", "a,class\n1.0,x\n");
        let result = CsvConnector::load_dataset(&path, &CsvOptions::default(), 1.0);
        match result {
            Err(M3gpError::DataLoading(message)) => assert!(message.contains("Insufficient data")),
            other => panic!("expected a row count error, got {:?}", other),
        }
        std::fs::remove_file(path).ok();

        let x = write_temp("x_one.csv", "1,2\n");
        let y = write_temp("y_one.csv", "a\n");
        let options = CsvOptions {
            has_header: false,
            separator: ',',
        };
        assert!(CsvConnector::load_split_dataset(&x, &y, &options, 1.0).is_err());
        std::fs::remove_file(x).ok();
        std::fs::remove_file(y).ok();
    }
}
