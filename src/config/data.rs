use super::traits::ConfigSection;
use crate::data::CsvOptions;
use crate::error::{M3gpError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Features file; the last column is the label unless `labels_path` is set
    pub features_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub has_header: bool,
    pub separator: char,
    pub train_fraction: f64,
    pub shuffle: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            features_path: None,
            labels_path: None,
            has_header: true,
            separator: ',',
            train_fraction: 0.7,
            shuffle: true,
        }
    }
}

impl DataConfig {
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            has_header: self.has_header,
            separator: self.separator,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(M3gpError::Configuration(
                "train_fraction must be in (0, 1]".to_string(),
            ));
        }
        if !self.separator.is_ascii() {
            return Err(M3gpError::Configuration(
                "separator must be a single ASCII character".to_string(),
            ));
        }
        Ok(())
    }
}
