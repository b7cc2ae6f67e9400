use super::traits::ConfigSection;
use crate::error::{M3gpError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Prepended to every report file name
    pub prefix: String,
    /// Also write per-run fitness, dimension and size series
    pub raw_series: bool,
    pub separator: char,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("results"),
            prefix: String::new(),
            raw_series: true,
            separator: ';',
        }
    }
}

impl ConfigSection for OutputConfig {
    fn section_name() -> &'static str {
        "output"
    }

    fn validate(&self) -> Result<()> {
        if !self.separator.is_ascii() {
            return Err(M3gpError::Configuration(
                "output separator must be a single ASCII character".to_string(),
            ));
        }
        Ok(())
    }
}
