use super::{
    data::DataConfig, evolution::EvolutionConfig, output::OutputConfig, traits::ConfigSection,
};
use crate::error::{M3gpError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `M3GP__EVOLUTION__POPULATION_SIZE`
pub const ENV_PREFIX: &str = "M3GP";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        self.data.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: AppConfig,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Layer defaults, an optional TOML/JSON file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(M3gpError::Configuration(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::debug!("Loaded configuration: {:?}", config);
        Ok(Self { config })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = toml::to_string_pretty(&self.config)
            .map_err(|e| M3gpError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| M3gpError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_inner(self) -> AppConfig {
        self.config
    }

    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut updated = self.config.clone();
        f(&mut updated);
        updated.validate()?;
        self.config = updated;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
