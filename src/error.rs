use thiserror::Error;

#[derive(Error, Debug)]
pub enum M3gpError {
    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    #[error("Model has not been computed for this forest")]
    ModelNotComputed,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Evolution cancelled before any generation was evaluated")]
    Cancelled,

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, M3gpError>;
