pub mod data;
pub mod evolution;
pub mod manager;
pub mod output;
pub mod traits;

pub use data::DataConfig;
pub use evolution::{EvolutionConfig, SelectionMethod, TreeGeneration};
pub use manager::{AppConfig, ConfigManager};
pub use output::OutputConfig;
pub use traits::ConfigSection;
