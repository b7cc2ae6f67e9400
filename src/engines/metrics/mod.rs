pub mod fitness;
pub mod statistics;

pub use fitness::{FitnessPolicy, OptimizationDirection};
pub use statistics::{GenerationStats, GenerationSummary, RunStatistics};
