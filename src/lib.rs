//! Multi-dimensional multi-class genetic programming.
//!
//! Individuals are forests of arithmetic expression trees. Each tree is one
//! dimension of an embedding space; a row is classified by the nearest class
//! centroid in that space under the Mahalanobis distance.

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod types;
pub mod utils;

pub use data::Dataset;
pub use engines::evaluation::{ClusterModel, Forest, M3gpClassifier, TrainedClassifier};
pub use engines::generation::{EvolutionEngine, EvolutionOutcome};
pub use engines::metrics::{FitnessPolicy, GenerationStats, RunStatistics};
pub use error::{M3gpError, Result};
pub use types::{Node, Operator, Terminal};
