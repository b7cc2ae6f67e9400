pub mod classifier;
pub mod expression;
pub mod forest;

pub use classifier::{M3gpClassifier, TrainedClassifier};
pub use forest::{embed, ClusterModel, Forest};
