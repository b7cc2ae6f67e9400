use crate::data::Dataset;
use crate::engines::evaluation::Forest;
use crate::utils::math::sigmoid;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether a fitness value should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// Named fitness strategies.
///
/// Penalty terms are divided by the number of training rows so that they
/// can only break ties between forests of (nearly) equal accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessPolicy {
    /// Plain accuracy
    Accuracy,
    /// Mean Mahalanobis distance of rows to their own centroid
    MeanDistanceToCentroid,
    /// `accuracy - sigmoid(distance to centroid) / train_rows`
    AccuracyMinusCentroidDistance,
    /// `accuracy - sigmoid(dimensions) / train_rows`
    AccuracyMinusDimensions,
    /// `sigmoid(between / dims) - sigmoid(within / dims)`
    ClusterSeparation,
    /// `accuracy - sigmoid(size / 100) / train_rows`
    AccuracyMinusSize,
}

impl Default for FitnessPolicy {
    fn default() -> Self {
        Self::AccuracyMinusSize
    }
}

impl FitnessPolicy {
    pub fn direction(&self) -> OptimizationDirection {
        match self {
            Self::MeanDistanceToCentroid => OptimizationDirection::Minimize,
            _ => OptimizationDirection::Maximize,
        }
    }

    pub fn smaller_is_better(&self) -> bool {
        self.direction() == OptimizationDirection::Minimize
    }

    /// Fitness measured on the training split
    pub fn train(&self, forest: &mut Forest, dataset: &Dataset) -> f64 {
        let train_rows = dataset.train_size() as f64;
        let dims = forest.num_dimensions() as f64;

        match self {
            Self::Accuracy => forest.train_accuracy(dataset),
            Self::MeanDistanceToCentroid => forest.train_mean_distance_to_centroid(dataset),
            Self::AccuracyMinusCentroidDistance => {
                let accuracy = forest.train_accuracy(dataset);
                let distance = sigmoid(forest.train_mean_distance_to_centroid(dataset));
                accuracy - distance / train_rows
            }
            Self::AccuracyMinusDimensions => {
                forest.train_accuracy(dataset) - sigmoid(dims) / train_rows
            }
            Self::ClusterSeparation => {
                let between = sigmoid(forest.mean_distance_between_centroids(dataset) / dims);
                let within = sigmoid(forest.train_mean_distance_to_centroid(dataset) / dims);
                between - within
            }
            Self::AccuracyMinusSize => {
                forest.train_accuracy(dataset) - size_penalty(forest) / train_rows
            }
        }
    }

    /// Fitness measured on the test split; penalties keep the training denominator
    pub fn test(&self, forest: &mut Forest, dataset: &Dataset) -> f64 {
        let train_rows = dataset.train_size() as f64;
        let dims = forest.num_dimensions() as f64;

        match self {
            Self::Accuracy => forest.test_accuracy(dataset),
            Self::MeanDistanceToCentroid => forest.test_mean_distance_to_centroid(dataset),
            Self::AccuracyMinusCentroidDistance => {
                let accuracy = forest.test_accuracy(dataset);
                let distance = sigmoid(forest.test_mean_distance_to_centroid(dataset));
                accuracy - distance / train_rows
            }
            Self::AccuracyMinusDimensions => {
                forest.test_accuracy(dataset) - sigmoid(dims) / train_rows
            }
            Self::ClusterSeparation => {
                let between = sigmoid(forest.mean_distance_between_centroids(dataset) / dims);
                let within = sigmoid(forest.test_mean_distance_to_centroid(dataset) / dims);
                between - within
            }
            Self::AccuracyMinusSize => {
                forest.test_accuracy(dataset) - size_penalty(forest) / train_rows
            }
        }
    }

    /// True when fitness `a` is strictly better than `b`
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        match self.direction() {
            OptimizationDirection::Maximize => a > b,
            OptimizationDirection::Minimize => a < b,
        }
    }

    /// True when `a` is at least as good as `b`
    pub fn is_not_worse(&self, a: f64, b: f64) -> bool {
        !self.is_better(b, a)
    }

    /// Compare two forests by training fitness
    pub fn better(&self, a: &mut Forest, b: &mut Forest, dataset: &Dataset) -> bool {
        let fa = self.train(a, dataset);
        let fb = self.train(b, dataset);
        self.is_better(fa, fb)
    }

    /// Ordering that sorts best first; NaN sorts last
    pub fn rank(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self.direction() {
                OptimizationDirection::Maximize => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
                OptimizationDirection::Minimize => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            },
        }
    }
}

fn size_penalty(forest: &Forest) -> f64 {
    sigmoid(forest.size() as f64 / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Node, Operator};

    fn dataset() -> Dataset {
        let features = vec![
            vec![0.1, 3.0],
            vec![0.9, 1.0],
            vec![0.2, 2.0],
            vec![0.8, 5.0],
            vec![0.3, 1.0],
            vec![0.7, 4.0],
            vec![0.25, 2.0],
            vec![0.75, 2.0],
        ];
        let labels = ["a", "b", "a", "b", "a", "b", "a", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Dataset::new(features, labels, 0.75).unwrap()
    }

    #[test]
    fn test_size_penalty_prefers_smaller_forest() {
        let ds = dataset();
        let mut small = Forest::single(Node::variable(0));
        let mut large = Forest::single(Node::operator(
            Operator::Add,
            Node::variable(0),
            Node::operator(Operator::Mul, Node::constant(0.0), Node::variable(1)),
        ));

        let policy = FitnessPolicy::AccuracyMinusSize;
        assert_eq!(small.train_accuracy(&ds), large.train_accuracy(&ds));
        assert!(policy.better(&mut small, &mut large, &ds));
        assert!(!policy.better(&mut large, &mut small, &ds));
    }

    #[test]
    fn test_penalty_cannot_dominate_accuracy() {
        let ds = dataset();
        let mut forest = Forest::single(Node::variable(0));
        let fitness = FitnessPolicy::AccuracyMinusSize.train(&mut forest, &ds);
        let accuracy = forest.train_accuracy(&ds);
        assert!(fitness < accuracy);
        assert!(accuracy - fitness < 1.0 / ds.train_size() as f64);
    }

    #[test]
    fn test_directions() {
        assert!(FitnessPolicy::MeanDistanceToCentroid.smaller_is_better());
        assert!(!FitnessPolicy::Accuracy.smaller_is_better());

        let max = FitnessPolicy::Accuracy;
        assert!(max.is_better(0.9, 0.5));
        assert!(max.is_not_worse(0.5, 0.5));
        assert_eq!(max.rank(0.9, 0.5), Ordering::Less);

        let min = FitnessPolicy::MeanDistanceToCentroid;
        assert!(min.is_better(0.5, 0.9));
        assert_eq!(min.rank(0.9, 0.5), Ordering::Greater);
        assert_eq!(max.rank(f64::NAN, 0.1), Ordering::Greater);
    }

    #[test]
    fn test_all_policies_are_finite() {
        let ds = dataset();
        for policy in [
            FitnessPolicy::Accuracy,
            FitnessPolicy::MeanDistanceToCentroid,
            FitnessPolicy::AccuracyMinusCentroidDistance,
            FitnessPolicy::AccuracyMinusDimensions,
            FitnessPolicy::ClusterSeparation,
            FitnessPolicy::AccuracyMinusSize,
        ] {
            let mut forest = Forest::new(vec![Node::variable(0), Node::variable(1)]).unwrap();
            assert!(policy.train(&mut forest, &ds).is_finite(), "{:?}", policy);
            assert!(policy.test(&mut forest, &ds).is_finite(), "{:?}", policy);
        }
    }
}
