//! Multi-dimensional individuals and their nearest-centroid model.
//!
//! A [`Forest`] projects a feature row into an embedding with one coordinate
//! per dimension. Its [`ClusterModel`] holds, per training class, the mean
//! embedding and covariance used to classify by Mahalanobis distance. The
//! model is computed explicitly with [`Forest::ensure_model`] and cached until
//! the forest is replaced.

use crate::data::Dataset;
use crate::error::{M3gpError, Result};
use crate::types::Node;
use crate::utils::math::{
    covariance_matrix, euclidean_distance, mahalanobis_distance, mean_vector,
    regularized_inverse,
};
use nalgebra::DMatrix;
use std::fmt;
use std::ops::Range;

/// Per-class centroids and covariances in embedding space
#[derive(Debug, Clone)]
pub struct ClusterModel {
    classes: Vec<String>, // first appearance in the training split
    means: Vec<Vec<f64>>,
    covariances: Vec<DMatrix<f64>>,
    inverse_covariances: Vec<DMatrix<f64>>,
}

impl ClusterModel {
    /// Fit the model on the training split of `dataset`
    pub fn fit(dimensions: &[Node], dataset: &Dataset) -> Self {
        let mut classes: Vec<String> = Vec::new();
        let mut clusters: Vec<Vec<Vec<f64>>> = Vec::new();

        for i in dataset.training_rows() {
            let label = dataset.label(i);
            let index = match classes.iter().position(|c| c == label) {
                Some(index) => index,
                None => {
                    classes.push(label.to_string());
                    clusters.push(Vec::new());
                    classes.len() - 1
                }
            };
            clusters[index].push(embed(dimensions, dataset.row(i)));
        }

        let means: Vec<Vec<f64>> = clusters.iter().map(|points| mean_vector(points)).collect();
        let covariances: Vec<DMatrix<f64>> = clusters
            .iter()
            .zip(&means)
            .map(|(points, mean)| covariance_matrix(points, mean))
            .collect();
        let inverse_covariances = covariances.iter().map(regularized_inverse).collect();

        Self {
            classes,
            means,
            covariances,
            inverse_covariances,
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    pub fn covariances(&self) -> &[DMatrix<f64>] {
        &self.covariances
    }

    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    pub fn distance_to(&self, class_index: usize, embedding: &[f64]) -> f64 {
        mahalanobis_distance(
            embedding,
            &self.means[class_index],
            &self.inverse_covariances[class_index],
        )
    }

    /// Index of the closest class; ties keep the earliest class
    pub fn nearest(&self, embedding: &[f64]) -> usize {
        let mut best = 0;
        let mut best_distance = self.distance_to(0, embedding);

        for class_index in 1..self.classes.len() {
            let distance = self.distance_to(class_index, embedding);
            if distance < best_distance {
                best = class_index;
                best_distance = distance;
            }
        }
        best
    }
}

/// Evaluate every dimension on one row
pub fn embed(dimensions: &[Node], row: &[f64]) -> Vec<f64> {
    dimensions.iter().map(|d| d.evaluate(row)).collect()
}

/// Ordered, non-empty set of dimensions plus the cached model
#[derive(Debug, Clone)]
pub struct Forest {
    dimensions: Vec<Node>,
    model: Option<ClusterModel>,
}

impl Forest {
    pub fn new(dimensions: Vec<Node>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(M3gpError::InvalidTree(
                "A forest needs at least one dimension".to_string(),
            ));
        }
        Ok(Self::from_dimensions(dimensions))
    }

    /// Build from dimensions produced by the genetic operators
    pub(crate) fn from_dimensions(dimensions: Vec<Node>) -> Self {
        debug_assert!(!dimensions.is_empty());
        Self {
            dimensions,
            model: None,
        }
    }

    pub fn single(dimension: Node) -> Self {
        Self::from_dimensions(vec![dimension])
    }

    pub fn dimensions(&self) -> &[Node] {
        &self.dimensions
    }

    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Total node count over all dimensions
    pub fn size(&self) -> usize {
        self.dimensions.iter().map(Node::size).sum()
    }

    pub fn depth(&self) -> usize {
        self.dimensions.iter().map(Node::depth).max().unwrap_or(0)
    }

    pub fn max_variable(&self) -> Option<usize> {
        self.dimensions.iter().filter_map(Node::max_variable).max()
    }

    /// Deep copy of the dimensions, without the model
    pub fn clone_dimensions(&self) -> Vec<Node> {
        self.dimensions.clone()
    }

    pub fn embed(&self, row: &[f64]) -> Vec<f64> {
        embed(&self.dimensions, row)
    }

    pub fn model(&self) -> Option<&ClusterModel> {
        self.model.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Fit the cluster model unless one is already cached
    pub fn ensure_model(&mut self, dataset: &Dataset) {
        if self.model.is_none() {
            self.model = Some(ClusterModel::fit(&self.dimensions, dataset));
        }
    }

    /// Label of the nearest class centroid
    pub fn predict(&self, row: &[f64]) -> Result<&str> {
        let model = self.model.as_ref().ok_or(M3gpError::ModelNotComputed)?;
        let class_index = model.nearest(&self.embed(row));
        Ok(&model.classes[class_index])
    }

    pub fn train_accuracy(&mut self, dataset: &Dataset) -> f64 {
        self.ensure_model(dataset);
        self.accuracy_over(dataset, dataset.training_rows())
    }

    /// Accuracy on the test split; 0.0 when the split is empty
    pub fn test_accuracy(&mut self, dataset: &Dataset) -> f64 {
        self.ensure_model(dataset);
        self.accuracy_over(dataset, dataset.test_rows())
    }

    pub fn train_mean_distance_to_centroid(&mut self, dataset: &Dataset) -> f64 {
        self.ensure_model(dataset);
        self.mean_distance_over(dataset, dataset.training_rows())
    }

    pub fn test_mean_distance_to_centroid(&mut self, dataset: &Dataset) -> f64 {
        self.ensure_model(dataset);
        self.mean_distance_over(dataset, dataset.test_rows())
    }

    /// Mean pairwise Euclidean distance between class centroids
    pub fn mean_distance_between_centroids(&mut self, dataset: &Dataset) -> f64 {
        self.ensure_model(dataset);
        let Some(model) = &self.model else {
            return 0.0;
        };

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..model.means.len() {
            for j in (i + 1)..model.means.len() {
                total += euclidean_distance(&model.means[i], &model.means[j]);
                pairs += 1;
            }
        }

        if pairs == 0 {
            0.0
        } else {
            total / pairs as f64
        }
    }

    fn accuracy_over(&self, dataset: &Dataset, rows: Range<usize>) -> f64 {
        let Some(model) = &self.model else {
            return 0.0;
        };
        if rows.is_empty() {
            return 0.0;
        }

        let total = rows.len();
        let hits = rows
            .filter(|&i| {
                let predicted = model.nearest(&self.embed(dataset.row(i)));
                model.classes[predicted] == dataset.label(i)
            })
            .count();
        hits as f64 / total as f64
    }

    /// Mean distance of each row to its own class centroid.
    /// Rows whose class the model never saw are skipped; a non-finite
    /// distance makes the mean infinite.
    fn mean_distance_over(&self, dataset: &Dataset, rows: Range<usize>) -> f64 {
        let Some(model) = &self.model else {
            return 0.0;
        };

        let mut total = 0.0;
        let mut count = 0usize;
        for i in rows {
            if let Some(class_index) = model.class_index(dataset.label(i)) {
                let distance = model.distance_to(class_index, &self.embed(dataset.row(i)));
                if !distance.is_finite() {
                    return f64::INFINITY;
                }
                total += distance;
                count += 1;
            }
        }

        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

impl fmt::Display for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dimension) in self.dimensions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dimension)?;
        }
        write!(f, "]")
    }
}
