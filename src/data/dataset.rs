use crate::error::{M3gpError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;

/// Redraws allowed when a shuffle leaves a single class in the training split
pub const SHUFFLE_ATTEMPTS: usize = 64;

/// Immutable labelled feature matrix with a fixed train/test split.
///
/// The first `floor(rows * train_fraction)` rows form the training prefix;
/// the remainder is the test suffix.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    labels: Vec<String>,
    train_fraction: f64,
    train_len: usize,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<String>, train_fraction: f64) -> Result<Self> {
        if features.is_empty() {
            return Err(M3gpError::DataLoading("Dataset is empty".to_string()));
        }
        if features.len() != labels.len() {
            return Err(M3gpError::DataLoading(format!(
                "Feature rows ({}) and labels ({}) differ in count",
                features.len(),
                labels.len()
            )));
        }

        let width = features[0].len();
        if width == 0 {
            return Err(M3gpError::DataLoading("Feature rows have no columns".to_string()));
        }
        if let Some((row, bad)) = features.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(M3gpError::DataLoading(format!(
                "Row {} has {} features, expected {}",
                row,
                bad.len(),
                width
            )));
        }
        if let Some(row) = features.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(M3gpError::DataLoading(format!(
                "Row {} contains a non-finite value",
                row
            )));
        }

        if !(train_fraction > 0.0 && train_fraction <= 1.0) {
            return Err(M3gpError::Configuration(format!(
                "train_fraction must be in (0, 1], got {}",
                train_fraction
            )));
        }

        let train_len = (features.len() as f64 * train_fraction) as usize;
        if train_len == 0 {
            return Err(M3gpError::DataLoading(format!(
                "Training split is empty: {} rows at train_fraction {}",
                features.len(),
                train_fraction
            )));
        }

        let dataset = Self {
            features,
            labels,
            train_fraction,
            train_len,
        };

        if dataset.training_classes().len() < 2 {
            return Err(M3gpError::DataLoading(
                "Training split needs at least two distinct labels".to_string(),
            ));
        }

        Ok(dataset)
    }

    /// Returns a copy with rows and labels permuted together.
    ///
    /// Permutations whose training prefix holds fewer than two classes are
    /// redrawn, up to [`SHUFFLE_ATTEMPTS`] times.
    pub fn shuffled<R: Rng>(&self, rng: &mut R) -> Result<Self> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        let mut last_error = None;

        for _ in 0..SHUFFLE_ATTEMPTS {
            order.shuffle(rng);
            let features = order.iter().map(|&i| self.features[i].clone()).collect();
            let labels = order.iter().map(|&i| self.labels[i].clone()).collect();
            match Self::new(features, labels, self.train_fraction) {
                Ok(dataset) => return Ok(dataset),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            M3gpError::DataLoading("No valid shuffle of the dataset found".to_string())
        }))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.features[0].len()
    }

    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    pub fn train_size(&self) -> usize {
        self.train_len
    }

    pub fn test_size(&self) -> usize {
        self.len() - self.train_len
    }

    pub fn training_rows(&self) -> Range<usize> {
        0..self.train_len
    }

    pub fn test_rows(&self) -> Range<usize> {
        self.train_len..self.len()
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.features[index]
    }

    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    /// Distinct training labels in order of first appearance
    pub fn training_classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = Vec::new();
        for i in self.training_rows() {
            let label = self.label(i);
            if !classes.contains(&label) {
                classes.push(label);
            }
        }
        classes
    }
}
