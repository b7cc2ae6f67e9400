//! Fit/predict adapter over a single evolutionary run.

use crate::config::EvolutionConfig;
use crate::data::Dataset;
use crate::engines::evaluation::Forest;
use crate::engines::generation::{EvolutionEngine, SilentProgressCallback};
use crate::engines::metrics::GenerationStats;
use crate::error::{M3gpError, Result};

#[derive(Debug, Clone, Default)]
pub struct M3gpClassifier {
    config: EvolutionConfig,
}

impl M3gpClassifier {
    pub fn new(config: EvolutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Evolve a forest on the training split of `dataset`
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedClassifier> {
        let mut engine = EvolutionEngine::new(self.config.clone(), dataset)?;
        let outcome = engine.run(dataset, SilentProgressCallback)?;

        let mut forest = outcome.best;
        forest.ensure_model(dataset);
        let train_accuracy = forest.train_accuracy(dataset);
        let test_accuracy = forest.test_accuracy(dataset);

        log::info!(
            "Trained forest {} (fitness {:.4}, train {:.3}, test {:.3})",
            forest,
            outcome.best_fitness,
            train_accuracy,
            test_accuracy
        );

        Ok(TrainedClassifier {
            forest,
            fitness: outcome.best_fitness,
            train_accuracy,
            test_accuracy,
            history: outcome.history,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrainedClassifier {
    forest: Forest,
    fitness: f64,
    train_accuracy: f64,
    test_accuracy: f64,
    history: Vec<GenerationStats>,
}

impl TrainedClassifier {
    pub fn predict(&self, row: &[f64]) -> Result<&str> {
        if let Some(max) = self.forest.max_variable() {
            if max >= row.len() {
                return Err(M3gpError::InvalidInput(format!(
                    "row has {} features, model reads x{}",
                    row.len(),
                    max
                )));
            }
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(M3gpError::InvalidInput(
                "row contains non-finite values".to_string(),
            ));
        }
        self.forest.predict(row)
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Result<Vec<String>> {
        rows.iter()
            .map(|row| self.predict(row).map(str::to_string))
            .collect()
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn classes(&self) -> &[String] {
        self.forest.model().map(|m| m.classes()).unwrap_or(&[])
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn train_accuracy(&self) -> f64 {
        self.train_accuracy
    }

    pub fn test_accuracy(&self) -> f64 {
        self.test_accuracy
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }
}
