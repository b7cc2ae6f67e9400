use crate::utils::math::median;
use serde::{Deserialize, Serialize};

/// Snapshot of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub best_test_fitness: f64,
    pub best_train_accuracy: f64,
    pub best_test_accuracy: f64,
    pub best_dimensions: usize,
    pub best_size: usize,
    pub median_train_accuracy: f64,
    pub median_test_accuracy: f64,
    pub median_dimensions: f64,
    pub median_size: f64,
}

/// Per-generation medians across runs, computed on the best individual of
/// each run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub train: f64,
    pub test: f64,
    pub dimensions: f64,
    pub size: f64,
}

/// Statistics of several independent runs, owned by the driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    runs: Vec<Vec<GenerationStats>>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(&mut self, history: Vec<GenerationStats>) {
        self.runs.push(history);
    }

    pub fn runs(&self) -> &[Vec<GenerationStats>] {
        &self.runs
    }

    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    /// Longest history over all runs
    pub fn num_generations(&self) -> usize {
        self.runs.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Values of `f` at `generation` for every run that reached it
    pub fn column<F>(&self, generation: usize, f: F) -> Vec<f64>
    where
        F: Fn(&GenerationStats) -> f64,
    {
        self.runs
            .iter()
            .filter_map(|run| run.get(generation))
            .map(f)
            .collect()
    }

    pub fn summary(&self) -> Vec<GenerationSummary> {
        (0..self.num_generations())
            .map(|generation| GenerationSummary {
                generation,
                train: median(&self.column(generation, |s| s.best_train_accuracy)),
                test: median(&self.column(generation, |s| s.best_test_accuracy)),
                dimensions: median(&self.column(generation, |s| s.best_dimensions as f64)),
                size: median(&self.column(generation, |s| s.best_size as f64)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(generation: usize, train: f64, dims: usize) -> GenerationStats {
        GenerationStats {
            generation,
            best_fitness: train,
            best_test_fitness: train,
            best_train_accuracy: train,
            best_test_accuracy: train / 2.0,
            best_dimensions: dims,
            best_size: dims * 3,
            median_train_accuracy: train,
            median_test_accuracy: train,
            median_dimensions: dims as f64,
            median_size: (dims * 3) as f64,
        }
    }

    #[test]
    fn test_summary_is_median_across_runs() {
        let mut all = RunStatistics::new();
        all.add_run(vec![stats(0, 0.5, 1), stats(1, 0.6, 2)]);
        all.add_run(vec![stats(0, 0.7, 3), stats(1, 0.9, 2)]);
        all.add_run(vec![stats(0, 0.6, 2), stats(1, 0.8, 4)]);

        let summary = all.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].train, 0.6);
        assert_eq!(summary[0].dimensions, 2.0);
        assert_eq!(summary[1].train, 0.8);
        assert_eq!(summary[1].test, 0.4);
        assert_eq!(summary[1].size, 6.0);
    }

    #[test]
    fn test_uneven_histories() {
        let mut all = RunStatistics::new();
        all.add_run(vec![stats(0, 0.5, 1)]);
        all.add_run(vec![stats(0, 0.7, 1), stats(1, 0.9, 1)]);

        assert_eq!(all.num_generations(), 2);
        assert_eq!(all.column(1, |s| s.best_train_accuracy), vec![0.9]);
        assert_eq!(all.summary()[0].train, 0.6);
    }
}
