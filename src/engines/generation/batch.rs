//! Independent repeated runs over one dataset.

use crate::config::EvolutionConfig;
use crate::data::Dataset;
use crate::engines::evaluation::Forest;
use crate::engines::generation::{ConsoleProgressCallback, EvolutionEngine};
use crate::engines::metrics::RunStatistics;
use crate::error::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub statistics: RunStatistics,
    /// Best forest and training fitness of each run
    pub best: Vec<(Forest, f64)>,
}

impl BatchOutcome {
    pub fn best_models(&self) -> Vec<String> {
        self.best.iter().map(|(forest, _)| forest.to_string()).collect()
    }
}

/// Run `config.runs` independent evolutions.
///
/// Run `i` uses seed `seed + i` when a seed is configured. With `shuffle`
/// each run reshuffles the rows first, so runs see different splits. All
/// splits are drawn before the first run starts, so a dataset that cannot
/// be split fails before any evolution work is done.
pub fn run_batch(config: &EvolutionConfig, dataset: &Dataset, shuffle: bool) -> Result<BatchOutcome> {
    let seeds: Vec<Option<u64>> = (0..config.runs)
        .map(|run| config.seed.map(|seed| seed.wrapping_add(run as u64)))
        .collect();

    let run_data = seeds
        .iter()
        .map(|seed| {
            if !shuffle {
                return Ok(dataset.clone());
            }
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            dataset.shuffled(&mut rng)
        })
        .collect::<Result<Vec<Dataset>>>()?;

    let mut statistics = RunStatistics::new();
    let mut best = Vec::with_capacity(config.runs);

    for (run, (seed, data)) in seeds.into_iter().zip(&run_data).enumerate() {
        let run_config = EvolutionConfig {
            seed,
            ..config.clone()
        };

        let started = Instant::now();
        let mut engine = EvolutionEngine::new(run_config, data)?;
        let outcome = engine.run(data, ConsoleProgressCallback::for_run(run))?;
        log::debug!("Run {} finished in {:.2?}", run + 1, started.elapsed());
        log::info!(
            "Run {} best: {} (fitness {:.4})",
            run + 1,
            outcome.best,
            outcome.best_fitness
        );

        statistics.add_run(outcome.history);
        best.push((outcome.best, outcome.best_fitness));
    }

    Ok(BatchOutcome { statistics, best })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let features = (0..30).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let labels = (0..30)
            .map(|i| if i < 15 { "low" } else { "high" }.to_string())
            .collect();
        Dataset::new(features, labels, 0.7).unwrap()
    }

    fn config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 10,
            generations: 2,
            runs: 3,
            max_depth: 3,
            tournament_fraction: 0.2,
            seed: Some(100),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_history_per_run() {
        let outcome = run_batch(&config(), &dataset(), true).unwrap();
        assert_eq!(outcome.statistics.num_runs(), 3);
        assert_eq!(outcome.statistics.num_generations(), 2);
        assert_eq!(outcome.best_models().len(), 3);
    }

    #[test]
    fn test_seeded_batch_is_reproducible() {
        let a = run_batch(&config(), &dataset(), true).unwrap();
        let b = run_batch(&config(), &dataset(), true).unwrap();
        assert_eq!(a.best_models(), b.best_models());
        assert_eq!(a.statistics.runs(), b.statistics.runs());
    }

    #[test]
    fn test_single_minority_row_survives_reshuffles() {
        let features = (0..10).map(|i| vec![i as f64, (i % 2) as f64]).collect();
        let labels = (0..10)
            .map(|i| if i == 0 { "rare" } else { "common" }.to_string())
            .collect();
        let dataset = Dataset::new(features, labels, 0.7).unwrap();
        let config = EvolutionConfig {
            runs: 10,
            generations: 1,
            ..config()
        };

        let outcome = run_batch(&config, &dataset, true).unwrap();
        assert_eq!(outcome.statistics.num_runs(), 10);
    }
}
