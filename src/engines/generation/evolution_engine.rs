//! Generational loop.
//!
//! The engine is a small state machine,
//! `Initializing -> Evaluating -> Evolving(gen) -> Evaluating -> ... -> Terminated`,
//! driven by [`EvolutionEngine::step`] or run to completion with
//! [`EvolutionEngine::run`]. All randomness comes from the engine's own
//! seeded generator, so a fixed seed reproduces a run exactly.

use crate::config::{ConfigSection, EvolutionConfig};
use crate::data::Dataset;
use crate::engines::evaluation::Forest;
use crate::engines::generation::{
    operators::{crossover, mutate, prune, select_parent},
    progress::ProgressCallback,
    tree_builder::TreeBuilder,
};
use crate::engines::metrics::GenerationStats;
use crate::error::{M3gpError, Result};
use crate::utils::math::median;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Evaluating,
    Evolving(usize),
    Terminated,
}

/// Result of a finished (or cancelled) run
#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub best: Forest,
    pub best_fitness: f64,
    pub history: Vec<GenerationStats>,
    pub population: Vec<(Forest, f64)>,
    pub cancelled: bool,
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    builder: TreeBuilder,
    num_features: usize,
    rng: StdRng,
    state: EngineState,
    generation: usize,
    pending: Vec<(Forest, Option<f64>)>, // next generation, elites keep their fitness
    population: Vec<(Forest, f64)>,      // last evaluated generation, best first
    best: Option<(Forest, f64)>,
    history: Vec<GenerationStats>,
    cancel_flag: Option<Arc<AtomicBool>>,
    cancelled: bool,
}

impl EvolutionEngine {
    /// Validate the configuration against the dataset and seed the generator
    pub fn new(config: EvolutionConfig, dataset: &Dataset) -> Result<Self> {
        config.validate()?;
        let builder = TreeBuilder::from_config(&config, dataset.num_features())?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            builder,
            num_features: dataset.num_features(),
            rng,
            state: EngineState::Initializing,
            generation: 0,
            pending: Vec::new(),
            population: Vec::new(),
            best: None,
            history: Vec::new(),
            cancel_flag: None,
            cancelled: false,
        })
    }

    /// Stop cooperatively when `flag` is set; checked before each evaluation
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn best(&self) -> Option<&(Forest, f64)> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Last evaluated generation, sorted best first
    pub fn population(&self) -> &[(Forest, f64)] {
        &self.population
    }

    /// Run every remaining transition
    pub fn run<C: ProgressCallback>(
        &mut self,
        dataset: &Dataset,
        mut callback: C,
    ) -> Result<EvolutionOutcome> {
        while self.step(dataset, &mut callback)? != EngineState::Terminated {}
        self.outcome()
    }

    /// Perform one state transition and return the new state
    pub fn step<C: ProgressCallback>(
        &mut self,
        dataset: &Dataset,
        callback: &mut C,
    ) -> Result<EngineState> {
        if dataset.num_features() != self.num_features {
            return Err(M3gpError::Configuration(format!(
                "engine was built for {} features, dataset has {}",
                self.num_features,
                dataset.num_features()
            )));
        }

        match self.state {
            EngineState::Initializing => {
                self.pending = self
                    .builder
                    .population(self.config.tree_generation, self.config.population_size, &mut self.rng)
                    .into_iter()
                    .map(|forest| (forest, None))
                    .collect();
                log::debug!(
                    "Initialized {} individuals ({:?})",
                    self.pending.len(),
                    self.config.tree_generation
                );
                self.state = EngineState::Evaluating;
            }
            EngineState::Evaluating => {
                if self.is_cancel_requested() {
                    log::warn!("Evolution cancelled before generation {}", self.generation);
                    self.cancelled = true;
                    self.state = EngineState::Terminated;
                    return Ok(self.state);
                }

                callback.on_generation_start(self.generation);
                self.evaluate_generation(dataset, callback);

                self.state = if self.generation + 1 >= self.config.generations {
                    EngineState::Terminated
                } else {
                    EngineState::Evolving(self.generation)
                };
            }
            EngineState::Evolving(generation) => {
                self.pending = self.next_generation();
                self.generation = generation + 1;
                self.state = EngineState::Evaluating;
            }
            EngineState::Terminated => {}
        }

        Ok(self.state)
    }

    pub fn outcome(&self) -> Result<EvolutionOutcome> {
        let (best, best_fitness) = self.best.clone().ok_or(M3gpError::Cancelled)?;
        Ok(EvolutionOutcome {
            best,
            best_fitness,
            history: self.history.clone(),
            population: self.population.clone(),
            cancelled: self.cancelled,
        })
    }

    fn is_cancel_requested(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn evaluate_generation<C: ProgressCallback>(&mut self, dataset: &Dataset, callback: &mut C) {
        let policy = self.config.fitness;
        let pending = std::mem::take(&mut self.pending);
        let total = pending.len();

        let score = move |(mut forest, fitness): (Forest, Option<f64>)| {
            let fitness = fitness.unwrap_or_else(|| policy.train(&mut forest, dataset));
            (forest, fitness)
        };
        let mut evaluated: Vec<(Forest, f64)> = if self.config.parallel {
            pending.into_par_iter().map(score).collect()
        } else {
            pending.into_iter().map(score).collect()
        };
        callback.on_population_evaluated(total, total);

        // stable: elites stay ahead of offspring with equal fitness
        evaluated.sort_by(|a, b| policy.rank(a.1, b.1));

        if self.config.prune_best {
            let (pruned, fitness) = prune(&evaluated[0].0, dataset, policy);
            if pruned.num_dimensions() < evaluated[0].0.num_dimensions()
                && policy.is_not_worse(fitness, evaluated[0].1)
            {
                log::debug!(
                    "Pruned best from {} to {} dimensions",
                    evaluated[0].0.num_dimensions(),
                    pruned.num_dimensions()
                );
                evaluated[0] = (pruned, fitness);
            }
        }

        let improved = match &self.best {
            Some((_, best_fitness)) => {
                best_fitness.is_nan() || policy.is_better(evaluated[0].1, *best_fitness)
            }
            None => true,
        };
        if improved {
            self.best = Some(evaluated[0].clone());
        }

        let stats = self.generation_stats(&mut evaluated, dataset);
        callback.on_generation_complete(&stats);
        self.history.push(stats);
        self.population = evaluated;
    }

    fn generation_stats(&self, evaluated: &mut [(Forest, f64)], dataset: &Dataset) -> GenerationStats {
        let measure = |(forest, _): &mut (Forest, f64)| {
            (
                forest.train_accuracy(dataset),
                forest.test_accuracy(dataset),
                forest.num_dimensions() as f64,
                forest.size() as f64,
            )
        };
        let measures: Vec<(f64, f64, f64, f64)> = if self.config.parallel {
            evaluated.par_iter_mut().map(measure).collect()
        } else {
            evaluated.iter_mut().map(measure).collect()
        };

        let best_fitness = evaluated[0].1;
        let best_test_fitness = self.config.fitness.test(&mut evaluated[0].0, dataset);
        let (best_train, best_test, _, _) = measures[0];
        let column = |f: fn(&(f64, f64, f64, f64)) -> f64| -> Vec<f64> {
            measures.iter().map(f).collect()
        };

        GenerationStats {
            generation: self.generation,
            best_fitness,
            best_test_fitness,
            best_train_accuracy: best_train,
            best_test_accuracy: best_test,
            best_dimensions: evaluated[0].0.num_dimensions(),
            best_size: evaluated[0].0.size(),
            median_train_accuracy: median(&column(|m| m.0)),
            median_test_accuracy: median(&column(|m| m.1)),
            median_dimensions: median(&column(|m| m.2)),
            median_size: median(&column(|m| m.3)),
        }
    }

    fn next_generation(&mut self) -> Vec<(Forest, Option<f64>)> {
        let population = std::mem::take(&mut self.population);
        let size = self.config.population_size;
        let elite_count = self.config.elite_count().min(population.len());
        let tournament_size = self.config.tournament_size();
        let method = self.config.selection_method;
        let policy = self.config.fitness;
        let max_depth = self.config.max_depth;

        // Elitism: copy top performers
        let mut next: Vec<(Forest, Option<f64>)> = population
            .iter()
            .take(elite_count)
            .map(|(forest, fitness)| (forest.clone(), Some(*fitness)))
            .collect();

        while next.len() < size {
            if self.rng.gen::<f64>() < self.config.crossover_rate {
                let p1 = select_parent(method, &population, tournament_size, policy, &mut self.rng);
                let p2 = select_parent(method, &population, tournament_size, policy, &mut self.rng);
                let children = crossover(
                    &population[p1],
                    &population[p2],
                    policy,
                    max_depth,
                    &mut self.rng,
                );
                for child in children {
                    if next.len() < size {
                        next.push((child, None));
                    }
                }
            } else {
                let parent = select_parent(method, &population, tournament_size, policy, &mut self.rng);
                let child = mutate(&population[parent].0, &self.builder, &mut self.rng);
                next.push((child, None));
            }
        }

        // the final outcome still reports the last evaluated generation
        self.population = population;
        next
    }
}
