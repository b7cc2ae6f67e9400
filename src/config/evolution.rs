use super::traits::ConfigSection;
use crate::engines::metrics::FitnessPolicy;
use crate::error::{M3gpError, Result};
use crate::types::{Operator, TerminalKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub runs: usize,
    pub max_depth: usize,
    pub operators: Vec<String>,
    /// `x<i>` and `r` entries; empty means every feature plus `r`
    pub terminals: Vec<String>,
    pub terminal_rate: f64,
    pub tournament_fraction: f64,
    pub elitism_fraction: f64,
    pub crossover_rate: f64,
    pub tree_generation: TreeGeneration,
    pub fitness: FitnessPolicy,
    pub selection_method: SelectionMethod,
    pub prune_best: bool,
    pub parallel: bool,
    pub seed: Option<u64>,
}

/// Initial population strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeGeneration {
    Grow,
    Full,
    Ramped, // half-and-half
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Best stored fitness among the drawn individuals
    Tournament,
    /// Lowest drawn index of a best-first sorted population
    SortedIndex,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 500,
            generations: 20,
            runs: 10,
            max_depth: 6,
            operators: Operator::all().iter().map(|op| op.symbol().to_string()).collect(),
            terminals: Vec::new(),
            terminal_rate: 0.3,
            tournament_fraction: 0.01,
            elitism_fraction: 0.002,
            crossover_rate: 0.5,
            tree_generation: TreeGeneration::Ramped,
            fitness: FitnessPolicy::AccuracyMinusSize,
            selection_method: SelectionMethod::Tournament,
            prune_best: true,
            parallel: true,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Tournament size derived from the fraction, at least 1
    pub fn tournament_size(&self) -> usize {
        ((self.tournament_fraction * self.population_size as f64).round() as usize).max(1)
    }

    /// Number of elites, at least 1 so the best individual always survives
    pub fn elite_count(&self) -> usize {
        ((self.elitism_fraction * self.population_size as f64) as usize).max(1)
    }

    pub fn parsed_operators(&self) -> Result<Vec<Operator>> {
        self.operators.iter().map(|s| Operator::parse(s)).collect()
    }

    /// Terminal set for a dataset with `num_features` columns
    pub fn parsed_terminals(&self, num_features: usize) -> Result<Vec<TerminalKind>> {
        if self.terminals.is_empty() {
            let mut terminals: Vec<TerminalKind> =
                (0..num_features).map(TerminalKind::Variable).collect();
            terminals.push(TerminalKind::RandomConstant);
            return Ok(terminals);
        }

        let terminals = self
            .terminals
            .iter()
            .map(|s| TerminalKind::parse(s))
            .collect::<Result<Vec<_>>>()?;

        for terminal in &terminals {
            if let TerminalKind::Variable(i) = terminal {
                if *i >= num_features {
                    return Err(M3gpError::Configuration(format!(
                        "terminals: x{} is out of range for {} features",
                        i, num_features
                    )));
                }
            }
        }
        Ok(terminals)
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(M3gpError::Configuration(
                "population_size must be at least 2".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(M3gpError::Configuration(
                "generations must be at least 1".to_string(),
            ));
        }
        if self.runs == 0 {
            return Err(M3gpError::Configuration("runs must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(M3gpError::Configuration(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if !(self.tournament_fraction > 0.0) {
            return Err(M3gpError::Configuration(
                "tournament_fraction must be positive".to_string(),
            ));
        }
        if self.tournament_size() > self.population_size {
            return Err(M3gpError::Configuration(format!(
                "tournament_fraction {} gives a tournament of {} for a population of {}",
                self.tournament_fraction,
                self.tournament_size(),
                self.population_size
            )));
        }
        if !(0.0..1.0).contains(&self.elitism_fraction) {
            return Err(M3gpError::Configuration(
                "elitism_fraction must be in [0, 1)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(M3gpError::Configuration(
                "crossover_rate must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.terminal_rate) {
            return Err(M3gpError::Configuration(
                "terminal_rate must be between 0 and 1".to_string(),
            ));
        }
        if self.operators.is_empty() {
            return Err(M3gpError::Configuration(
                "operators must not be empty".to_string(),
            ));
        }
        self.parsed_operators()?;
        for terminal in &self.terminals {
            TerminalKind::parse(terminal)?;
        }
        Ok(())
    }
}
