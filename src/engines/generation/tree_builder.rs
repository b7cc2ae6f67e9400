use crate::config::{EvolutionConfig, TreeGeneration};
use crate::engines::evaluation::Forest;
use crate::error::{M3gpError, Result};
use crate::types::{Node, Operator, TerminalKind};
use rand::seq::SliceRandom;
use rand::Rng;

/// Range of random constants, `[-1, 1)`
const CONSTANT_RANGE: std::ops::Range<f64> = -1.0..1.0;

/// Primitives and limits used to grow random trees
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    operators: Vec<Operator>,
    terminals: Vec<TerminalKind>,
    terminal_rate: f64,
    max_depth: usize,
}

impl TreeBuilder {
    pub fn new(
        operators: Vec<Operator>,
        terminals: Vec<TerminalKind>,
        terminal_rate: f64,
        max_depth: usize,
    ) -> Result<Self> {
        if operators.is_empty() {
            return Err(M3gpError::Configuration("operators must not be empty".to_string()));
        }
        if terminals.is_empty() {
            return Err(M3gpError::Configuration("terminals must not be empty".to_string()));
        }
        if max_depth == 0 {
            return Err(M3gpError::Configuration("max_depth must be at least 1".to_string()));
        }

        Ok(Self {
            operators,
            terminals,
            terminal_rate,
            max_depth,
        })
    }

    /// Primitives from the config, resolved against the dataset width
    pub fn from_config(config: &EvolutionConfig, num_features: usize) -> Result<Self> {
        Self::new(
            config.parsed_operators()?,
            config.parsed_terminals(num_features)?,
            config.terminal_rate,
            config.max_depth,
        )
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn random_terminal<R: Rng>(&self, rng: &mut R) -> Node {
        match self.terminals.choose(rng) {
            Some(TerminalKind::Variable(i)) => Node::variable(*i),
            Some(TerminalKind::RandomConstant) | None => {
                Node::constant(rng.gen_range(CONSTANT_RANGE))
            }
        }
    }

    fn random_operator<R: Rng>(&self, rng: &mut R) -> Operator {
        *self.operators.choose(rng).unwrap_or(&Operator::Add)
    }

    /// Grow method: terminals appear early with probability `terminal_rate`
    pub fn grow<R: Rng>(&self, depth: usize, rng: &mut R) -> Node {
        if depth <= 1 || rng.gen::<f64>() < self.terminal_rate {
            return self.random_terminal(rng);
        }
        let op = self.random_operator(rng);
        let left = self.grow(depth - 1, rng);
        let right = self.grow(depth - 1, rng);
        Node::operator(op, left, right)
    }

    /// Full method: every branch reaches `depth`
    pub fn full<R: Rng>(&self, depth: usize, rng: &mut R) -> Node {
        if depth <= 1 {
            return self.random_terminal(rng);
        }
        let op = self.random_operator(rng);
        let left = self.full(depth - 1, rng);
        let right = self.full(depth - 1, rng);
        Node::operator(op, left, right)
    }

    /// Initial population of single-dimension forests
    pub fn population<R: Rng>(
        &self,
        strategy: TreeGeneration,
        size: usize,
        rng: &mut R,
    ) -> Vec<Forest> {
        (0..size)
            .map(|i| {
                let root = match strategy {
                    TreeGeneration::Grow => self.grow(self.max_depth, rng),
                    TreeGeneration::Full => self.full(self.max_depth, rng),
                    TreeGeneration::Ramped => {
                        let depth = self.ramped_depth(i);
                        if i % 2 == 0 {
                            self.full(depth, rng)
                        } else {
                            self.grow(depth, rng)
                        }
                    }
                };
                Forest::single(root)
            })
            .collect()
    }

    /// Depths cycle through 2..=max_depth
    fn ramped_depth(&self, index: usize) -> usize {
        if self.max_depth < 2 {
            return self.max_depth;
        }
        2 + (index / 2) % (self.max_depth - 1)
    }
}
