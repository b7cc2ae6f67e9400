use crate::config::SelectionMethod;
use crate::data::Dataset;
use crate::engines::evaluation::Forest;
use crate::engines::generation::tree_builder::TreeBuilder;
use crate::engines::metrics::FitnessPolicy;
use crate::types::{Node, NodePath};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

/// Tournament selection: index of the best of K random draws (with replacement)
pub fn tournament_selection<R: Rng>(
    population: &[(Forest, f64)],
    tournament_size: usize,
    policy: FitnessPolicy,
    rng: &mut R,
) -> usize {
    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_fitness = population[best_idx].1;

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        // NaN ranks last, so a NaN first draw never holds the tournament
        if policy.rank(population[idx].1, best_fitness) == Ordering::Less {
            best_idx = idx;
            best_fitness = population[idx].1;
        }
    }

    best_idx
}

/// Tournament on a population already sorted best-first: the smallest of K
/// random indices wins, without looking at fitness values
pub fn sorted_index_selection<R: Rng>(
    population_len: usize,
    tournament_size: usize,
    rng: &mut R,
) -> usize {
    let mut pick = rng.gen_range(0..population_len);
    for _ in 1..tournament_size {
        pick = pick.min(rng.gen_range(0..population_len));
    }
    pick
}

pub fn select_parent<R: Rng>(
    method: SelectionMethod,
    population: &[(Forest, f64)],
    tournament_size: usize,
    policy: FitnessPolicy,
    rng: &mut R,
) -> usize {
    match method {
        SelectionMethod::Tournament => {
            tournament_selection(population, tournament_size, policy, rng)
        }
        SelectionMethod::SortedIndex => {
            sorted_index_selection(population.len(), tournament_size, rng)
        }
    }
}

fn random_path<R: Rng>(node: &Node, rng: &mut R) -> NodePath {
    node.paths().choose(rng).cloned().unwrap_or_default()
}

/// Crossover on copies of both parents, given with their stored fitness.
///
/// Half of the time one whole dimension is exchanged; otherwise a random
/// sub-tree of one dimension of each parent is swapped. A child deeper than
/// `max_depth` is replaced by a copy of the better parent.
pub fn crossover<R: Rng>(
    parent1: &(Forest, f64),
    parent2: &(Forest, f64),
    policy: FitnessPolicy,
    max_depth: usize,
    rng: &mut R,
) -> [Forest; 2] {
    let mut dims1 = parent1.0.clone_dimensions();
    let mut dims2 = parent2.0.clone_dimensions();
    let i = rng.gen_range(0..dims1.len());
    let j = rng.gen_range(0..dims2.len());

    if rng.gen_bool(0.5) {
        std::mem::swap(&mut dims1[i], &mut dims2[j]);
    } else {
        let path1 = random_path(&dims1[i], rng);
        let path2 = random_path(&dims2[j], rng);

        let sub1 = dims1[i].subtree(&path1).cloned();
        let sub2 = dims2[j].subtree(&path2).cloned();
        if let (Some(sub1), Some(sub2)) = (sub1, sub2) {
            dims1[i].replace_subtree(&path1, sub2);
            dims2[j].replace_subtree(&path2, sub1);
        }
    }

    // ties keep the first parent
    let better = if policy.rank(parent2.1, parent1.1) == Ordering::Less {
        &parent2.0
    } else {
        &parent1.0
    };
    [
        checked_child(dims1, better, max_depth),
        checked_child(dims2, better, max_depth),
    ]
}

fn checked_child(dimensions: Vec<Node>, fallback: &Forest, max_depth: usize) -> Forest {
    let too_deep = dimensions.iter().any(|d| d.depth() > max_depth);
    if dimensions.is_empty() || too_deep {
        Forest::from_dimensions(fallback.clone_dimensions())
    } else {
        Forest::from_dimensions(dimensions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ReplaceSubtree,
    AddDimension,
    RemoveDimension,
}

/// Mutation on a copy of `parent`, kind chosen uniformly
pub fn mutate<R: Rng>(parent: &Forest, builder: &TreeBuilder, rng: &mut R) -> Forest {
    let kind = match rng.gen_range(0..3) {
        0 => MutationKind::ReplaceSubtree,
        1 => MutationKind::AddDimension,
        _ => MutationKind::RemoveDimension,
    };
    mutate_with(parent, kind, builder, rng)
}

pub fn mutate_with<R: Rng>(
    parent: &Forest,
    kind: MutationKind,
    builder: &TreeBuilder,
    rng: &mut R,
) -> Forest {
    let max_depth = builder.max_depth();
    let mut dims = parent.clone_dimensions();

    match kind {
        MutationKind::AddDimension => {
            dims.push(builder.grow(max_depth, rng));
        }
        MutationKind::RemoveDimension if dims.len() > 1 => {
            let index = rng.gen_range(0..dims.len());
            dims.remove(index);
        }
        // a single dimension cannot be removed, replace a sub-tree instead
        MutationKind::ReplaceSubtree | MutationKind::RemoveDimension => {
            let index = rng.gen_range(0..dims.len());
            let path = random_path(&dims[index], rng);
            let budget = max_depth.saturating_sub(path.len()).max(1);
            let replacement = builder.grow(budget, rng);
            dims[index].replace_subtree(&path, replacement);
        }
    }

    checked_child(dims, parent, max_depth)
}

/// Drop dimensions, last to first, whenever doing so does not lower the
/// training fitness. Returns the pruned forest and its fitness.
pub fn prune(forest: &Forest, dataset: &Dataset, policy: FitnessPolicy) -> (Forest, f64) {
    let mut best = forest.clone();
    let mut best_fitness = policy.train(&mut best, dataset);

    for index in (0..forest.num_dimensions()).rev() {
        if best.num_dimensions() <= 1 {
            break;
        }

        let mut dims = best.clone_dimensions();
        dims.remove(index);
        let mut candidate = Forest::from_dimensions(dims);
        let fitness = policy.train(&mut candidate, dataset);

        if !fitness.is_nan() && policy.is_not_worse(fitness, best_fitness) {
            log::trace!("pruned dimension {} ({:.4} -> {:.4})", index, best_fitness, fitness);
            best = candidate;
            best_fitness = fitness;
        }
    }

    (best, best_fitness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeGeneration;
    use crate::types::{Operator, TerminalKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn builder(max_depth: usize) -> TreeBuilder {
        TreeBuilder::new(
            Operator::all(),
            vec![
                TerminalKind::Variable(0),
                TerminalKind::Variable(1),
                TerminalKind::RandomConstant,
            ],
            0.3,
            max_depth,
        )
        .unwrap()
    }

    fn dataset() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let x0 = i as f64 / 20.0;
            features.push(vec![x0, ((i * 7) % 5) as f64]);
            labels.push(if x0 < 0.5 { "a" } else { "b" }.to_string());
        }
        // interleave classes so both appear in the training prefix
        let order: Vec<usize> = (0..10).flat_map(|i| [i, i + 10]).collect();
        let features = order.iter().map(|&i| features[i].clone()).collect();
        let labels = order.iter().map(|&i| labels[i].clone()).collect();
        Dataset::new(features, labels, 0.7).unwrap()
    }

    fn ranked(values: &[f64]) -> Vec<(Forest, f64)> {
        values
            .iter()
            .map(|&v| (Forest::single(Node::constant(v)), v))
            .collect()
    }

    #[test]
    fn test_tournament_picks_best_when_k_is_large() {
        let population = ranked(&[0.1, 0.9, 0.4, 0.3]);
        let mut rng = StdRng::seed_from_u64(5);
        let picks: Vec<usize> = (0..50)
            .map(|_| tournament_selection(&population, 64, FitnessPolicy::Accuracy, &mut rng))
            .collect();
        assert!(picks.iter().all(|&i| i == 1));

        let picks: Vec<usize> = (0..50)
            .map(|_| {
                tournament_selection(&population, 64, FitnessPolicy::MeanDistanceToCentroid, &mut rng)
            })
            .collect();
        assert!(picks.iter().all(|&i| i == 0));
    }

    #[test]
    fn test_tournament_of_one_is_uniform_draw() {
        let population = ranked(&[0.1, 0.9, 0.4, 0.3]);
        let mut rng = StdRng::seed_from_u64(6);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[tournament_selection(&population, 1, FitnessPolicy::Accuracy, &mut rng)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_sorted_index_selection_biases_to_front() {
        let mut rng = StdRng::seed_from_u64(7);
        let picks: Vec<usize> = (0..500).map(|_| sorted_index_selection(10, 5, &mut rng)).collect();
        assert!(picks.iter().all(|&i| i < 10));
        let front = picks.iter().filter(|&&i| i < 5).count();
        assert!(front > 400);
    }

    #[test]
    fn test_crossover_keeps_invariants_and_parents() {
        let b = builder(5);
        let mut rng = StdRng::seed_from_u64(8);
        let population: Vec<(Forest, f64)> = b
            .population(TreeGeneration::Ramped, 10, &mut rng)
            .iter()
            .enumerate()
            .map(|(i, forest)| {
                let forest = mutate_with(forest, MutationKind::AddDimension, &b, &mut rng);
                (forest, i as f64 / 10.0)
            })
            .collect();

        for _ in 0..200 {
            let p1 = &population[rng.gen_range(0..10)];
            let p2 = &population[rng.gen_range(0..10)];
            let before = (p1.0.to_string(), p2.0.to_string());

            let children = crossover(p1, p2, FitnessPolicy::Accuracy, 5, &mut rng);
            for child in &children {
                assert!(child.depth() <= 5);
                assert!(child.num_dimensions() >= 1);
                assert!(!child.has_model());
            }
            assert_eq!(before, (p1.0.to_string(), p2.0.to_string()));
        }
    }

    #[test]
    fn test_crossover_dimension_counts_are_preserved() {
        let p1 = (Forest::new(vec![Node::variable(0), Node::variable(1)]).unwrap(), 0.5);
        let p2 = (Forest::single(Node::constant(0.5)), 0.5);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let [c1, c2] = crossover(&p1, &p2, FitnessPolicy::Accuracy, 3, &mut rng);
            assert_eq!(c1.num_dimensions(), 2);
            assert_eq!(c2.num_dimensions(), 1);
        }
    }

    #[test]
    fn test_too_deep_child_copies_better_parent() {
        // every valid child of these parents mixes x0 and x1 terminals
        let worse = Forest::new(vec![
            Node::operator(
                Operator::Add,
                Node::operator(Operator::Mul, Node::variable(1), Node::variable(1)),
                Node::variable(1),
            ),
            Node::variable(1),
        ])
        .unwrap();
        let better = Forest::new(vec![
            Node::operator(
                Operator::Add,
                Node::variable(0),
                Node::operator(Operator::Sub, Node::variable(0), Node::variable(0)),
            ),
            Node::variable(0),
        ])
        .unwrap();
        let p1 = (worse.clone(), 0.2);
        let p2 = (better.clone(), 0.9);

        let mut rng = StdRng::seed_from_u64(13);
        let mut fallbacks = 0;
        for _ in 0..200 {
            for child in crossover(&p1, &p2, FitnessPolicy::Accuracy, 3, &mut rng) {
                assert!(child.depth() <= 3);
                assert_ne!(child.to_string(), worse.to_string());
                if child.to_string() == better.to_string() {
                    fallbacks += 1;
                }
            }
        }
        assert!(fallbacks > 0);

        // minimising policies prefer the smaller fitness
        let p1 = (better.clone(), 0.2);
        let p2 = (worse.clone(), 0.9);
        for _ in 0..50 {
            for child in crossover(&p1, &p2, FitnessPolicy::MeanDistanceToCentroid, 3, &mut rng) {
                assert_ne!(child.to_string(), worse.to_string());
            }
        }
    }

    #[test]
    fn test_tournament_never_prefers_nan() {
        let population = ranked(&[f64::NAN, 0.2, 0.1]);
        let mut rng = StdRng::seed_from_u64(14);
        for _ in 0..50 {
            let pick = tournament_selection(&population, 64, FitnessPolicy::Accuracy, &mut rng);
            assert_eq!(pick, 1);
        }
    }

    #[test]
    fn test_mutation_keeps_invariants() {
        let b = builder(4);
        let mut rng = StdRng::seed_from_u64(10);
        let mut forest = Forest::single(b.full(4, &mut rng));

        for _ in 0..300 {
            forest = mutate(&forest, &b, &mut rng);
            assert!(forest.depth() <= 4);
            assert!(forest.num_dimensions() >= 1);
            assert!(forest.size() >= forest.num_dimensions());
        }
    }

    #[test]
    fn test_remove_on_single_dimension_falls_back() {
        let b = builder(3);
        let mut rng = StdRng::seed_from_u64(11);
        let forest = Forest::single(Node::variable(0));
        let child = mutate_with(&forest, MutationKind::RemoveDimension, &b, &mut rng);
        assert_eq!(child.num_dimensions(), 1);

        let two = Forest::new(vec![Node::variable(0), Node::variable(1)]).unwrap();
        let child = mutate_with(&two, MutationKind::RemoveDimension, &b, &mut rng);
        assert_eq!(child.num_dimensions(), 1);

        let child = mutate_with(&two, MutationKind::AddDimension, &b, &mut rng);
        assert_eq!(child.num_dimensions(), 3);
    }

    #[test]
    fn test_prune_never_worsens_fitness() {
        let ds = dataset();
        let policy = FitnessPolicy::AccuracyMinusSize;
        let b = builder(3);
        let mut rng = StdRng::seed_from_u64(12);

        for _ in 0..20 {
            let mut dims = vec![Node::variable(0)];
            for _ in 0..3 {
                dims.push(b.grow(3, &mut rng));
            }
            let mut forest = Forest::new(dims).unwrap();
            let before = policy.train(&mut forest, &ds);

            let (mut pruned, fitness) = prune(&forest, &ds, policy);
            assert!(policy.is_not_worse(fitness, before));
            assert_eq!(fitness, policy.train(&mut pruned, &ds));
            assert!(pruned.num_dimensions() >= 1);
            assert!(pruned.num_dimensions() <= forest.num_dimensions());
        }
    }

    #[test]
    fn test_prune_removes_useless_dimension() {
        let ds = dataset();
        let forest = Forest::new(vec![Node::variable(0), Node::constant(0.25)]).unwrap();
        let (pruned, _) = prune(&forest, &ds, FitnessPolicy::AccuracyMinusSize);
        assert_eq!(pruned.to_string(), "[x0]");
    }
}
