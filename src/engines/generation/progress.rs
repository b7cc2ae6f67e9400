use crate::engines::metrics::GenerationStats;
use std::sync::mpsc::Sender;

/// Hooks the engine calls while a run progresses
pub trait ProgressCallback {
    fn on_generation_start(&mut self, generation: usize);
    fn on_population_evaluated(&mut self, evaluated: usize, total: usize);
    fn on_generation_complete(&mut self, stats: &GenerationStats);
}

impl<C: ProgressCallback + ?Sized> ProgressCallback for &mut C {
    fn on_generation_start(&mut self, generation: usize) {
        (**self).on_generation_start(generation);
    }

    fn on_population_evaluated(&mut self, evaluated: usize, total: usize) {
        (**self).on_population_evaluated(evaluated, total);
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        (**self).on_generation_complete(stats);
    }
}

/// Reports through the `log` facade
pub struct ConsoleProgressCallback {
    run: Option<usize>,
}

impl ConsoleProgressCallback {
    pub fn new() -> Self {
        Self { run: None }
    }

    /// Prefix every line with the run number
    pub fn for_run(run: usize) -> Self {
        Self { run: Some(run) }
    }

    fn prefix(&self) -> String {
        self.run.map(|run| format!("Run {}: ", run + 1)).unwrap_or_default()
    }
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("{}generation {} starting", self.prefix(), generation + 1);
    }

    fn on_population_evaluated(&mut self, evaluated: usize, total: usize) {
        log::trace!("{}evaluated {}/{} individuals", self.prefix(), evaluated, total);
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        log::info!(
            "{}generation {} complete. Best fitness: {:.4}, train: {:.3}, test: {:.3}, dimensions: {}, size: {}",
            self.prefix(),
            stats.generation + 1,
            stats.best_fitness,
            stats.best_train_accuracy,
            stats.best_test_accuracy,
            stats.best_dimensions,
            stats.best_size
        );
    }
}

/// Discards all progress
pub struct SilentProgressCallback;

impl ProgressCallback for SilentProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_population_evaluated(&mut self, _evaluated: usize, _total: usize) {}
    fn on_generation_complete(&mut self, _stats: &GenerationStats) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    PopulationEvaluated { evaluated: usize, total: usize },
    GenerationComplete(GenerationStats),
}

// For watching a run from another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_population_evaluated(&mut self, evaluated: usize, total: usize) {
        let _ = self
            .sender
            .send(ProgressMessage::PopulationEvaluated { evaluated, total });
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        let _ = self
            .sender
            .send(ProgressMessage::GenerationComplete(stats.clone()));
    }
}
