pub mod batch;
pub mod evolution_engine;
pub mod operators;
pub mod progress;
pub mod tree_builder;

pub use batch::{run_batch, BatchOutcome};
pub use evolution_engine::{EngineState, EvolutionEngine, EvolutionOutcome};
pub use operators::{crossover, mutate, prune, select_parent, MutationKind};
pub use progress::{
    ChannelProgressCallback, ConsoleProgressCallback, ProgressCallback, ProgressMessage,
    SilentProgressCallback,
};
pub use tree_builder::TreeBuilder;
