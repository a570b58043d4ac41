pub mod coevolution_engine;
pub mod communication;
pub mod ensemble_selection;
pub mod individual_creator;
pub mod operators;
pub mod progress;
pub mod pruning;
pub mod subpop_updater;

pub use coevolution_engine::{CoevolutionEngine, CoevolutionResult, EngineState, GenerationRecord};
pub use communication::{merge_best_members, CommunicationStats, Communicator};
pub use ensemble_selection::{
    distance_to_ensemble, expected_votes_total, label_weights, spread_votes_evenly, EnsembleSelector,
};
pub use individual_creator::{ensure_label_coverage, IndividualCreator};
pub use progress::{
    ChannelProgressCallback, ConsoleProgressCallback, ProgressCallback, ProgressMessage,
    SilentProgressCallback,
};
pub use pruning::{PruneOutcome, Pruner};
pub use subpop_updater::SubpopUpdater;
