pub mod communication;
pub mod creation;
pub mod data;
pub mod ensemble;
pub mod evolution;
pub mod learner;
pub mod manager;
pub mod traits;

pub use communication::{CommunicationConfig, CommunicationKind};
pub use creation::{CreationConfig, CreationStrategy};
pub use data::{DataConfig, EvalType};
pub use ensemble::{EnsembleConfig, PruneStrategy};
pub use evolution::EvolutionConfig;
pub use learner::LearnerConfig;
pub use manager::{AppConfig, ConfigManager};
pub use traits::ConfigSection;
