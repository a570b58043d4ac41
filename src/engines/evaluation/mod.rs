pub mod ensemble;
pub mod evaluator;

pub use ensemble::Ensemble;
pub use evaluator::ConcurrentEvaluator;
