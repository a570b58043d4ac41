use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoevoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Ensemble selection error: {0}")]
    EnsembleSelection(String),

    #[error("No individual in the pool covers label {label}")]
    UncoveredLabel { label: usize },

    #[error("Individual {0} has no fitness value")]
    Unevaluated(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Evaluation worker panicked: {0}")]
    WorkerPanic(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, CoevoError>;
