pub mod engine;
pub mod example_based;
pub mod label_based;
pub mod measure;

pub use engine::MetricsEngine;
pub use example_based::ExampleBasedMetrics;
pub use label_based::LabelBasedMetrics;
pub use measure::Measure;
