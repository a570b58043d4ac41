pub mod cache;
pub mod connectors;
pub mod dataset;

pub use cache::{FitnessCache, FitnessStore, ModelCache, ModelStore, TabuSet};
pub use connectors::{CsvConnector, DatasetMetadata, LabelSelection};
pub use dataset::MultiLabelDataset;
