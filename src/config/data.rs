use super::traits::ConfigSection;
use crate::error::CoevoError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalType {
    /// Individuals are validated on their own subpopulation's training view.
    Train,
    /// Individuals are validated on the full training data.
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub train_dataset: PathBuf,
    pub test_dataset: Option<PathBuf>,
    /// Labels are the last `num_labels` columns unless `label_columns` is given.
    pub num_labels: Option<usize>,
    pub label_columns: Option<Vec<String>>,
    pub sampling_ratio: f64,
    pub eval_type: EvalType,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_dataset: PathBuf::from("data/train.csv"),
            test_dataset: None,
            num_labels: None,
            label_columns: None,
            sampling_ratio: 0.75,
            eval_type: EvalType::Train,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), CoevoError> {
        if self.sampling_ratio <= 0.0 || self.sampling_ratio > 1.0 {
            return Err(CoevoError::Configuration(
                "sampling_ratio must be in (0, 1]".to_string(),
            ));
        }
        match (&self.num_labels, &self.label_columns) {
            (None, None) => Err(CoevoError::Configuration(
                "Either data.num_labels or data.label_columns must be set".to_string(),
            )),
            (Some(0), _) => Err(CoevoError::Configuration(
                "data.num_labels must be positive".to_string(),
            )),
            (_, Some(cols)) if cols.is_empty() => Err(CoevoError::Configuration(
                "data.label_columns must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
