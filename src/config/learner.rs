use super::traits::ConfigSection;
use crate::engines::metrics::Measure;
use crate::error::CoevoError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub neighbours: usize,
    pub measure: Measure,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            neighbours: 5,
            measure: Measure::ExampleBasedFMeasure,
        }
    }
}

impl ConfigSection for LearnerConfig {
    fn section_name() -> &'static str {
        "learner"
    }

    fn validate(&self) -> Result<(), CoevoError> {
        if self.neighbours == 0 {
            return Err(CoevoError::Configuration(
                "learner.neighbours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
