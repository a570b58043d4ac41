use super::traits::ConfigSection;
use crate::error::CoevoError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationStrategy {
    Random,
    FrequencyBased,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationConfig {
    pub strategy: CreationStrategy,
    /// Active labels per base classifier (the maximum when `variable` is set).
    pub labels_per_classifier: usize,
    pub variable: bool,
    pub min_labels_per_classifier: usize,
    /// Minimum number of slots every label receives in frequency-based creation.
    pub min_label_slots: usize,
    /// Maximum number of slots per label; defaults to the number of individuals.
    pub max_label_slots: Option<usize>,
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            strategy: CreationStrategy::FrequencyBased,
            labels_per_classifier: 3,
            variable: false,
            min_labels_per_classifier: 2,
            min_label_slots: 1,
            max_label_slots: None,
        }
    }
}

impl CreationConfig {
    /// Inclusive bounds on the active-label count of a genotype.
    pub fn k_bounds(&self) -> (usize, usize) {
        if self.variable {
            (self.min_labels_per_classifier, self.labels_per_classifier)
        } else {
            (self.labels_per_classifier, self.labels_per_classifier)
        }
    }
}

impl ConfigSection for CreationConfig {
    fn section_name() -> &'static str {
        "creation"
    }

    fn validate(&self) -> Result<(), CoevoError> {
        if self.labels_per_classifier == 0 {
            return Err(CoevoError::Configuration(
                "labels_per_classifier must be at least 1".to_string(),
            ));
        }
        if self.variable
            && (self.min_labels_per_classifier == 0
                || self.min_labels_per_classifier > self.labels_per_classifier)
        {
            return Err(CoevoError::Configuration(format!(
                "min_labels_per_classifier must be in [1, {}]",
                self.labels_per_classifier
            )));
        }
        if let Some(max) = self.max_label_slots {
            if max < self.min_label_slots.max(1) {
                return Err(CoevoError::Configuration(
                    "max_label_slots must be at least min_label_slots".to_string(),
                ));
            }
        }
        Ok(())
    }
}
