use super::traits::{check_probability, ConfigSection};
use crate::error::CoevoError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneStrategy {
    /// Try every member once, from last selected to first.
    SinglePass,
    /// Stop once failed removals exceed 10% of the original ensemble size.
    EarlyStop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub num_classifiers: usize,
    pub prediction_threshold: f64,
    pub beta_update_population: f64,
    pub beta_ensemble_selection: f64,
    pub avg_votes_per_label: usize,
    pub prune: bool,
    pub prune_strategy: PruneStrategy,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            num_classifiers: 20,
            prediction_threshold: 0.5,
            beta_update_population: 0.75,
            beta_ensemble_selection: 0.75,
            avg_votes_per_label: 10,
            prune: true,
            prune_strategy: PruneStrategy::EarlyStop,
        }
    }
}

impl ConfigSection for EnsembleConfig {
    fn section_name() -> &'static str {
        "ensemble"
    }

    fn validate(&self) -> Result<(), CoevoError> {
        if self.num_classifiers == 0 {
            return Err(CoevoError::Configuration(
                "num_classifiers must be at least 1".to_string(),
            ));
        }
        if self.avg_votes_per_label == 0 {
            return Err(CoevoError::Configuration(
                "avg_votes_per_label must be at least 1".to_string(),
            ));
        }
        check_probability("ensemble", "prediction_threshold", self.prediction_threshold)?;
        check_probability("ensemble", "beta_update_population", self.beta_update_population)?;
        check_probability("ensemble", "beta_ensemble_selection", self.beta_ensemble_selection)?;
        Ok(())
    }
}
