use super::traits::{check_probability, ConfigSection};
use crate::error::CoevoError;
use crate::types::DuplicateMatching;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationKind {
    /// Subpopulations never interact; the ensemble is only built at the end.
    None,
    /// Ensemble members are copied to, or removed from, other subpopulations.
    Exchange,
    /// Crossover and subpopulation-reassigning mutation across subpopulations.
    Operators,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationConfig {
    pub kind: CommunicationKind,
    pub iters_communication: usize,
    pub probability_crossover: f64,
    pub probability_mutation: f64,
    pub exchange_copy_probability: f64,
    pub tabu_skip_probability: f64,
    pub duplicate_matching: DuplicateMatching,
}

impl Default for CommunicationConfig {
    fn default() -> Self {
        Self {
            kind: CommunicationKind::Exchange,
            iters_communication: 10,
            probability_crossover: 0.2,
            probability_mutation: 0.2,
            exchange_copy_probability: 0.5,
            tabu_skip_probability: 0.75,
            duplicate_matching: DuplicateMatching::Genotype,
        }
    }
}

impl ConfigSection for CommunicationConfig {
    fn section_name() -> &'static str {
        "communication"
    }

    fn validate(&self) -> Result<(), CoevoError> {
        if self.iters_communication == 0 {
            return Err(CoevoError::Configuration(
                "iters_communication must be at least 1".to_string(),
            ));
        }
        check_probability("communication", "probability_crossover", self.probability_crossover)?;
        check_probability("communication", "probability_mutation", self.probability_mutation)?;
        check_probability("communication", "exchange_copy_probability", self.exchange_copy_probability)?;
        check_probability("communication", "tabu_skip_probability", self.tabu_skip_probability)?;
        Ok(())
    }
}
