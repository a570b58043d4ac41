use super::traits::ConfigSection;
use crate::error::CoevoError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Total number of individuals across all subpopulations.
    pub population_size: usize,
    pub num_subpopulations: usize,
    pub max_generations: usize,
    pub tournament_size: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub seed: Option<u64>,
    /// Worker threads for fitness evaluation; `None` uses the available parallelism.
    pub evaluator_threads: Option<usize>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 60,
            num_subpopulations: 3,
            max_generations: 50,
            tournament_size: 2,
            crossover_probability: 0.8,
            mutation_probability: 0.2,
            seed: Some(1),
            evaluator_threads: None,
        }
    }
}

impl EvolutionConfig {
    /// Target size of every subpopulation.
    pub fn subpop_size(&self) -> usize {
        (self.population_size as f64 / self.num_subpopulations.max(1) as f64).round() as usize
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), CoevoError> {
        if self.num_subpopulations == 0 {
            return Err(CoevoError::Configuration(
                "At least one subpopulation is required".to_string(),
            ));
        }
        if self.subpop_size() < 2 {
            return Err(CoevoError::Configuration(format!(
                "Population size {} leaves fewer than 2 individuals per subpopulation",
                self.population_size
            )));
        }
        if self.tournament_size == 0 {
            return Err(CoevoError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        if self.evaluator_threads == Some(0) {
            return Err(CoevoError::Configuration(
                "Evaluator thread count must be positive".to_string(),
            ));
        }
        super::traits::check_probability("evolution", "crossover_probability", self.crossover_probability)?;
        super::traits::check_probability("evolution", "mutation_probability", self.mutation_probability)?;
        Ok(())
    }
}
