use super::ensemble_selection::EnsembleSelector;
use super::individual_creator::{ensure_label_coverage, IndividualCreator};
use crate::engines::evaluation::ConcurrentEvaluator;
use crate::error::Result;
use crate::ml::{Scorer, Trainer};
use crate::types::Individual;
use rand::Rng;

/// Brings subpopulations back to their target size.
///
/// Oversized subpopulations are trimmed with the ensemble selector using the
/// update-time beta; undersized ones are topped up with new random
/// individuals, which are evaluated before returning.
pub struct SubpopUpdater<'a, T: Trainer, S: Scorer> {
    pub evaluator: &'a ConcurrentEvaluator<T, S>,
    pub creator: &'a IndividualCreator,
    pub selector: &'a EnsembleSelector,
    pub expected_votes: &'a [usize],
    pub subpop_size: usize,
    pub beta: f64,
}

impl<'a, T: Trainer, S: Scorer> SubpopUpdater<'a, T, S> {
    /// Adds individuals for labels nobody in the subpopulation covers.
    pub fn guard_coverage<R: Rng>(&self, subpops: &mut [Vec<Individual>], rng: &mut R) -> usize {
        subpops
            .iter_mut()
            .enumerate()
            .map(|(p, subpop)| ensure_label_coverage(self.creator, p, subpop, rng).len())
            .sum()
    }

    /// Evaluates pending individuals, then trims or refills every subpopulation.
    pub fn normalize<R: Rng>(&self, subpops: &mut [Vec<Individual>], rng: &mut R) -> Result<()> {
        self.evaluator.evaluate_all(subpops)?;

        for (p, subpop) in subpops.iter_mut().enumerate() {
            if subpop.len() > self.subpop_size {
                let trimmed = self.selector.select(
                    subpop,
                    self.subpop_size,
                    self.expected_votes,
                    self.beta,
                    rng,
                )?;
                log::debug!("Subpopulation {}: trimmed {} -> {}", p, subpop.len(), trimmed.len());
                *subpop = trimmed;
            } else if subpop.len() < self.subpop_size {
                let missing = self.subpop_size - subpop.len();
                let fresh = self.creator.provide_random(p, missing, subpop, rng);
                subpop.extend(fresh);
                self.evaluator.evaluate_batch(subpop)?;
                log::debug!("Subpopulation {}: refilled {} random individuals", p, missing);
            }
        }
        Ok(())
    }
}
