use crate::config::PruneStrategy;
use crate::types::{votes_per_label, Individual};

/// Greedy backward elimination over an assembled ensemble.
///
/// Members are tried for removal last-selected first. A removal is kept only
/// when the reduced ensemble scores strictly better; removals that would leave
/// a label without votes are never tried. The returned fitness is never below
/// the fitness of the input ensemble.
#[derive(Debug, Clone, Copy)]
pub struct Pruner {
    strategy: PruneStrategy,
    num_labels: usize,
}

#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub members: Vec<Individual>,
    pub fitness: f64,
    pub removed: usize,
}

impl Pruner {
    pub fn new(strategy: PruneStrategy, num_labels: usize) -> Self {
        Self { strategy, num_labels }
    }

    /// `score` rebuilds and scores an ensemble from a member list.
    pub fn prune<F>(&self, members: Vec<Individual>, mut score: F) -> PruneOutcome
    where
        F: FnMut(&[Individual]) -> f64,
    {
        let original_size = members.len();
        let mut best = members;
        let mut best_fitness = score(&best);

        let max_failures = (0.1 * original_size as f64).round() as usize;
        let mut failures = 0;

        let mut index = best.len();
        while index > 0 && best.len() > 1 {
            index -= 1;
            if index >= best.len() {
                continue;
            }

            let mut candidate = best.clone();
            candidate.remove(index);
            if votes_per_label(&candidate, self.num_labels).contains(&0) {
                continue;
            }

            let fitness = score(&candidate);
            if fitness > best_fitness {
                log::debug!("Pruning member {}: {:.4} -> {:.4}", index, best_fitness, fitness);
                best = candidate;
                best_fitness = fitness;
                failures = 0;
            } else {
                failures += 1;
                if self.strategy == PruneStrategy::EarlyStop && failures > max_failures {
                    break;
                }
            }
        }

        let removed = original_size - best.len();
        log::info!(
            "Pruning removed {} of {} members, fitness {:.4}",
            removed,
            original_size,
            best_fitness
        );
        PruneOutcome {
            members: best,
            fitness: best_fitness,
            removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Genotype;

    fn members() -> Vec<Individual> {
        vec![
            Individual::with_fitness(Genotype::from_active(3, &[0, 1]), 0, 0.9),
            Individual::with_fitness(Genotype::from_active(3, &[1, 2]), 0, 0.8),
            Individual::with_fitness(Genotype::from_active(3, &[0, 2]), 0, 0.7),
            Individual::with_fitness(Genotype::from_active(3, &[0, 1]), 1, 0.6),
        ]
    }

    /// Smaller ensembles score higher.
    fn prefer_small(list: &[Individual]) -> f64 {
        1.0 / list.len() as f64
    }

    #[test]
    fn test_removes_members_that_hurt() {
        let pruner = Pruner::new(PruneStrategy::SinglePass, 3);
        let outcome = pruner.prune(members(), prefer_small);
        assert_eq!(outcome.members.len(), 2);
        assert_eq!(outcome.removed, 2);
        assert!(votes_per_label(&outcome.members, 3).iter().all(|&v| v > 0));
        assert_eq!(outcome.fitness, 0.5);
    }

    #[test]
    fn test_keeps_all_when_nothing_improves() {
        let pruner = Pruner::new(PruneStrategy::SinglePass, 3);
        let outcome = pruner.prune(members(), |list| list.len() as f64);
        assert_eq!(outcome.members.len(), 4);
        assert_eq!(outcome.fitness, 4.0);
    }

    #[test]
    fn test_early_stop_limits_attempts() {
        let pruner = Pruner::new(PruneStrategy::EarlyStop, 3);
        let mut calls = 0;
        // round(0.1 * 4) = 0 failures tolerated, so the first miss stops the scan
        pruner.prune(members(), |list| {
            calls += 1;
            list.len() as f64
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_never_uncovers_a_label() {
        let pruner = Pruner::new(PruneStrategy::SinglePass, 3);
        let single = vec![
            Individual::with_fitness(Genotype::from_active(3, &[0, 1]), 0, 0.9),
            Individual::with_fitness(Genotype::from_active(3, &[2]), 0, 0.8),
        ];
        let outcome = pruner.prune(single, prefer_small);
        assert_eq!(outcome.members.len(), 2);
    }
}
