use super::operators::{crossover, mutate_subpop, select_random_from_other_subpop};
use super::subpop_updater::SubpopUpdater;
use crate::config::{CommunicationConfig, CommunicationKind};
use crate::data::TabuSet;
use crate::error::Result;
use crate::ml::{Scorer, Trainer};
use crate::types::{contains, remove_duplicates, DuplicateMatching, Individual};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What one communication round changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationStats {
    /// Copies added to each subpopulation.
    pub added: Vec<usize>,
    /// Redundant members removed from each subpopulation.
    pub removed: Vec<usize>,
    /// Ensemble members put back into their own subpopulation.
    pub owner_reinserted: usize,
    pub crossovers: usize,
    pub mutations: usize,
    /// Individuals created to restore label coverage.
    pub coverage_repairs: usize,
}

impl CommunicationStats {
    fn new(num_subpops: usize) -> Self {
        Self {
            added: vec![0; num_subpops],
            removed: vec![0; num_subpops],
            ..Default::default()
        }
    }

    pub fn total_added(&self) -> usize {
        self.added.iter().sum()
    }

    pub fn total_removed(&self) -> usize {
        self.removed.iter().sum()
    }
}

/// Adds to `pool` each member of the best ensemble so far that `matching`
/// does not find there, with probability `progress`. Returns how many joined.
pub fn merge_best_members<R: Rng>(
    pool: &mut Vec<Individual>,
    best: &[Individual],
    matching: DuplicateMatching,
    progress: f64,
    rng: &mut R,
) -> usize {
    let mut merged = 0;
    for member in best {
        if !contains(pool, member, matching) && rng.gen_bool(progress.clamp(0.0, 1.0)) {
            pool.push(member.clone());
            merged += 1;
        }
    }
    merged
}

/// Moves genetic material between subpopulations after an ensemble has been
/// built over the whole population.
pub struct Communicator {
    config: CommunicationConfig,
    tabu: TabuSet,
}

impl Communicator {
    pub fn new(config: CommunicationConfig) -> Self {
        Self {
            config,
            tabu: TabuSet::new(),
        }
    }

    pub fn kind(&self) -> CommunicationKind {
        self.config.kind
    }

    pub fn matching(&self) -> DuplicateMatching {
        self.config.duplicate_matching
    }

    pub fn tabu(&self) -> &TabuSet {
        &self.tabu
    }

    /// Communication fires every `iters_communication` generations, never at generation 0.
    pub fn is_due(&self, generation: usize) -> bool {
        self.config.kind != CommunicationKind::None
            && generation > 0
            && generation % self.config.iters_communication == 0
    }

    pub fn communicate<T: Trainer, S: Scorer, R: Rng>(
        &mut self,
        subpops: &mut [Vec<Individual>],
        ensemble: &[Individual],
        progress: f64,
        updater: &SubpopUpdater<'_, T, S>,
        rng: &mut R,
    ) -> Result<CommunicationStats> {
        let stats = match self.config.kind {
            CommunicationKind::None => CommunicationStats::new(subpops.len()),
            CommunicationKind::Exchange => self.exchange(subpops, ensemble, progress, updater, rng)?,
            CommunicationKind::Operators => self.operators(subpops, updater, rng)?,
        };
        log::info!(
            "Communication ({:?}): +{} / -{} copies, {} reinserted, {} crossovers, {} mutations",
            self.config.kind,
            stats.total_added(),
            stats.total_removed(),
            stats.owner_reinserted,
            stats.crossovers,
            stats.mutations
        );
        Ok(stats)
    }

    /// Every distinct ensemble genotype updates every other subpopulation; its
    /// own subpopulation gets it back with probability `progress`.
    fn exchange<T: Trainer, S: Scorer, R: Rng>(
        &mut self,
        subpops: &mut [Vec<Individual>],
        ensemble: &[Individual],
        progress: f64,
        updater: &SubpopUpdater<'_, T, S>,
        rng: &mut R,
    ) -> Result<CommunicationStats> {
        let mut stats = CommunicationStats::new(subpops.len());
        let mut seen: HashSet<String> = HashSet::new();

        for member in ensemble {
            if !seen.insert(member.genotype().canonical()) {
                continue;
            }
            let owner = member.subpop();

            for (p, subpop) in subpops.iter_mut().enumerate() {
                if p != owner {
                    self.update_subpop(p, subpop, member, &mut stats, rng);
                }
            }

            if let Some(own) = subpops.get_mut(owner) {
                if !contains(own, member, self.config.duplicate_matching)
                    && rng.gen_bool(progress.clamp(0.0, 1.0))
                {
                    own.push(member.clone());
                    stats.owner_reinserted += 1;
                }
            }
        }

        stats.coverage_repairs = updater.guard_coverage(subpops, rng);
        updater.normalize(subpops, rng)?;
        Ok(stats)
    }

    /// Removes the member's genotype from `subpop` if present, otherwise adds
    /// a copy with a fixed probability. Recently exchanged genotypes are
    /// usually skipped.
    fn update_subpop<R: Rng>(
        &mut self,
        p: usize,
        subpop: &mut Vec<Individual>,
        member: &Individual,
        stats: &mut CommunicationStats,
        rng: &mut R,
    ) {
        let key = member.key();
        if self.tabu.contains(&key) && rng.gen_bool(self.config.tabu_skip_probability) {
            return;
        }

        if let Some(pos) = subpop.iter().position(|other| other.same_genotype(member)) {
            subpop.remove(pos);
            self.tabu.insert(key);
            stats.removed[p] += 1;
            return;
        }

        if rng.gen_bool(self.config.exchange_copy_probability) {
            let copy = member.copy_into(p);
            self.tabu.insert(copy.key());
            subpop.push(copy);
            stats.added[p] += 1;
        }
    }

    /// Crossover with partners from other subpopulations and subpopulation-moving
    /// mutation. Offspring join the subpopulation named by their tag and are
    /// evaluated there before trimming.
    fn operators<T: Trainer, S: Scorer, R: Rng>(
        &mut self,
        subpops: &mut [Vec<Individual>],
        updater: &SubpopUpdater<'_, T, S>,
        rng: &mut R,
    ) -> Result<CommunicationStats> {
        let mut stats = CommunicationStats::new(subpops.len());
        let mut offspring: Vec<Individual> = Vec::new();

        for (p, subpop) in subpops.iter().enumerate() {
            for ind in subpop {
                if rng.gen_bool(self.config.probability_crossover) {
                    if let Some(partner) = select_random_from_other_subpop(subpops, p, rng) {
                        let (c1, c2) = crossover(ind, partner, rng);
                        offspring.push(c1);
                        offspring.push(c2);
                        stats.crossovers += 1;
                    }
                }
                if rng.gen_bool(self.config.probability_mutation) {
                    offspring.push(mutate_subpop(ind, subpops.len(), rng));
                    stats.mutations += 1;
                }
            }
        }

        for child in offspring {
            let target = child.subpop();
            if let Some(subpop) = subpops.get_mut(target) {
                subpop.push(child);
                stats.added[target] += 1;
            }
        }
        for subpop in subpops.iter_mut() {
            *subpop = remove_duplicates(std::mem::take(subpop));
        }

        stats.coverage_repairs = updater.guard_coverage(subpops, rng);
        updater.normalize(subpops, rng)?;
        Ok(stats)
    }
}
