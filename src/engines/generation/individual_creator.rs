use crate::config::{CreationConfig, CreationStrategy};
use crate::error::{CoevoError, Result};
use crate::types::{exists, Genotype, Individual};
use rand::seq::SliceRandom;
use rand::Rng;

/// Upper bound on resampling attempts per requested individual.
const ATTEMPTS_PER_INDIVIDUAL: usize = 100;

#[derive(Debug, Clone)]
enum Strategy {
    Random,
    FrequencyBased {
        appearances: Vec<usize>,
        floor: usize,
        ceiling: Option<usize>,
    },
}

/// Produces the genotypes of new individuals.
///
/// Every genotype has between `k_min` and `k_max` active labels
/// (both equal `k` unless variable cardinality is configured).
#[derive(Debug, Clone)]
pub struct IndividualCreator {
    num_labels: usize,
    k_min: usize,
    k_max: usize,
    strategy: Strategy,
}

impl IndividualCreator {
    pub fn random(num_labels: usize, k_min: usize, k_max: usize) -> Self {
        Self {
            num_labels,
            k_min: k_min.min(num_labels),
            k_max: k_max.min(num_labels),
            strategy: Strategy::Random,
        }
    }

    /// `appearances[l]` is the number of training instances where label `l` is relevant.
    /// `floor` and `ceiling` bound the active slots given to each label.
    pub fn frequency_based(
        appearances: Vec<usize>,
        k_min: usize,
        k_max: usize,
        floor: usize,
        ceiling: Option<usize>,
    ) -> Self {
        let num_labels = appearances.len();
        Self {
            num_labels,
            k_min: k_min.min(num_labels),
            k_max: k_max.min(num_labels),
            strategy: Strategy::FrequencyBased {
                appearances,
                floor,
                ceiling,
            },
        }
    }

    pub fn from_config(config: &CreationConfig, appearances: Vec<usize>) -> Self {
        let (k_min, k_max) = config.k_bounds();
        match config.strategy {
            CreationStrategy::Random => Self::random(appearances.len(), k_min, k_max),
            CreationStrategy::FrequencyBased => Self::frequency_based(
                appearances,
                k_min,
                k_max,
                config.min_label_slots,
                config.max_label_slots,
            ),
        }
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn k_bounds(&self) -> (usize, usize) {
        (self.k_min, self.k_max)
    }

    /// `n` new unevaluated individuals for subpopulation `subpop`.
    pub fn provide<R: Rng>(&self, subpop: usize, n: usize, rng: &mut R) -> Result<Vec<Individual>> {
        let genotypes = match &self.strategy {
            Strategy::Random => self.unique_random(n, &[], rng),
            Strategy::FrequencyBased {
                appearances,
                floor,
                ceiling,
            } => {
                let sizes: Vec<usize> = (0..n).map(|_| self.sample_size(rng)).collect();
                let ceiling = ceiling.unwrap_or(n).min(n);
                let mut slots = self.allocate_slots(appearances, &sizes, *floor, ceiling, rng)?;
                let label_sets = self.assign_slots(appearances, &sizes, &mut slots, ceiling, rng);
                self.replace_repeated(label_sets, ceiling, rng)
            }
        };

        Ok(genotypes
            .into_iter()
            .map(|g| Individual::new(g, subpop))
            .collect())
    }

    /// `n` random individuals whose genotypes are new to each other and to `existing`.
    pub fn provide_random<R: Rng>(
        &self,
        subpop: usize,
        n: usize,
        existing: &[Individual],
        rng: &mut R,
    ) -> Vec<Individual> {
        let taken: Vec<Genotype> = existing.iter().map(|i| i.genotype().clone()).collect();
        self.unique_random(n, &taken, rng)
            .into_iter()
            .map(|g| Individual::new(g, subpop))
            .collect()
    }

    pub fn random_genotype<R: Rng>(&self, rng: &mut R) -> Genotype {
        let size = self.sample_size(rng);
        let mut labels: Vec<usize> = (0..self.num_labels).collect();
        labels.shuffle(rng);
        Genotype::from_active(self.num_labels, &labels[..size])
    }

    /// Random genotype that activates `label`.
    pub fn random_genotype_with<R: Rng>(&self, label: usize, rng: &mut R) -> Genotype {
        let size = self.sample_size(rng).max(1);
        let mut others: Vec<usize> = (0..self.num_labels).filter(|&l| l != label).collect();
        others.shuffle(rng);
        let mut active = vec![label];
        active.extend(others.into_iter().take(size - 1));
        Genotype::from_active(self.num_labels, &active)
    }

    fn sample_size<R: Rng>(&self, rng: &mut R) -> usize {
        if self.k_min >= self.k_max {
            self.k_max
        } else {
            rng.gen_range(self.k_min..=self.k_max)
        }
    }

    fn unique_random<R: Rng>(&self, n: usize, taken: &[Genotype], rng: &mut R) -> Vec<Genotype> {
        let mut created: Vec<Genotype> = Vec::with_capacity(n);
        let mut attempts = 0;
        while created.len() < n {
            let genotype = self.random_genotype(rng);
            attempts += 1;
            let repeated = created.contains(&genotype) || taken.contains(&genotype);
            if !repeated || attempts > ATTEMPTS_PER_INDIVIDUAL * n {
                if repeated {
                    log::warn!("Could not find a new genotype after {} attempts, keeping a duplicate", attempts);
                }
                created.push(genotype);
            }
        }
        created
    }

    /// Number of active slots per label: a floor for every label, the rest
    /// proportional to frequency, never more than `ceiling`.
    fn allocate_slots<R: Rng>(
        &self,
        appearances: &[usize],
        sizes: &[usize],
        floor: usize,
        ceiling: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let num_labels = self.num_labels;
        let total: usize = sizes.iter().sum();
        if num_labels == 0 {
            return Ok(Vec::new());
        }
        if ceiling * num_labels < total {
            return Err(CoevoError::Configuration(format!(
                "Cannot spread {} label slots over {} labels with at most {} slots each",
                total, num_labels, ceiling
            )));
        }

        let floor = floor.min(total / num_labels).min(ceiling);
        let mut shared = vec![floor; num_labels];
        let mut to_share = (total - floor * num_labels) as i64;
        let mut capped: Vec<bool> = shared.iter().map(|&s| s >= ceiling).collect();

        loop {
            let remaining = to_share as f64;
            let ratio = recalculate_ratio(appearances, &capped);
            let mut capped_now = false;

            for label in 0..num_labels {
                if capped[label] {
                    continue;
                }
                let mut corresponding = (ratio[label] * remaining).round() as usize;
                if shared[label] + corresponding > ceiling {
                    corresponding = ceiling - shared[label];
                    capped[label] = true;
                    capped_now = true;
                }
                shared[label] += corresponding;
                to_share -= corresponding as i64;
            }

            if !capped_now || capped.iter().all(|&c| c) {
                break;
            }
        }

        if to_share > 0 {
            add_to_minority(&mut shared, to_share as usize, ceiling, rng);
        } else if to_share < 0 {
            remove_from_majority(&mut shared, to_share.unsigned_abs() as usize, floor, rng);
        }

        Ok(shared)
    }

    /// Gives each individual `sizes[i]` distinct labels, consuming `slots`.
    /// Labels are placed in descending frequency order onto shuffled individuals.
    fn assign_slots<R: Rng>(
        &self,
        appearances: &[usize],
        sizes: &[usize],
        slots: &mut [usize],
        ceiling: usize,
        rng: &mut R,
    ) -> Vec<Vec<usize>> {
        let n = sizes.len();
        let mut individuals: Vec<Vec<usize>> = sizes.iter().map(|&s| Vec::with_capacity(s)).collect();
        let mut placed = vec![0usize; self.num_labels];

        let mut order: Vec<usize> = (0..self.num_labels).collect();
        order.sort_by(|a, b| appearances[*b].cmp(&appearances[*a]).then(a.cmp(b)));

        for &label in &order {
            let mut shuffled: Vec<usize> = (0..n).collect();
            shuffled.shuffle(rng);

            for &i in &shuffled {
                if slots[label] == 0 {
                    break;
                }
                if individuals[i].len() < sizes[i] {
                    individuals[i].push(label);
                    placed[label] += 1;
                    slots[label] -= 1;
                }
            }

            // Individuals with room already hold `label`: make room through swaps.
            while slots[label] > 0 {
                let Some(open) = shuffled.iter().copied().find(|&i| individuals[i].len() < sizes[i]) else {
                    break;
                };
                let donor = shuffled
                    .iter()
                    .copied()
                    .find(|&i| individuals[i].len() == sizes[i] && !individuals[i].contains(&label));

                match donor {
                    Some(donor) => {
                        let mut candidates = individuals[donor].clone();
                        candidates.shuffle(rng);
                        if let Some(moved) = candidates.into_iter().find(|l| !individuals[open].contains(l)) {
                            individuals[donor].retain(|&l| l != moved);
                            individuals[donor].push(label);
                            individuals[open].push(moved);
                            placed[label] += 1;
                        }
                        slots[label] -= 1;
                    }
                    None => {
                        if let Some(extra) = self.pick_label(&individuals[open], &placed, ceiling, rng) {
                            individuals[open].push(extra);
                            placed[extra] += 1;
                        }
                        slots[label] -= 1;
                    }
                }
            }
        }

        for i in 0..n {
            while individuals[i].len() < sizes[i] {
                match self.pick_label(&individuals[i], &placed, ceiling, rng) {
                    Some(extra) => {
                        individuals[i].push(extra);
                        placed[extra] += 1;
                    }
                    None => break,
                }
            }
        }

        individuals
    }

    /// Random label not in `current`, preferring labels below the ceiling.
    fn pick_label<R: Rng>(
        &self,
        current: &[usize],
        placed: &[usize],
        ceiling: usize,
        rng: &mut R,
    ) -> Option<usize> {
        let free: Vec<usize> = (0..self.num_labels).filter(|l| !current.contains(l)).collect();
        let below: Vec<usize> = free.iter().copied().filter(|&l| placed[l] < ceiling).collect();
        if below.is_empty() {
            free.choose(rng).copied()
        } else {
            below.choose(rng).copied()
        }
    }

    /// Replaces repeated genotypes with random ones that keep every label
    /// within the ceiling. Duplicates are kept when no such genotype is found.
    fn replace_repeated<R: Rng>(
        &self,
        label_sets: Vec<Vec<usize>>,
        ceiling: usize,
        rng: &mut R,
    ) -> Vec<Genotype> {
        let mut placed = vec![0usize; self.num_labels];
        for set in &label_sets {
            for &l in set {
                placed[l] += 1;
            }
        }

        let mut genotypes: Vec<Genotype> = label_sets
            .iter()
            .map(|set| Genotype::from_active(self.num_labels, set))
            .collect();

        for i in 0..genotypes.len() {
            if !genotypes[..i].contains(&genotypes[i]) {
                continue;
            }
            let size = genotypes[i].active_count();
            for &l in &genotypes[i].active_labels() {
                placed[l] -= 1;
            }

            let mut replacement = None;
            for _ in 0..ATTEMPTS_PER_INDIVIDUAL {
                let mut labels: Vec<usize> = (0..self.num_labels).filter(|&l| placed[l] < ceiling).collect();
                if labels.len() < size {
                    break;
                }
                labels.shuffle(rng);
                let candidate = Genotype::from_active(self.num_labels, &labels[..size]);
                if !genotypes.contains(&candidate) {
                    replacement = Some(candidate);
                    break;
                }
            }

            match replacement {
                Some(candidate) => genotypes[i] = candidate,
                None => log::warn!(
                    "No unique genotype within the label ceiling, keeping duplicate {}",
                    genotypes[i]
                ),
            }
            for &l in &genotypes[i].active_labels() {
                placed[l] += 1;
            }
        }

        genotypes
    }
}

/// Share of each label among the labels that are not excluded.
fn recalculate_ratio(appearances: &[usize], excluded: &[bool]) -> Vec<f64> {
    let open = excluded.iter().filter(|&&e| !e).count();
    let total: usize = appearances
        .iter()
        .zip(excluded)
        .filter(|(_, &e)| !e)
        .map(|(&a, _)| a)
        .sum();

    appearances
        .iter()
        .zip(excluded)
        .map(|(&a, &e)| {
            if e {
                0.0
            } else if total == 0 {
                1.0 / open as f64
            } else {
                a as f64 / total as f64
            }
        })
        .collect()
}

/// Adds `n` slots, one at a time to the least-served labels below `ceiling`.
fn add_to_minority<R: Rng>(shared: &mut [usize], mut n: usize, ceiling: usize, rng: &mut R) {
    while n > 0 {
        let Some(min) = shared.iter().copied().filter(|&s| s < ceiling).min() else {
            return;
        };
        let mut minima: Vec<usize> = (0..shared.len()).filter(|&l| shared[l] == min).collect();
        minima.shuffle(rng);
        for l in minima.into_iter().take(n) {
            shared[l] += 1;
            n -= 1;
        }
    }
}

/// Removes `n` slots, one at a time from the most-served labels above `floor`.
fn remove_from_majority<R: Rng>(shared: &mut [usize], mut n: usize, floor: usize, rng: &mut R) {
    while n > 0 {
        let Some(max) = shared.iter().copied().filter(|&s| s > floor).max() else {
            return;
        };
        let mut maxima: Vec<usize> = (0..shared.len()).filter(|&l| shared[l] == max).collect();
        maxima.shuffle(rng);
        for l in maxima.into_iter().take(n) {
            shared[l] -= 1;
            n -= 1;
        }
    }
}

/// Per-subpopulation label-coverage guard: for every label no member of
/// `subpop` activates, appends a new random individual that activates it.
/// Returns the labels that were repaired.
pub fn ensure_label_coverage<R: Rng>(
    creator: &IndividualCreator,
    subpop_id: usize,
    subpop: &mut Vec<Individual>,
    rng: &mut R,
) -> Vec<usize> {
    let mut votes = crate::types::votes_per_label(subpop, creator.num_labels());
    let mut repaired = Vec::new();
    for label in 0..votes.len() {
        if votes[label] > 0 {
            continue;
        }
        let mut genotype = creator.random_genotype_with(label, rng);
        for _ in 0..ATTEMPTS_PER_INDIVIDUAL {
            let candidate = Individual::new(genotype.clone(), subpop_id);
            if !exists(&candidate, subpop) {
                break;
            }
            genotype = creator.random_genotype_with(label, rng);
        }
        for l in genotype.active_labels() {
            votes[l] += 1;
        }
        subpop.push(Individual::new(genotype, subpop_id));
        repaired.push(label);
    }
    if !repaired.is_empty() {
        log::warn!("Subpopulation {}: added individuals for uncovered labels {:?}", subpop_id, repaired);
    }
    repaired
}
