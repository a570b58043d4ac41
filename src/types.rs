use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fitness assigned to an individual whose base classifier could not be trained.
pub const FAILED_FITNESS: f64 = -1.0;

/// Label-activation vector of a base classifier.
///
/// Bit `i` set means the classifier is trained on (and votes for) label `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genotype {
    bits: Vec<bool>,
}

impl Genotype {
    pub fn empty(num_labels: usize) -> Self {
        Self {
            bits: vec![false; num_labels],
        }
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Build a genotype with exactly the given labels active. Out-of-range labels are ignored.
    pub fn from_active(num_labels: usize, active: &[usize]) -> Self {
        let mut genotype = Self::empty(num_labels);
        for &label in active {
            if label < num_labels {
                genotype.bits[label] = true;
            }
        }
        genotype
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn is_active(&self, label: usize) -> bool {
        self.bits.get(label).copied().unwrap_or(false)
    }

    pub fn set(&mut self, label: usize, active: bool) {
        if let Some(bit) = self.bits.get_mut(label) {
            *bit = active;
        }
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.bits.swap(a, b);
    }

    pub fn active_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn active_labels(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| if b { Some(i) } else { None })
            .collect()
    }

    pub fn hamming_distance(&self, other: &Genotype) -> usize {
        self.bits
            .iter()
            .zip(&other.bits)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Hamming distance where each differing label contributes its weight.
    pub fn weighted_distance(&self, other: &Genotype, weights: &[f64]) -> f64 {
        self.bits
            .iter()
            .zip(&other.bits)
            .zip(weights)
            .filter(|((a, b), _)| a != b)
            .map(|(_, w)| *w)
            .sum()
    }

    /// Canonical bit string, e.g. `0110`.
    pub fn canonical(&self) -> String {
        self.bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// One base classifier candidate living in a subpopulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    genotype: Genotype,
    subpop: usize,
    fitness: Option<f64>,
}

impl Individual {
    pub fn new(genotype: Genotype, subpop: usize) -> Self {
        Self {
            genotype,
            subpop,
            fitness: None,
        }
    }

    pub fn with_fitness(genotype: Genotype, subpop: usize, fitness: f64) -> Self {
        Self {
            genotype,
            subpop,
            fitness: Some(fitness),
        }
    }

    pub fn genotype(&self) -> &Genotype {
        &self.genotype
    }

    pub fn subpop(&self) -> usize {
        self.subpop
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.fitness == Some(FAILED_FITNESS)
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Replaces the genotype; the cached fitness no longer applies.
    pub fn set_genotype(&mut self, genotype: Genotype) {
        self.genotype = genotype;
        self.fitness = None;
    }

    /// Moves the individual to another subpopulation. Fitness is tied to the
    /// training view of the subpopulation, so it is cleared on an actual move.
    pub fn set_subpop(&mut self, subpop: usize) {
        if subpop != self.subpop {
            self.subpop = subpop;
            self.fitness = None;
        }
    }

    /// Copy of this individual placed in `subpop`.
    pub fn copy_into(&self, subpop: usize) -> Individual {
        let mut copy = self.clone();
        copy.set_subpop(subpop);
        copy
    }

    pub fn require_fitness(&self) -> Result<f64> {
        self.fitness.ok_or_else(|| CoevoError::Unevaluated(self.key()))
    }

    /// Cache key: subpopulation id followed by the genotype bits.
    pub fn key(&self) -> String {
        cache_key(self.subpop, &self.genotype)
    }

    pub fn same_genotype(&self, other: &Individual) -> bool {
        self.genotype == other.genotype
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fitness {
            Some(fitness) => write!(f, "{} ({:.4})", self.key(), fitness),
            None => write!(f, "{} (-)", self.key()),
        }
    }
}

pub fn cache_key(subpop: usize, genotype: &Genotype) -> String {
    format!("{}:{}", subpop, genotype.canonical())
}

/// How two individuals are compared when looking for duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMatching {
    /// Bitwise-equal genotypes are duplicates regardless of subpopulation.
    #[default]
    Genotype,
    /// Genotype and subpopulation id must both match.
    Strict,
}

impl DuplicateMatching {
    pub fn matches(&self, a: &Individual, b: &Individual) -> bool {
        match self {
            Self::Genotype => a.same_genotype(b),
            Self::Strict => a.subpop == b.subpop && a.same_genotype(b),
        }
    }
}

/// True iff some element of `list` has a bitwise-identical genotype to `ind`.
pub fn exists(ind: &Individual, list: &[Individual]) -> bool {
    list.iter().any(|other| ind.same_genotype(other))
}

pub fn contains(list: &[Individual], ind: &Individual, matching: DuplicateMatching) -> bool {
    list.iter().any(|other| matching.matches(ind, other))
}

/// Keeps the first occurrence of every genotype.
pub fn remove_duplicates(individuals: Vec<Individual>) -> Vec<Individual> {
    let mut unique: Vec<Individual> = Vec::with_capacity(individuals.len());
    for ind in individuals {
        if !exists(&ind, &unique) {
            unique.push(ind);
        }
    }
    unique
}

/// Number of individuals covering each label.
pub fn votes_per_label(individuals: &[Individual], num_labels: usize) -> Vec<usize> {
    let mut votes = vec![0; num_labels];
    for ind in individuals {
        for (label, &bit) in ind.genotype.bits().iter().enumerate().take(num_labels) {
            if bit {
                votes[label] += 1;
            }
        }
    }
    votes
}

/// Number of distinct genotypes with an active-label count in `[k_min, k_max]`.
pub fn distinct_genotypes(num_labels: usize, k_min: usize, k_max: usize) -> u128 {
    (k_min..=k_max.min(num_labels))
        .map(|k| binomial(num_labels as u128, k as u128))
        .fold(0u128, |acc, c| acc.saturating_add(c))
}

fn binomial(n: u128, k: u128) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result.saturating_mul(n - i) / (i + 1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genotype_basics() {
        let g = Genotype::from_active(5, &[1, 3]);
        assert_eq!(g.active_count(), 2);
        assert_eq!(g.active_labels(), vec![1, 3]);
        assert_eq!(g.canonical(), "01010");
        assert!(g.is_active(3));
        assert!(!g.is_active(7));
    }

    #[test]
    fn test_weighted_distance() {
        let a = Genotype::from_active(4, &[0, 1]);
        let b = Genotype::from_active(4, &[1, 2]);
        assert_eq!(a.hamming_distance(&b), 2);
        let w = [0.1, 0.2, 0.3, 0.4];
        assert!((a.weighted_distance(&b, &w) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_key_includes_subpop() {
        let g = Genotype::from_active(3, &[0]);
        let a = Individual::new(g.clone(), 0);
        let b = Individual::new(g, 2);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), "0:100");
        assert!(DuplicateMatching::Genotype.matches(&a, &b));
        assert!(!DuplicateMatching::Strict.matches(&a, &b));
    }

    #[test]
    fn test_exists_iff_bitwise_equal() {
        let list = vec![
            Individual::new(Genotype::from_active(4, &[0, 1]), 0),
            Individual::new(Genotype::from_active(4, &[2, 3]), 1),
        ];
        let same = Individual::new(Genotype::from_active(4, &[2, 3]), 0);
        let other = Individual::new(Genotype::from_active(4, &[1, 3]), 1);
        assert!(exists(&same, &list));
        assert!(!exists(&other, &list));
        assert!(!contains(&list, &same, DuplicateMatching::Strict));
    }

    #[test]
    fn test_moving_clears_fitness() {
        let mut ind = Individual::with_fitness(Genotype::from_active(3, &[1]), 0, 0.7);
        ind.set_subpop(0);
        assert_eq!(ind.fitness(), Some(0.7));
        ind.set_subpop(1);
        assert_eq!(ind.fitness(), None);
    }

    #[test]
    fn test_distinct_genotypes() {
        assert_eq!(distinct_genotypes(4, 2, 2), 6);
        assert_eq!(distinct_genotypes(5, 2, 3), 20);
    }
}
