use crate::types::{Genotype, Individual};
use rand::seq::SliceRandom;
use rand::Rng;

/// Tournament selection: pick best of K random candidates.
/// Unevaluated individuals count as the worst possible fitness.
pub fn tournament_selection<'a, R: Rng>(
    population: &'a [Individual],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Individual {
    let fitness = |ind: &Individual| ind.fitness().unwrap_or(f64::NEG_INFINITY);

    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_fitness = fitness(&population[best_idx]);

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        if fitness(&population[idx]) > best_fitness {
            best_idx = idx;
            best_fitness = fitness(&population[idx]);
        }
    }

    &population[best_idx]
}

/// Count-preserving crossover.
///
/// Labels active in only one parent are exchanged: half of the smaller
/// exclusive set moves in each direction, so every child keeps its parent's
/// active-label count. Labels shared by both parents stay. With fewer than two
/// exclusive labels on either side the parents are returned unchanged.
/// Children keep their parent's subpopulation and have no fitness.
pub fn crossover<R: Rng>(
    parent1: &Individual,
    parent2: &Individual,
    rng: &mut R,
) -> (Individual, Individual) {
    let g1 = parent1.genotype();
    let g2 = parent2.genotype();

    let mut only1: Vec<usize> = g1.active_labels().into_iter().filter(|&l| !g2.is_active(l)).collect();
    let mut only2: Vec<usize> = g2.active_labels().into_iter().filter(|&l| !g1.is_active(l)).collect();

    let x = only1.len().min(only2.len()) / 2;
    if x == 0 {
        return (parent1.clone(), parent2.clone());
    }

    only1.shuffle(rng);
    only2.shuffle(rng);

    let mut child1 = g1.clone();
    let mut child2 = g2.clone();
    for (&from1, &from2) in only1.iter().zip(&only2).take(x) {
        child1.set(from1, false);
        child1.set(from2, true);
        child2.set(from2, false);
        child2.set(from1, true);
    }

    (
        Individual::new(child1, parent1.subpop()),
        Individual::new(child2, parent2.subpop()),
    )
}

/// Swaps one active and one inactive bit, keeping the active-label count.
/// No-op on genotypes with every bit equal.
pub fn mutate<R: Rng>(individual: &mut Individual, rng: &mut R) {
    if let Some(genotype) = swapped(individual.genotype(), rng) {
        individual.set_genotype(genotype);
    }
}

fn swapped<R: Rng>(genotype: &Genotype, rng: &mut R) -> Option<Genotype> {
    let active = genotype.active_labels();
    let inactive: Vec<usize> = (0..genotype.len()).filter(|&l| !genotype.is_active(l)).collect();

    let a = *active.choose(rng)?;
    let b = *inactive.choose(rng)?;

    let mut mutated = genotype.clone();
    mutated.swap(a, b);
    Some(mutated)
}

/// Bit-swap mutation of a copy that is also moved to a different random subpopulation.
pub fn mutate_subpop<R: Rng>(individual: &Individual, num_subpops: usize, rng: &mut R) -> Individual {
    let mut mutant = individual.clone();
    mutate(&mut mutant, rng);

    if num_subpops > 1 {
        let mut target = rng.gen_range(0..num_subpops - 1);
        if target >= individual.subpop() {
            target += 1;
        }
        mutant.set_subpop(target);
    }
    mutant
}

/// Random individual from any subpopulation other than `exclude`.
pub fn select_random_from_other_subpop<'a, R: Rng>(
    subpops: &'a [Vec<Individual>],
    exclude: usize,
    rng: &mut R,
) -> Option<&'a Individual> {
    let others: Vec<&Individual> = subpops
        .iter()
        .enumerate()
        .filter(|(p, _)| *p != exclude)
        .flat_map(|(_, subpop)| subpop.iter())
        .collect();
    others.choose(rng).copied()
}
