use crate::error::{CoevoError, Result};
use crate::types::{votes_per_label, Individual};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

/// Total number of expected votes: `round(avg_votes / k * L) * k`, the slots
/// of a whole number of `k`-label classifiers.
pub fn expected_votes_total(avg_votes_per_label: usize, k: usize, num_labels: usize) -> usize {
    if k == 0 {
        return 0;
    }
    let classifiers = (avg_votes_per_label as f64 / k as f64 * num_labels as f64).round() as usize;
    classifiers * k
}

/// Shares `total` votes evenly; the remainder goes to randomly chosen labels.
pub fn spread_votes_evenly<R: Rng>(num_labels: usize, total: usize, rng: &mut R) -> Vec<usize> {
    if num_labels == 0 {
        return Vec::new();
    }
    let share = total / num_labels;
    let mut votes = vec![share; num_labels];

    let mut labels: Vec<usize> = (0..num_labels).collect();
    labels.shuffle(rng);
    for &label in labels.iter().take(total - share * num_labels) {
        votes[label] += 1;
    }
    votes
}

/// Normalized weights; uniform when every count is zero.
pub fn label_weights(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        let n = counts.len().max(1) as f64;
        return vec![1.0 / n; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

/// Mean weighted Hamming distance between `ind` and each member.
pub fn distance_to_ensemble<'a, I>(ind: &Individual, members: I, weights: &[f64]) -> f64
where
    I: IntoIterator<Item = &'a Individual>,
{
    let (total, count) = members.into_iter().fold((0.0, 0usize), |(total, count), m| {
        (total + ind.genotype().weighted_distance(m.genotype(), weights), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Search nodes visited before the covering search gives up.
const COVER_SEARCH_BUDGET: usize = 200_000;

/// Best fitness first, key order between equals.
fn by_fitness_desc(a: &Scored, b: &Scored) -> Ordering {
    b.fitness
        .partial_cmp(&a.fitness)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.ind.key().cmp(&b.ind.key()))
}

/// Index of the maximum, ties broken uniformly at random.
fn max_index_random_tie<R: Rng>(scores: &[f64], rng: &mut R) -> Option<usize> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ties: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] == max).collect();
    ties.choose(rng).copied()
}

/// Picks `n` members from a pool, trading individual fitness against
/// label-weighted diversity, and repairs the result so every label has a vote.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleSelector {
    num_labels: usize,
}

#[derive(Clone, Copy)]
struct Scored<'a> {
    ind: &'a Individual,
    fitness: f64,
}

impl EnsembleSelector {
    pub fn new(num_labels: usize) -> Self {
        Self { num_labels }
    }

    pub fn select<R: Rng>(
        &self,
        pool: &[Individual],
        n: usize,
        expected_votes: &[usize],
        beta: f64,
        rng: &mut R,
    ) -> Result<Vec<Individual>> {
        if n == 0 {
            return Err(CoevoError::EnsembleSelection(
                "Ensemble size must be at least 1".to_string(),
            ));
        }
        if pool.len() < n {
            return Err(CoevoError::EnsembleSelection(format!(
                "Pool of {} individuals cannot fill an ensemble of {}",
                pool.len(),
                n
            )));
        }
        let pool_votes = votes_per_label(pool, self.num_labels);
        if let Some(label) = pool_votes.iter().position(|&v| v == 0) {
            return Err(CoevoError::UncoveredLabel { label });
        }

        let mut remaining = pool
            .iter()
            .map(|ind| ind.require_fitness().map(|fitness| Scored { ind, fitness }))
            .collect::<Result<Vec<_>>>()?;
        remaining.sort_by(by_fitness_desc);

        let mut members: Vec<Scored> = Vec::with_capacity(n);
        members.push(remaining.remove(0));

        let mut countdown = expected_votes.to_vec();
        while members.len() < n {
            let weights = label_weights(&countdown);
            let scores = self.scores(&remaining, &members, &weights, beta);
            let Some(best) = max_index_random_tie(&scores, rng) else {
                break;
            };
            let chosen = remaining.remove(best);
            for label in chosen.ind.genotype().active_labels() {
                if let Some(c) = countdown.get_mut(label) {
                    if *c > 1 {
                        *c -= 1;
                    }
                }
            }
            members.push(chosen);
        }

        self.repair(&mut members, &mut remaining, expected_votes, beta, rng)?;

        Ok(members.into_iter().map(|s| s.ind.clone()).collect())
    }

    fn scores(&self, candidates: &[Scored], members: &[Scored], weights: &[f64], beta: f64) -> Vec<f64> {
        candidates
            .iter()
            .map(|c| {
                let distance = distance_to_ensemble(c.ind, members.iter().map(|m| m.ind), weights);
                beta * distance + (1.0 - beta) * c.fitness
            })
            .collect()
    }

    /// Swaps members until no label is left without votes. When no single
    /// swap helps, falls back to a search over whole covering subsets.
    fn repair<'a, R: Rng>(
        &self,
        members: &mut Vec<Scored<'a>>,
        remaining: &mut Vec<Scored<'a>>,
        expected_votes: &[usize],
        beta: f64,
        rng: &mut R,
    ) -> Result<()> {
        let weights = label_weights(expected_votes);
        let max_rounds = self.num_labels * members.len().max(1) + 1;

        for _ in 0..max_rounds {
            let votes = self.member_votes(members);
            let uncovered: Vec<usize> = (0..self.num_labels).filter(|&l| votes[l] == 0).collect();
            let Some(&label) = uncovered.choose(rng) else {
                return Ok(());
            };
            log::debug!("Ensemble repair: label {} has no votes", label);

            let (out, required) = match self.removable_member(members, &votes, rng) {
                Some(out) => (out, vec![label]),
                None => match self.critical_swap(members, remaining, &votes, label) {
                    Some(swap) => swap,
                    None => break,
                },
            };

            let candidates: Vec<usize> = (0..remaining.len())
                .filter(|&i| required.iter().all(|&l| remaining[i].ind.genotype().is_active(l)))
                .collect();
            let removed = members.remove(out);

            let candidate_refs: Vec<Scored> = candidates
                .iter()
                .map(|&i| Scored {
                    ind: remaining[i].ind,
                    fitness: remaining[i].fitness,
                })
                .collect();
            let scores = self.scores(&candidate_refs, members, &weights, beta);
            let best = scores
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
                    Some((_, b)) if b >= s => best,
                    _ => Some((i, s)),
                })
                .map(|(i, _)| candidates[i])
                .ok_or(CoevoError::UncoveredLabel { label })?;

            members.push(remaining.remove(best));
            remaining.push(removed);
        }

        self.rebuild_covering(members, remaining)
    }

    /// Replaces the ensemble by `n` individuals that cover every label,
    /// keeping as many current members as possible. Errors only when the
    /// pool holds no such subset or the search budget runs out.
    fn rebuild_covering<'a>(&self, members: &mut Vec<Scored<'a>>, remaining: &mut Vec<Scored<'a>>) -> Result<()> {
        let n = members.len();
        members.sort_by(by_fitness_desc);
        remaining.sort_by(by_fitness_desc);
        let mut candidates: Vec<Scored<'a>> = members.drain(..).collect();
        candidates.append(remaining);

        let mut search = CoverSearch::new(&candidates, self.num_labels);
        let mut chosen = Vec::with_capacity(n);
        let mut votes = vec![0; self.num_labels];
        match search.run(&mut chosen, &mut votes, n) {
            SearchOutcome::Found => {}
            SearchOutcome::Exhausted => {
                return Err(CoevoError::EnsembleSelection(format!(
                    "No {} individuals of the pool cover every label",
                    n
                )))
            }
            SearchOutcome::OutOfBudget => {
                return Err(CoevoError::EnsembleSelection(format!(
                    "No covering ensemble of {} found within {} search steps",
                    n, COVER_SEARCH_BUDGET
                )))
            }
        }
        log::warn!("Ensemble repair rebuilt the ensemble around {} covering members", chosen.len());

        let mut picked = vec![false; candidates.len()];
        for &i in &chosen {
            picked[i] = true;
        }
        // candidates hold the old members first, so they refill the free slots
        for i in 0..candidates.len() {
            if chosen.len() >= n {
                break;
            }
            if !picked[i] {
                picked[i] = true;
                chosen.push(i);
            }
        }
        members.extend(chosen.iter().map(|&i| candidates[i]));
        remaining.extend((0..candidates.len()).filter(|&i| !picked[i]).map(|i| candidates[i]));
        Ok(())
    }

    fn member_votes(&self, members: &[Scored]) -> Vec<usize> {
        let mut votes = vec![0; self.num_labels];
        for m in members {
            for label in m.ind.genotype().active_labels() {
                if label < self.num_labels {
                    votes[label] += 1;
                }
            }
        }
        votes
    }

    fn has_critical_label(&self, member: &Scored, votes: &[usize]) -> bool {
        member
            .ind
            .genotype()
            .active_labels()
            .into_iter()
            .any(|l| votes.get(l).copied().unwrap_or(0) <= 1)
    }

    /// Lowest-fitness member covering the most-voted label whose removal
    /// leaves every other label covered. Less voted labels are tried in turn.
    fn removable_member<R: Rng>(&self, members: &[Scored], votes: &[usize], rng: &mut R) -> Option<usize> {
        let mut labels: Vec<usize> = (0..self.num_labels).filter(|&l| votes[l] > 0).collect();
        labels.shuffle(rng);
        labels.sort_by(|a, b| votes[*b].cmp(&votes[*a]));

        for label in labels {
            let worst = members
                .iter()
                .enumerate()
                .filter(|(_, m)| m.ind.genotype().is_active(label))
                .filter(|(_, m)| !self.has_critical_label(m, votes))
                .min_by(|(_, a), (_, b)| {
                    a.fitness
                        .partial_cmp(&b.fitness)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| b.ind.key().cmp(&a.ind.key()))
                })
                .map(|(i, _)| i);
            if worst.is_some() {
                return worst;
            }
        }
        None
    }

    /// Every member holds a label only it covers: drop the weakest member for
    /// which some candidate covers both `label` and that member's lone labels.
    fn critical_swap(
        &self,
        members: &[Scored],
        remaining: &[Scored],
        votes: &[usize],
        label: usize,
    ) -> Option<(usize, Vec<usize>)> {
        let mut order: Vec<usize> = (0..members.len()).collect();
        order.sort_by(|&a, &b| {
            members[a]
                .fitness
                .partial_cmp(&members[b].fitness)
                .unwrap_or(Ordering::Equal)
        });

        for i in order {
            let mut required: Vec<usize> = members[i]
                .ind
                .genotype()
                .active_labels()
                .into_iter()
                .filter(|&l| votes[l] <= 1)
                .collect();
            required.push(label);
            let feasible = remaining
                .iter()
                .any(|c| required.iter().all(|&l| c.ind.genotype().is_active(l)));
            if feasible {
                log::warn!("Ensemble repair replaces member {} holding lone labels", members[i].ind.key());
                return Some((i, required));
            }
        }
        None
    }
}

enum SearchOutcome {
    Found,
    Exhausted,
    OutOfBudget,
}

/// Depth-first search for a label cover, branching on the uncovered label
/// with the fewest holders. Candidates are tried in slice order.
struct CoverSearch<'s, 'a> {
    candidates: &'s [Scored<'a>],
    num_labels: usize,
    widest: usize,
    steps: usize,
}

impl<'s, 'a> CoverSearch<'s, 'a> {
    fn new(candidates: &'s [Scored<'a>], num_labels: usize) -> Self {
        let widest = candidates
            .iter()
            .map(|c| c.ind.genotype().active_count())
            .max()
            .unwrap_or(0);
        Self {
            candidates,
            num_labels,
            widest,
            steps: 0,
        }
    }

    fn run(&mut self, chosen: &mut Vec<usize>, votes: &mut [usize], n: usize) -> SearchOutcome {
        self.steps += 1;
        if self.steps > COVER_SEARCH_BUDGET {
            return SearchOutcome::OutOfBudget;
        }

        let uncovered: Vec<usize> = (0..self.num_labels).filter(|&l| votes[l] == 0).collect();
        if uncovered.is_empty() {
            return SearchOutcome::Found;
        }
        let slots = n - chosen.len();
        if slots * self.widest < uncovered.len() {
            return SearchOutcome::Exhausted;
        }

        let holders = |label: usize| -> Vec<usize> {
            (0..self.candidates.len())
                .filter(|i| !chosen.contains(i))
                .filter(|&i| self.candidates[i].ind.genotype().is_active(label))
                .collect()
        };
        let Some(branch) = uncovered.iter().map(|&l| holders(l)).min_by_key(|h| h.len()) else {
            return SearchOutcome::Found;
        };

        for i in branch {
            let labels = self.candidates[i].ind.genotype().active_labels();
            chosen.push(i);
            for &l in &labels {
                if let Some(v) = votes.get_mut(l) {
                    *v += 1;
                }
            }
            let outcome = self.run(chosen, votes, n);
            for &l in &labels {
                if let Some(v) = votes.get_mut(l) {
                    *v -= 1;
                }
            }
            chosen.pop();
            if !matches!(outcome, SearchOutcome::Exhausted) {
                return outcome;
            }
        }
        SearchOutcome::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Genotype;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ind(labels: &[usize], subpop: usize, fitness: f64) -> Individual {
        Individual::with_fitness(Genotype::from_active(4, labels), subpop, fitness)
    }

    #[test]
    fn test_spread_votes_evenly() {
        let mut rng = StdRng::seed_from_u64(1);
        let votes = spread_votes_evenly(4, 10, &mut rng);
        assert_eq!(votes.iter().sum::<usize>(), 10);
        assert!(votes.iter().all(|&v| v == 2 || v == 3));
        assert_eq!(expected_votes_total(10, 3, 6), 60);
        assert_eq!(expected_votes_total(5, 3, 5), 24);
    }

    #[test]
    fn test_label_weights() {
        assert_eq!(label_weights(&[1, 3]), vec![0.25, 0.75]);
        assert_eq!(label_weights(&[0, 0]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_pure_fitness_when_beta_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec![
            ind(&[0, 1], 0, 0.8),
            ind(&[2, 3], 0, 0.9),
            ind(&[0, 2], 0, 0.7),
            ind(&[1, 3], 0, 0.6),
        ];
        let selected = EnsembleSelector::new(4)
            .select(&pool, 2, &[1, 1, 1, 1], 0.0, &mut rng)
            .unwrap();
        assert_eq!(selected[0].fitness(), Some(0.9));
        assert_eq!(selected[1].fitness(), Some(0.8));
    }

    #[test]
    fn test_rare_label_forces_repair() {
        let pool = vec![
            ind(&[0, 1], 0, 0.9),
            ind(&[1, 2], 0, 0.8),
            ind(&[0, 2], 0, 0.7),
            ind(&[0, 1], 1, 0.6),
            ind(&[1, 2], 1, 0.5),
            ind(&[0, 3], 0, 0.4),
        ];
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selected = EnsembleSelector::new(4)
                .select(&pool, 3, &[1, 1, 1, 1], 0.5, &mut rng)
                .unwrap();
            assert_eq!(selected.len(), 3);
            assert!(selected.iter().any(|i| i.genotype().is_active(3)));
            assert!(votes_per_label(&selected, 4).iter().all(|&v| v >= 1));
        }
    }

    #[test]
    fn test_uncovered_pool_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec![ind(&[0, 1], 0, 0.9), ind(&[1, 2], 0, 0.8)];
        let result = EnsembleSelector::new(4).select(&pool, 1, &[1, 1, 1, 1], 0.5, &mut rng);
        assert!(matches!(result, Err(CoevoError::UncoveredLabel { label: 3 })));
    }

    #[test]
    fn test_unevaluated_pool_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec![
            ind(&[0, 1], 0, 0.9),
            Individual::new(Genotype::from_active(4, &[2, 3]), 0),
        ];
        let result = EnsembleSelector::new(4).select(&pool, 2, &[1, 1, 1, 1], 0.5, &mut rng);
        assert!(matches!(result, Err(CoevoError::Unevaluated(_))));
    }

    #[test]
    fn test_no_covering_pair_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = vec![
            ind(&[0, 1], 0, 0.9),
            ind(&[2], 0, 0.8),
            ind(&[1, 3], 0, 0.1),
        ];
        let selected = EnsembleSelector::new(4)
            .select(&pool, 2, &[1, 1, 1, 1], 0.0, &mut rng);
        // every pair misses label 0, 2 or 3
        assert!(matches!(selected, Err(CoevoError::EnsembleSelection(_))));
    }

    #[test]
    fn test_lone_label_holder_is_swapped() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = vec![
            ind(&[0, 1], 0, 0.9),
            ind(&[2], 0, 0.8),
            ind(&[2, 3], 0, 0.1),
        ];
        // {0,1} + {2} leaves 3 uncovered; {2,3} takes over label 2 from {2}
        let selected = EnsembleSelector::new(4)
            .select(&pool, 2, &[1, 1, 1, 1], 0.0, &mut rng)
            .unwrap();
        let mut keys: Vec<String> = selected.iter().map(|m| m.genotype().canonical()).collect();
        keys.sort();
        let mut expected = vec![
            Genotype::from_active(4, &[0, 1]).canonical(),
            Genotype::from_active(4, &[2, 3]).canonical(),
        ];
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_repair_replaces_several_members() {
        let ind6 = |labels: &[usize], fitness: f64| {
            Individual::with_fitness(Genotype::from_active(6, labels), 0, fitness)
        };
        let pool = vec![
            ind6(&[0, 1], 0.9),
            ind6(&[2, 3], 0.8),
            ind6(&[1, 4], 0.7),
            ind6(&[3, 5], 0.1),
            ind6(&[2, 4], 0.1),
        ];
        // the greedy pick {0,1} {2,3} {1,4} misses 5 and no single swap fixes it
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selected = EnsembleSelector::new(6)
                .select(&pool, 3, &[1; 6], 0.0, &mut rng)
                .unwrap();
            assert_eq!(selected.len(), 3);
            assert!(votes_per_label(&selected, 6).iter().all(|&v| v == 1));
            assert!(selected.iter().any(|m| m.fitness() == Some(0.9)));
        }
    }
}
