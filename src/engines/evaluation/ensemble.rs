use crate::data::ModelStore;
use crate::ml::{Model, Prediction};
use crate::types::{votes_per_label, Individual};
use std::sync::Arc;

/// Weighted-vote combination of label-subset base classifiers.
///
/// Each member votes only on its active labels. A vote for label `l` weighs
/// `1 / votes[l]`, so `sum_votes[l]` is the share of covering members that
/// predicted `l`; the label is positive iff that share reaches the threshold.
pub struct Ensemble<M> {
    members: Vec<Individual>,
    models: Vec<Option<Arc<M>>>,
    votes: Vec<usize>,
    weights: Vec<f64>,
    threshold: f64,
}

impl<M: Model> Ensemble<M> {
    pub fn new(
        members: Vec<Individual>,
        num_labels: usize,
        threshold: f64,
        models: &dyn ModelStore<M>,
    ) -> Self {
        let votes = votes_per_label(&members, num_labels);
        let weights = votes
            .iter()
            .map(|&v| if v > 0 { 1.0 / v as f64 } else { 0.0 })
            .collect();

        let models: Vec<Option<Arc<M>>> = members.iter().map(|m| models.get(&m.key())).collect();
        let missing = models.iter().filter(|m| m.is_none()).count();
        if missing > 0 {
            log::warn!("{} of {} ensemble members have no trained model and abstain", missing, members.len());
        }

        Self {
            members,
            models,
            votes,
            weights,
            threshold,
        }
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Individual> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn num_labels(&self) -> usize {
        self.votes.len()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn votes_per_label(&self) -> &[usize] {
        &self.votes
    }

    pub fn vote_weights(&self) -> &[f64] {
        &self.weights
    }

    /// Member genotypes stacked row by row.
    pub fn vote_matrix(&self) -> Vec<Vec<bool>> {
        self.members
            .iter()
            .map(|m| m.genotype().bits().to_vec())
            .collect()
    }

    pub fn uncovered_labels(&self) -> Vec<usize> {
        self.votes
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(l, _)| l)
            .collect()
    }
}

impl<M: Model> Model for Ensemble<M> {
    fn predict(&self, features: &[f64]) -> Prediction {
        let mut sum_votes = vec![0.0; self.num_labels()];

        for (member, model) in self.members.iter().zip(&self.models) {
            let Some(model) = model else { continue };
            let output = model.predict(features);
            for (j, label) in member.genotype().active_labels().into_iter().enumerate() {
                if output.bipartition.get(j).copied().unwrap_or(false) {
                    sum_votes[label] += self.weights[label];
                }
            }
        }

        Prediction {
            bipartition: sum_votes.iter().map(|&v| v >= self.threshold).collect(),
            confidences: sum_votes,
        }
    }
}
