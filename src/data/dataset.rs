use crate::error::{CoevoError, Result};
use crate::types::Genotype;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

/// Multi-label dataset: a numeric feature matrix plus a boolean label matrix.
///
/// Feature rows are shared between projections and samples of the same data,
/// so restricting to a label subset only rebuilds the label matrix.
#[derive(Debug, Clone)]
pub struct MultiLabelDataset {
    feature_names: Vec<String>,
    label_names: Vec<String>,
    features: Arc<Vec<Vec<f64>>>,
    labels: Vec<Vec<bool>>,
}

impl MultiLabelDataset {
    pub fn new(
        feature_names: Vec<String>,
        label_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<Vec<bool>>,
    ) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(CoevoError::DataLoading(format!(
                "{} feature rows but {} label rows",
                features.len(),
                labels.len()
            )));
        }
        if let Some(row) = features.iter().position(|r| r.len() != feature_names.len()) {
            return Err(CoevoError::DataLoading(format!(
                "Feature row {} has {} values, expected {}",
                row,
                features[row].len(),
                feature_names.len()
            )));
        }
        if let Some(row) = labels.iter().position(|r| r.len() != label_names.len()) {
            return Err(CoevoError::DataLoading(format!(
                "Label row {} has {} values, expected {}",
                row,
                labels[row].len(),
                label_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            label_names,
            features: Arc::new(features),
            labels,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.label_names.len()
    }

    pub fn num_instances(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[Vec<bool>] {
        &self.labels
    }

    pub fn instance(&self, index: usize) -> Option<(&[f64], &[bool])> {
        Some((
            self.features.get(index)?.as_slice(),
            self.labels.get(index)?.as_slice(),
        ))
    }

    /// Projection keeping only the labels active in `mask`, in ascending order.
    pub fn restrict_to_labels(&self, mask: &Genotype) -> MultiLabelDataset {
        let active = mask.active_labels();
        let label_names = active
            .iter()
            .filter_map(|&l| self.label_names.get(l).cloned())
            .collect();
        let labels = self
            .labels
            .iter()
            .map(|row| active.iter().filter_map(|&l| row.get(l).copied()).collect())
            .collect();
        MultiLabelDataset {
            feature_names: self.feature_names.clone(),
            label_names,
            features: Arc::clone(&self.features),
            labels,
        }
    }

    /// Random subset of `round(n * ratio)` instances.
    pub fn sample<R: Rng>(&self, ratio: f64, rng: &mut R) -> MultiLabelDataset {
        let mut indices: Vec<usize> = (0..self.num_instances()).collect();
        indices.shuffle(rng);
        let limit = ((self.num_instances() as f64) * ratio).round() as usize;
        indices.truncate(limit.min(self.num_instances()));

        let features = indices.iter().map(|&i| self.features[i].clone()).collect();
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();
        MultiLabelDataset {
            feature_names: self.feature_names.clone(),
            label_names: self.label_names.clone(),
            features: Arc::new(features),
            labels,
        }
    }

    /// Number of instances in which each label is relevant.
    pub fn appearances(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_labels()];
        for row in &self.labels {
            for (label, &relevant) in row.iter().enumerate() {
                if relevant {
                    counts[label] += 1;
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn toy() -> MultiLabelDataset {
        MultiLabelDataset::new(
            vec!["x".into(), "y".into()],
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0], vec![3.0, 1.0]],
            vec![
                vec![true, false, true],
                vec![false, false, true],
                vec![true, true, false],
                vec![false, false, true],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_validation() {
        let result = MultiLabelDataset::new(
            vec!["x".into()],
            vec!["a".into()],
            vec![vec![0.0, 1.0]],
            vec![vec![true]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_restrict_to_labels() {
        let data = toy();
        let view = data.restrict_to_labels(&Genotype::from_active(3, &[0, 2]));
        assert_eq!(view.num_labels(), 2);
        assert_eq!(view.label_names(), &["a".to_string(), "c".to_string()]);
        assert_eq!(view.labels()[1], vec![false, true]);
        assert_eq!(view.num_instances(), 4);
        assert!(Arc::ptr_eq(&view.features, &data.features));
    }

    #[test]
    fn test_sample_size() {
        let data = toy();
        let mut rng = StdRng::seed_from_u64(3);
        let sample = data.sample(0.75, &mut rng);
        assert_eq!(sample.num_instances(), 3);
        assert_eq!(sample.num_labels(), 3);
    }

    #[test]
    fn test_appearances() {
        assert_eq!(toy().appearances(), vec![2, 1, 3]);
    }
}
