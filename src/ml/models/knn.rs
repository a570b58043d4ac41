use crate::data::MultiLabelDataset;
use crate::ml::traits::{Model, Prediction, Trainer};
use anyhow::bail;

/// Multi-label k-nearest-neighbour learner.
///
/// The confidence of a label is the fraction of the `neighbours` closest
/// training instances (Euclidean distance, ties by instance index) carrying it.
#[derive(Debug, Clone)]
pub struct NearestNeighbourLearner {
    neighbours: usize,
}

impl NearestNeighbourLearner {
    pub fn new(neighbours: usize) -> Self {
        Self {
            neighbours: neighbours.max(1),
        }
    }
}

pub struct NearestNeighbourModel {
    neighbours: usize,
    data: MultiLabelDataset,
}

impl Trainer for NearestNeighbourLearner {
    type Model = NearestNeighbourModel;

    fn train(&self, data: &MultiLabelDataset) -> anyhow::Result<NearestNeighbourModel> {
        if data.num_instances() == 0 {
            bail!("cannot train on an empty dataset");
        }
        if data.num_labels() == 0 {
            bail!("dataset has no labels");
        }
        Ok(NearestNeighbourModel {
            neighbours: self.neighbours.min(data.num_instances()),
            data: data.clone(),
        })
    }
}

impl Model for NearestNeighbourModel {
    fn predict(&self, features: &[f64]) -> Prediction {
        let mut distances: Vec<(f64, usize)> = self
            .data
            .features()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let d: f64 = row
                    .iter()
                    .zip(features)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (d, i)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut counts = vec![0usize; self.data.num_labels()];
        for &(_, index) in distances.iter().take(self.neighbours) {
            for (label, &relevant) in self.data.labels()[index].iter().enumerate() {
                if relevant {
                    counts[label] += 1;
                }
            }
        }

        let confidences: Vec<f64> = counts
            .iter()
            .map(|&c| c as f64 / self.neighbours as f64)
            .collect();
        Prediction {
            bipartition: confidences.iter().map(|&c| c >= 0.5).collect(),
            confidences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters() -> MultiLabelDataset {
        MultiLabelDataset::new(
            vec!["x".into(), "y".into()],
            vec!["left".into(), "right".into()],
            vec![
                vec![0.0, 0.0],
                vec![0.1, 0.0],
                vec![0.0, 0.1],
                vec![5.0, 5.0],
                vec![5.1, 5.0],
                vec![5.0, 5.1],
            ],
            vec![
                vec![true, false],
                vec![true, false],
                vec![true, false],
                vec![false, true],
                vec![false, true],
                vec![false, true],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_predicts_nearest_cluster() {
        let model = NearestNeighbourLearner::new(3).train(&clusters()).unwrap();
        let left = model.predict(&[0.05, 0.05]);
        assert_eq!(left.bipartition, vec![true, false]);
        assert_eq!(left.confidences, vec![1.0, 0.0]);
        let right = model.predict(&[4.9, 5.2]);
        assert_eq!(right.bipartition, vec![false, true]);
    }

    #[test]
    fn test_empty_dataset_fails() {
        let empty = MultiLabelDataset::new(vec!["x".into()], vec!["a".into()], vec![], vec![]).unwrap();
        assert!(NearestNeighbourLearner::new(3).train(&empty).is_err());
    }

    #[test]
    fn test_neighbours_capped_by_instances() {
        let model = NearestNeighbourLearner::new(50).train(&clusters()).unwrap();
        let p = model.predict(&[0.0, 0.0]);
        assert_eq!(p.confidences, vec![0.5, 0.5]);
    }
}
