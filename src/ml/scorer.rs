use super::traits::{Model, Scorer};
use crate::data::MultiLabelDataset;
use crate::engines::metrics::Measure;
use rayon::prelude::*;

/// Scores a model by one [`Measure`] over its bipartitions on `data`.
#[derive(Debug, Clone, Copy)]
pub struct MeasureScorer {
    measure: Measure,
}

impl MeasureScorer {
    pub fn new(measure: Measure) -> Self {
        Self { measure }
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }
}

/// Bipartitions of every instance of `data`, predicted in parallel.
pub fn predict_all(model: &dyn Model, data: &MultiLabelDataset) -> Vec<Vec<bool>> {
    data.features()
        .par_iter()
        .map(|row| model.predict(row).bipartition)
        .collect()
}

impl Scorer for MeasureScorer {
    fn score(&self, model: &dyn Model, data: &MultiLabelDataset) -> f64 {
        let predicted = predict_all(model, data);
        self.measure.evaluate(data.labels(), &predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::traits::Prediction;

    struct Constant(Vec<bool>);

    impl Model for Constant {
        fn predict(&self, _features: &[f64]) -> Prediction {
            Prediction {
                bipartition: self.0.clone(),
                confidences: self.0.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect(),
            }
        }
    }

    #[test]
    fn test_score_uses_measure() {
        let data = MultiLabelDataset::new(
            vec!["x".into()],
            vec!["a".into(), "b".into()],
            vec![vec![0.0], vec![1.0]],
            vec![vec![true, false], vec![true, true]],
        )
        .unwrap();
        let model = Constant(vec![true, false]);

        let subset = MeasureScorer::new(Measure::SubsetAccuracy).score(&model, &data);
        assert!((subset - 0.5).abs() < 1e-12);
        let hamming = MeasureScorer::new(Measure::HammingScore).score(&model, &data);
        assert!((hamming - 0.75).abs() < 1e-12);
    }
}
