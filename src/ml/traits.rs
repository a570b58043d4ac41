use crate::data::MultiLabelDataset;

/// Output of a multi-label model for one instance, over the labels it was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub bipartition: Vec<bool>,
    pub confidences: Vec<f64>,
}

impl Prediction {
    pub fn num_labels(&self) -> usize {
        self.bipartition.len()
    }
}

pub trait Model: Send + Sync {
    fn predict(&self, features: &[f64]) -> Prediction;
}

/// Builds a model from a label-restricted dataset. Any error is reported to
/// the caller, which records the genotype as failed.
pub trait Trainer: Send + Sync {
    type Model: Model + 'static;

    fn train(&self, data: &MultiLabelDataset) -> anyhow::Result<Self::Model>;
}

/// Higher-is-better evaluation of a model on a dataset with matching labels.
pub trait Scorer: Send + Sync {
    fn score(&self, model: &dyn Model, data: &MultiLabelDataset) -> f64;
}
