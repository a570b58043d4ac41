// src/engines/metrics/measure.rs
use super::{example_based::ExampleBasedMetrics, label_based::LabelBasedMetrics};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Higher-is-better measure used as base-classifier and ensemble fitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    ExampleBasedFMeasure,
    HammingScore,
    SubsetAccuracy,
    MicroFMeasure,
    MacroFMeasure,
}

impl Measure {
    pub fn evaluate(&self, truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> f64 {
        match self {
            Self::ExampleBasedFMeasure => ExampleBasedMetrics::f_measure(truth, predicted),
            Self::HammingScore => {
                if truth.is_empty() {
                    0.0
                } else {
                    1.0 - ExampleBasedMetrics::hamming_loss(truth, predicted)
                }
            }
            Self::SubsetAccuracy => ExampleBasedMetrics::subset_accuracy(truth, predicted),
            Self::MicroFMeasure => LabelBasedMetrics::micro_f_measure(truth, predicted),
            Self::MacroFMeasure => LabelBasedMetrics::macro_f_measure(truth, predicted),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExampleBasedFMeasure => "example_based_f_measure",
            Self::HammingScore => "hamming_score",
            Self::SubsetAccuracy => "subset_accuracy",
            Self::MicroFMeasure => "micro_f_measure",
            Self::MacroFMeasure => "macro_f_measure",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
