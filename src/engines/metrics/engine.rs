// src/engines/metrics/engine.rs
use crate::engines::metrics::{ExampleBasedMetrics, LabelBasedMetrics};
use std::collections::HashMap;

pub struct MetricsEngine;

impl MetricsEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_all(&self, truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> HashMap<String, f64> {
        let mut all_metrics = HashMap::new();

        all_metrics.extend(ExampleBasedMetrics::calculate(truth, predicted));
        all_metrics.extend(LabelBasedMetrics::calculate(truth, predicted));

        // Basic metrics
        all_metrics.insert("num_instances".to_string(), truth.len() as f64);
        let cardinality = if truth.is_empty() {
            0.0
        } else {
            predicted.iter().map(|z| z.iter().filter(|&&b| b).count()).sum::<usize>() as f64
                / truth.len() as f64
        };
        all_metrics.insert("predicted_cardinality".to_string(), cardinality);

        all_metrics
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}
