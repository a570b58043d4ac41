// src/engines/metrics/example_based.rs
use std::collections::HashMap;

/// Metrics averaged over instances. `truth` and `predicted` are row-aligned
/// label bipartitions of equal width.
pub struct ExampleBasedMetrics;

impl ExampleBasedMetrics {
    pub fn calculate(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();

        if truth.is_empty() {
            return metrics;
        }

        metrics.insert("example_based_f_measure".to_string(), Self::f_measure(truth, predicted));
        let loss = Self::hamming_loss(truth, predicted);
        metrics.insert("hamming_loss".to_string(), loss);
        metrics.insert("hamming_score".to_string(), 1.0 - loss);
        metrics.insert("subset_accuracy".to_string(), Self::subset_accuracy(truth, predicted));

        metrics
    }

    /// Mean of `2|Y∩Z| / (|Y|+|Z|)`; an instance with no true and no predicted labels scores 1.
    pub fn f_measure(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> f64 {
        if truth.is_empty() {
            return 0.0;
        }
        let total: f64 = truth
            .iter()
            .zip(predicted)
            .map(|(y, z)| {
                let both = y.iter().zip(z).filter(|(a, b)| **a && **b).count();
                let size = y.iter().filter(|&&a| a).count() + z.iter().filter(|&&b| b).count();
                if size == 0 {
                    1.0
                } else {
                    2.0 * both as f64 / size as f64
                }
            })
            .sum();
        total / truth.len() as f64
    }

    pub fn hamming_loss(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> f64 {
        let mut cells = 0usize;
        let mut wrong = 0usize;
        for (y, z) in truth.iter().zip(predicted) {
            cells += y.len();
            wrong += y.iter().zip(z).filter(|(a, b)| a != b).count();
        }
        if cells == 0 {
            return 0.0;
        }
        wrong as f64 / cells as f64
    }

    pub fn subset_accuracy(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> f64 {
        if truth.is_empty() {
            return 0.0;
        }
        let exact = truth.iter().zip(predicted).filter(|(y, z)| y == z).count();
        exact as f64 / truth.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<Vec<bool>>, Vec<Vec<bool>>) {
        let truth = vec![vec![true, false, true], vec![false, true, false]];
        let predicted = vec![vec![true, false, false], vec![false, true, false]];
        (truth, predicted)
    }

    #[test]
    fn test_f_measure() {
        let (truth, predicted) = sample();
        // (2*1/3 + 1) / 2
        let expected = (2.0 / 3.0 + 1.0) / 2.0;
        assert!((ExampleBasedMetrics::f_measure(&truth, &predicted) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_hamming_and_subset() {
        let (truth, predicted) = sample();
        let metrics = ExampleBasedMetrics::calculate(&truth, &predicted);
        assert!((metrics["hamming_loss"] - 1.0 / 6.0).abs() < 1e-12);
        assert!((metrics["hamming_score"] - 5.0 / 6.0).abs() < 1e-12);
        assert!((metrics["subset_accuracy"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rows_count_as_perfect() {
        let truth = vec![vec![false, false]];
        assert_eq!(ExampleBasedMetrics::f_measure(&truth, &truth), 1.0);
    }
}
