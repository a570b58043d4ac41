// src/engines/metrics/label_based.rs
use std::collections::HashMap;

/// Per-label confusion counts aggregated into micro and macro F-measure.
pub struct LabelBasedMetrics;

#[derive(Debug, Clone, Copy, Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Confusion {
    fn f_measure(&self) -> f64 {
        let denominator = 2 * self.tp + self.fp + self.fn_;
        if denominator == 0 {
            1.0
        } else {
            2.0 * self.tp as f64 / denominator as f64
        }
    }
}

impl LabelBasedMetrics {
    pub fn calculate(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();

        if truth.is_empty() {
            return metrics;
        }

        metrics.insert("micro_f_measure".to_string(), Self::micro_f_measure(truth, predicted));
        metrics.insert("macro_f_measure".to_string(), Self::macro_f_measure(truth, predicted));

        metrics
    }

    pub fn micro_f_measure(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> f64 {
        if truth.is_empty() {
            return 0.0;
        }
        let total = Self::confusions(truth, predicted).into_iter().fold(
            Confusion::default(),
            |acc, c| Confusion {
                tp: acc.tp + c.tp,
                fp: acc.fp + c.fp,
                fn_: acc.fn_ + c.fn_,
            },
        );
        total.f_measure()
    }

    pub fn macro_f_measure(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> f64 {
        let confusions = Self::confusions(truth, predicted);
        if confusions.is_empty() {
            return 0.0;
        }
        confusions.iter().map(Confusion::f_measure).sum::<f64>() / confusions.len() as f64
    }

    fn confusions(truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> Vec<Confusion> {
        let width = truth.first().map(|row| row.len()).unwrap_or(0);
        let mut confusions = vec![Confusion::default(); width];
        for (y, z) in truth.iter().zip(predicted) {
            for (label, (&actual, &guess)) in y.iter().zip(z).enumerate().take(width) {
                match (actual, guess) {
                    (true, true) => confusions[label].tp += 1,
                    (false, true) => confusions[label].fp += 1,
                    (true, false) => confusions[label].fn_ += 1,
                    (false, false) => {}
                }
            }
        }
        confusions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micro_and_macro() {
        let truth = vec![vec![true, false], vec![true, true], vec![false, true]];
        let predicted = vec![vec![true, true], vec![false, true], vec![false, true]];
        // label 0: tp 1 fn 1 -> 2/3; label 1: tp 2 fp 1 -> 4/5
        let macro_f = (2.0 / 3.0 + 4.0 / 5.0) / 2.0;
        // total: tp 3 fp 1 fn 1 -> 6/8
        let micro_f = 6.0 / 8.0;
        assert!((LabelBasedMetrics::macro_f_measure(&truth, &predicted) - macro_f).abs() < 1e-12);
        assert!((LabelBasedMetrics::micro_f_measure(&truth, &predicted) - micro_f).abs() < 1e-12);
    }
}
