use serde::{Serialize, Deserialize};

/// Tolerance used when reading a floating point target as a 0/1 label.
pub const LABEL_EPSILON: f64 = 1e-9;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < LABEL_EPSILON
}

/// A held-out example the network got wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Misclassification {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
    /// Class index (0/1 for binary networks).
    pub predicted: usize,
    pub expected: usize,
}

/// True/false positive/negative counts of a binary classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, predicted: bool, expected: bool) {
        match (predicted, expected) {
            (true, true) => self.true_positives += 1,
            (false, false) => self.true_negatives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn merge(&mut self, other: &ConfusionMatrix) {
        self.true_positives += other.true_positives;
        self.true_negatives += other.true_negatives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// TP / (TP + FP), or 0 when there are no true positives.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN), or 0 when there are no true positives.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// (TP + TN) / total, or 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if numerator == 0 || denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Outcome of running a held-out set through a trained network.
///
/// `confusion`, `precision`, `recall` and `accuracy` are only meaningful for
/// single-output (binary) networks and stay zeroed otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub binary: bool,
    /// Mean over examples of each example's mean squared output error.
    pub error: f64,
    pub total: usize,
    pub misclassifications: Vec<Misclassification>,
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ratios_are_zero_without_true_positives() {
        let mut matrix = ConfusionMatrix::default();
        matrix.record(false, true);
        matrix.record(false, false);
        assert_eq!(matrix.precision(), 0.0);
        assert_eq!(matrix.recall(), 0.0);
        assert_abs_diff_eq!(matrix.accuracy(), 0.5);
        assert_eq!(ConfusionMatrix::default().accuracy(), 0.0);
    }

    #[test]
    fn derived_stats() {
        let matrix = ConfusionMatrix {
            true_positives: 3,
            true_negatives: 4,
            false_positives: 1,
            false_negatives: 2,
        };
        assert_eq!(matrix.total(), 10);
        assert_abs_diff_eq!(matrix.precision(), 0.75);
        assert_abs_diff_eq!(matrix.recall(), 0.6);
        assert_abs_diff_eq!(matrix.accuracy(), 0.7);
    }

    #[test]
    fn label_tolerance() {
        assert!(approx_eq(1.0, 1.0 - 1e-12));
        assert!(!approx_eq(1.0, 0.999));
    }
}
