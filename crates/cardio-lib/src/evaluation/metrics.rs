//! Binary classification metrics
//!
//! Positive class is `1`. Precision, recall and F1 are `0.0` when their
//! denominator is zero.

/// Confusion-matrix counts for binary labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t == 1, p == 1) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Turn raw model output into binary labels.
///
/// Outputs that are already 0/1 pass through. Anything else, typically the
/// continuous scores of a regressor used as a classifier, is thresholded:
/// strictly above `threshold` is positive.
pub fn to_binary_labels(predictions: &[f32], threshold: f32) -> Vec<u8> {
    let already_binary = predictions.iter().all(|&v| v == 0.0 || v == 1.0);
    predictions
        .iter()
        .map(|&v| {
            if already_binary {
                v as u8
            } else {
                u8::from(v > threshold)
            }
        })
        .collect()
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
///
/// `None` when only one class is present in `truth` or any score is not
/// finite.
pub fn roc_auc(truth: &[u8], scores: &[f32]) -> Option<f64> {
    if scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let positives = truth.iter().filter(|&&t| t == 1).count();
    let negatives = truth.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // 1-based average ranks, ties share the mean of their positions
    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = average;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roc_auc_rejects_non_finite_scores() {
        assert_eq!(roc_auc(&[0, 1, 0, 1], &[0.1, f32::NAN, 0.3, 0.9]), None);
        assert_eq!(roc_auc(&[0, 1], &[0.1, f32::INFINITY]), None);
    }

    #[test]
    fn test_confusion_counts() {
        let counts = ConfusionCounts::from_labels(&[1, 1, 0, 0, 1], &[1, 0, 0, 1, 1]);
        assert_eq!(counts.true_positive, 2);
        assert_eq!(counts.false_negative, 1);
        assert_eq!(counts.true_negative, 1);
        assert_eq!(counts.false_positive, 1);
        assert!((counts.accuracy() - 0.6).abs() < 1e-12);
        assert!((counts.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let counts = ConfusionCounts::from_labels(&[0, 0], &[0, 0]);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.f1(), 0.0);
        assert_eq!(counts.accuracy(), 1.0);
    }

    #[test]
    fn test_continuous_predictions_thresholded() {
        let labels = to_binary_labels(&[0.2, 0.81, 0.49, 0.95], 0.5);
        assert_eq!(labels, vec![0, 1, 0, 1]);
        let counts = ConfusionCounts::from_labels(&[0, 1, 0, 1], &labels);
        assert_eq!(counts.accuracy(), 1.0);
    }

    #[test]
    fn test_binary_predictions_pass_through() {
        assert_eq!(to_binary_labels(&[0.0, 1.0, 1.0], 0.5), vec![0, 1, 1]);
    }

    #[test]
    fn test_exact_threshold_is_negative() {
        assert_eq!(to_binary_labels(&[0.5, 0.7, 0.1], 0.5), vec![0, 1, 0]);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]), Some(0.0));
    }

    #[test]
    fn test_roc_auc_with_ties() {
        // Scores carry no information
        assert_eq!(roc_auc(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]), Some(0.5));
        // Classic example: 0.75
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class_undefined() {
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.9]), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(73.14, 1), 73.1);
        assert_eq!(round_to(0.7461, 2), 0.75);
    }
}
