//! Binary classification metrics for held-out evaluation.
//!
//! Threshold metrics (accuracy, precision, recall, F1) are computed at the
//! 0.5 decision threshold. The ROC curve sweeps every distinct score; AUC is
//! its trapezoidal integral. Metrics that need both classes in the test
//! partition return `None` instead of a fabricated number.

use crate::models::RocCurve;

/// Accuracy, precision, recall, and F1 at a fixed decision threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Compute threshold metrics from labels and predictions.
///
/// Zero denominators (no predicted positives, no actual positives) follow
/// the zero-division convention: the affected metric is 0.
pub fn threshold_metrics(y_true: &[u8], y_pred: &[u8]) -> ThresholdMetrics {
    debug_assert_eq!(y_true.len(), y_pred.len());

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut tn = 0usize;
    let mut fn_ = 0usize;

    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        match (truth, pred) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (0, 0) => tn += 1,
            _ => fn_ += 1,
        }
    }

    let total = y_true.len();
    let accuracy = if total > 0 {
        (tp + tn) as f64 / total as f64
    } else {
        0.0
    };

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };

    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    };

    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ThresholdMetrics {
        accuracy,
        precision,
        recall,
        f1,
    }
}

/// ROC curve over all distinct decision thresholds, highest first.
///
/// Returns `None` when the labels contain a single class, where false or
/// true positive rates are undefined. Otherwise the arrays start at (0,0),
/// end at (1,1), and are non-decreasing by construction.
pub fn roc_curve(y_true: &[u8], scores: &[f64]) -> Option<RocCurve> {
    debug_assert_eq!(y_true.len(), scores.len());

    let pos_total = y_true.iter().filter(|&&l| l == 1).count();
    let neg_total = y_true.len() - pos_total;
    if pos_total == 0 || neg_total == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_unstable_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut tp = 0usize;
    let mut fp = 0usize;

    let mut i = 0;
    while i < order.len() {
        // Consume the whole group of ties before emitting a point
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if y_true[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }

        fpr.push(fp as f64 / neg_total as f64);
        tpr.push(tp as f64 / pos_total as f64);
    }

    Some(RocCurve { fpr, tpr })
}

/// Area under a ROC curve by trapezoidal integration.
pub fn roc_auc(curve: &RocCurve) -> f64 {
    curve
        .fpr
        .windows(2)
        .zip(curve.tpr.windows(2))
        .map(|(fpr, tpr)| (fpr[1] - fpr[0]) * (tpr[1] + tpr[0]) / 2.0)
        .sum()
}
