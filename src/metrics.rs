use itertools::Itertools;

use crate::error::{SeedForgeError, SfResult};

/// ROC curve as (false-positive-rate, true-positive-rate) pairs, threshold
/// swept from the highest score downward. Tied scores advance as one step.
/// Labels are binary: anything above 0.5 counts as positive.
pub fn roc_points(scores: &[f64], labels: &[f32]) -> SfResult<Vec<(f64, f64)>> {
    if scores.len() != labels.len() {
        return Err(SeedForgeError::Validation(format!(
            "scores/labels length mismatch: {} vs {}",
            scores.len(),
            labels.len()
        )));
    }
    let positives = labels.iter().filter(|&&l| l > 0.5).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(SeedForgeError::Validation(
            "ROC needs at least one positive and one negative label".to_string(),
        ));
    }

    let order: Vec<usize> = (0..scores.len())
        .sorted_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .collect();

    let mut points = Vec::with_capacity(scores.len() + 1);
    points.push((0.0, 0.0));

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut k = 0;
    while k < order.len() {
        let threshold = scores[order[k]];
        while k < order.len() && scores[order[k]] == threshold {
            if labels[order[k]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            k += 1;
        }
        points.push((fp as f64 / negatives as f64, tp as f64 / positives as f64));
    }

    Ok(points)
}

/// Area under an ROC curve by the trapezoidal rule.
pub fn roc_auc(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            (x1 - x0) * (y0 + y1) / 2.0
        })
        .sum()
}
