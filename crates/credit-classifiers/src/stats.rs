use std::cmp::Ordering;

use crate::error::{PipelineError, Result};

fn by_value(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Area under the ROC curve of `scores` against 0/1 `y_true`.
///
/// Computed as the normalised Mann-Whitney U statistic: rows are sorted by
/// score, tied scores share their average rank, and the rank sum of the
/// positives is compared with its minimum.
///
/// # Errors
///
/// Fails when the inputs differ in length, a score is NaN, a label is not 0/1,
/// or only one class is present (the curve is undefined).
pub fn roc_auc(y_true: &[i32], scores: &[f64]) -> Result<f64> {
    if y_true.len() != scores.len() {
        return Err(PipelineError::Evaluation(format!(
            "y_true has {} labels but y_pred has {} scores",
            y_true.len(),
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(PipelineError::Evaluation("y_pred contains NaN".to_string()));
    }
    if let Some(bad) = y_true.iter().find(|&&y| y != 0 && y != 1) {
        return Err(PipelineError::Evaluation(format!(
            "y_true must be binary (0/1), found {}",
            bad
        )));
    }

    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(PipelineError::Evaluation(
            "Only one class present in y_true. ROC AUC score is not defined in that case."
                .to_string(),
        ));
    }

    let mut sorted_indices: Vec<usize> = (0..scores.len()).collect();
    sorted_indices.sort_by(|&a, &b| by_value(&scores[a], &scores[b]));

    // Sum of (1-based, tie-averaged) ranks of the positives.
    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < sorted_indices.len() {
        let mut end = start + 1;
        while end < sorted_indices.len()
            && scores[sorted_indices[end]] == scores[sorted_indices[start]]
        {
            end += 1;
        }
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = sorted_indices[start..end]
            .iter()
            .filter(|&&i| y_true[i] == 1)
            .count();
        pos_rank_sum += avg_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Two-sample Kolmogorov-Smirnov test. Returns `(statistic, p_value)`.
///
/// Both samples must be non-empty and free of NaN.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> (f64, f64) {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(by_value);
    b.sort_by(by_value);

    let (n, m) = (a.len(), b.len());
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < n && j < m {
        let x = a[i].min(b[j]);
        while i < n && a[i] <= x {
            i += 1;
        }
        while j < m && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n as f64 - j as f64 / m as f64).abs());
    }

    let en = ((n * m) as f64 / (n + m) as f64).sqrt();
    (d, ks_p_value((en + 0.12 + 0.11 / en) * d))
}

/// Approximate p-value for a KS statistic using the Kolmogorov distribution.
pub fn ks_p_value(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    // P(D > d) ~= 2 * sum_{k>=1} (-1)^(k+1) * exp(-2 k^2 lambda^2)
    let mut p = 0.0;
    for k in 1..=100 {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let term = sign * (-2.0 * f64::from(k).powi(2) * lambda.powi(2)).exp();
        p += term;
        if term.abs() < 1e-10 {
            break;
        }
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// First Wasserstein distance between two empirical distributions.
pub fn wasserstein_distance(a: &[f64], b: &[f64]) -> f64 {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(by_value);
    b.sort_by(by_value);

    let mut all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    all.sort_by(by_value);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut distance = 0.0;
    for w in all.windows(2) {
        while i < a.len() && a[i] <= w[0] {
            i += 1;
        }
        while j < b.len() && b[j] <= w[0] {
            j += 1;
        }
        distance += (i as f64 / n - j as f64 / m).abs() * (w[1] - w[0]);
    }
    distance
}
