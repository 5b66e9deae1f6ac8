//! Rank statistics used by the differential feature analyzer and the
//! epoch runners.
use anyhow::{anyhow, Result};
use ndarray::Array2;
use statrs::distribution::{ContinuousCDF, Normal};

/// Average ranks (1-based, ties share their mean rank) of `values`.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // indices i..=j hold tied values; they share the mean rank
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Two-sided Mann-Whitney U test via the normal approximation with tie and
/// continuity corrections. Returns `(U, p)` where U is the larger of the
/// two statistics.
///
/// Degenerate inputs (an empty group, or all values identical so the rank
/// variance vanishes) are an error; the analyzer treats that error as
/// p = 1.0.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let n1 = x.len() as f64;
    let n2 = y.len() as f64;
    if x.is_empty() || y.is_empty() {
        return Err(anyhow!("Mann-Whitney U needs two non-empty groups"));
    }

    let mut pooled: Vec<f64> = Vec::with_capacity(x.len() + y.len());
    pooled.extend_from_slice(x);
    pooled.extend_from_slice(y);
    let ranks = average_ranks(&pooled);

    let r1: f64 = ranks[..x.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let big_u = f64::max(u1, u2);

    // tie correction on the rank variance
    let n = n1 + n2;
    let mut sorted = pooled;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        tie_sum += t * t * t - t;
        i = j + 1;
    }
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_sum / (n * (n - 1.0)));
    if variance <= 0.0 {
        return Err(anyhow!("Mann-Whitney U is undefined for constant input"));
    }

    let mean = n1 * n2 / 2.0;
    let z = (big_u - mean - 0.5) / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).map_err(|e| anyhow!("normal distribution: {e}"))?;
    let p = (2.0 * (1.0 - normal.cdf(z))).clamp(0.0, 1.0);
    Ok((big_u, p))
}

/// Area under the ROC curve for one binary score column, computed from
/// average ranks. Errors when only one class is present.
fn roc_auc_binary(truth: &[bool], scores: &[f64]) -> Result<f64> {
    let n_pos = truth.iter().filter(|&&t| t).count() as f64;
    let n_neg = truth.len() as f64 - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        return Err(anyhow!("ROC AUC needs both classes present"));
    }
    let ranks = average_ranks(scores);
    let rank_sum: f64 = ranks
        .iter()
        .zip(truth)
        .filter(|(_, &t)| t)
        .map(|(r, _)| r)
        .sum();
    Ok((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Macro-averaged ROC AUC between one-hot labels and predicted scores of
/// the same shape.
pub fn roc_auc(labels: &Array2<f64>, scores: &Array2<f64>) -> Result<f64> {
    if labels.dim() != scores.dim() {
        return Err(anyhow!(
            "label/score shape mismatch: {:?} vs {:?}",
            labels.dim(),
            scores.dim()
        ));
    }
    let mut total = 0.0;
    for (truth_col, score_col) in labels.columns().into_iter().zip(scores.columns()) {
        let truth: Vec<bool> = truth_col.iter().map(|&v| v > 0.5).collect();
        let col: Vec<f64> = score_col.to_vec();
        total += roc_auc_binary(&truth, &col)?;
    }
    Ok(total / labels.ncols() as f64)
}

/// Linear-interpolation percentile (numpy's default), `q` in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(anyhow!("percentile of an empty slice"));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
