//! Correlation-based feature reduction

use faer::Mat;
use indicatif::ProgressBar;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::frame::float_values;

/// Represents a correlated pair of features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// A feature removed by the correlation filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationDrop {
    pub feature: String,
    /// The column it was correlated with when it was dropped
    pub partner: String,
    pub correlation: f64,
    /// Mean absolute correlation of the dropped feature with the remaining columns
    pub mean_abs_correlation: f64,
    pub partner_mean_abs_correlation: f64,
}

/// Threshold for auto-selecting matrix vs pairwise correlation computation.
/// Matrix multiplication is more efficient when there are many columns.
const MATRIX_METHOD_COLUMN_THRESHOLD: usize = 15;

/// Pearson correlation over the rows where both values are present.
///
/// Uses a single-pass Welford update for numerical stability. Returns None
/// when fewer than two complete rows exist or either side is constant.
pub fn compute_pearson_correlation(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            n += 1.0;
            let dx = x - mean_x;
            let dy = y - mean_y;
            mean_x += dx / n;
            mean_y += dy / n;
            var_x += dx * (x - mean_x);
            var_y += dy * (y - mean_y);
            cov_xy += dx * (y - mean_y);
        }
    }

    if n < 2.0 || var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    Some((cov_xy / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Correlation matrix of `columns` in `df`.
///
/// Undefined correlations (constant columns) are stored as 0 and the
/// diagonal is 1. Complete data with many columns goes through a single
/// matrix product; otherwise pairs are computed in parallel over the rows
/// both columns have, advancing `progress` once per pair when given.
pub fn correlation_matrix(
    df: &DataFrame,
    columns: &[String],
    progress: Option<&ProgressBar>,
) -> Result<Mat<f64>> {
    let values: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|name| float_values(df, name))
        .collect::<Result<_>>()?;

    let complete = values.iter().all(|v| v.iter().all(Option::is_some));
    if complete && columns.len() >= MATRIX_METHOD_COLUMN_THRESHOLD {
        Ok(correlation_matrix_fast(&values))
    } else {
        Ok(correlation_matrix_pairwise(&values, progress))
    }
}

fn correlation_matrix_pairwise(
    values: &[Vec<Option<f64>>],
    progress: Option<&ProgressBar>,
) -> Mat<f64> {
    let n = values.len();
    let mut matrix = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        matrix[(i, i)] = 1.0;
    }
    if n < 2 {
        return matrix;
    }

    if let Some(pb) = progress {
        pb.set_length((n * (n - 1) / 2) as u64);
        pb.set_position(0);
    }

    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let coefficients: Vec<f64> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let r = compute_pearson_correlation(&values[i], &values[j]).unwrap_or(0.0);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            r
        })
        .collect();

    for (&(i, j), r) in pairs.iter().zip(coefficients) {
        matrix[(i, j)] = r;
        matrix[(j, i)] = r;
    }
    matrix
}

/// Compute the correlation matrix as `Z^T * Z` over standardized columns.
///
/// Requires complete data. Constant columns standardize to zero and so
/// correlate 0 with everything.
fn correlation_matrix_fast(values: &[Vec<Option<f64>>]) -> Mat<f64> {
    let n_cols = values.len();
    let n_rows = values.first().map(Vec::len).unwrap_or(0);

    let standardized: Vec<Vec<f64>> = values
        .par_iter()
        .map(|col| {
            let xs: Vec<f64> = col.iter().map(|v| v.unwrap_or(0.0)).collect();
            let n = xs.len() as f64;
            if n == 0.0 {
                return xs;
            }
            let mean = xs.iter().sum::<f64>() / n;
            let ss: f64 = xs.iter().map(|x| (x - mean).powi(2)).sum();
            if ss <= 0.0 {
                return vec![0.0; xs.len()];
            }
            let scale = ss.sqrt();
            xs.iter().map(|x| (x - mean) / scale).collect()
        })
        .collect();

    let z = Mat::<f64>::from_fn(n_rows, n_cols, |i, j| standardized[j][i]);
    let mut matrix = z.transpose() * &z;
    for i in 0..n_cols {
        matrix[(i, i)] = 1.0;
        for j in 0..n_cols {
            matrix[(i, j)] = matrix[(i, j)].clamp(-1.0, 1.0);
        }
    }
    matrix
}

/// Pairs whose absolute correlation exceeds `threshold`, strongest first
pub fn find_correlated_pairs(
    matrix: &Mat<f64>,
    names: &[String],
    threshold: f64,
) -> Vec<CorrelatedPair> {
    let n = names.len();
    let mut pairs = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let corr = matrix[(i, j)];
            if corr.abs() > threshold && !corr.is_nan() {
                pairs.push(CorrelatedPair {
                    feature1: names[i].clone(),
                    feature2: names[j].clone(),
                    correlation: corr,
                });
            }
        }
    }

    pairs.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs
}

/// Greedily decorrelate: while the strongest remaining pair exceeds
/// `threshold`, drop the member with the higher mean absolute correlation
/// against the other remaining columns (the later column on a tie).
pub fn select_features_to_drop(
    matrix: &Mat<f64>,
    names: &[String],
    threshold: f64,
) -> Vec<CorrelationDrop> {
    let n = names.len();
    let mut active = vec![true; n];
    let mut drops = Vec::new();

    let abs_at = |i: usize, j: usize| {
        let r = matrix[(i, j)];
        if r.is_nan() {
            0.0
        } else {
            r.abs()
        }
    };

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let r = abs_at(i, j);
                if best.map_or(true, |(_, _, b)| r > b) {
                    best = Some((i, j, r));
                }
            }
        }

        let (i, j, r) = match best {
            Some(b) if b.2 > threshold => b,
            _ => break,
        };

        let mean_abs = |k: usize| {
            let others: Vec<f64> = (0..n)
                .filter(|&m| m != k && active[m])
                .map(|m| abs_at(k, m))
                .collect();
            others.iter().sum::<f64>() / others.len().max(1) as f64
        };
        let mean_i = mean_abs(i);
        let mean_j = mean_abs(j);

        let (drop, keep, drop_mean, keep_mean) = if mean_i > mean_j {
            (i, j, mean_i, mean_j)
        } else {
            (j, i, mean_j, mean_i)
        };
        active[drop] = false;
        drops.push(CorrelationDrop {
            feature: names[drop].clone(),
            partner: names[keep].clone(),
            correlation: matrix[(i, j)].signum() * r,
            mean_abs_correlation: drop_mean,
            partner_mean_abs_correlation: keep_mean,
        });
    }

    drops
}
