//! Zero-variance and near-zero-variance analysis

use std::collections::HashMap;

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::frame::float_values;

/// Frequency statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceStats {
    pub feature: String,
    /// Count of the most common value over the count of the second most common
    pub freq_ratio: f64,
    /// Distinct non-missing values as a percentage of non-missing values
    pub percent_unique: f64,
    pub distinct: usize,
    pub zero_variance: bool,
    pub near_zero_variance: bool,
}

/// Compute frequency statistics of a column of values.
///
/// Missing values are ignored. A column with fewer than two distinct values
/// is zero-variance and reports a frequency ratio of 0. Near-zero-variance
/// follows the usual heuristic: `freq_ratio > freq_cut` and
/// `percent_unique <= unique_cut`.
pub fn variance_stats(
    feature: &str,
    values: &[Option<f64>],
    freq_cut: f64,
    unique_cut: f64,
) -> VarianceStats {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    let mut n = 0usize;
    for v in values.iter().flatten() {
        // -0.0 and 0.0 are the same value
        let key = if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        *counts.entry(key).or_insert(0) += 1;
        n += 1;
    }

    let distinct = counts.len();
    let mut freqs: Vec<usize> = counts.into_values().collect();
    freqs.sort_unstable_by(|a, b| b.cmp(a));

    let freq_ratio = if freqs.len() < 2 {
        0.0
    } else {
        freqs[0] as f64 / freqs[1] as f64
    };
    let percent_unique = if n == 0 {
        0.0
    } else {
        100.0 * distinct as f64 / n as f64
    };
    let zero_variance = distinct < 2;

    VarianceStats {
        feature: feature.to_string(),
        freq_ratio,
        percent_unique,
        distinct,
        zero_variance,
        near_zero_variance: !zero_variance && freq_ratio > freq_cut && percent_unique <= unique_cut,
    }
}

/// Variance statistics for each of `columns`, in the given order
pub fn analyze_variance(
    df: &DataFrame,
    columns: &[String],
    freq_cut: f64,
    unique_cut: f64,
) -> Result<Vec<VarianceStats>> {
    columns
        .par_iter()
        .map(|name| {
            let values = float_values(df, name)?;
            Ok(variance_stats(name, &values, freq_cut, unique_cut))
        })
        .collect()
}
