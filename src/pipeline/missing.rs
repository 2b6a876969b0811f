//! Missing value analysis and column filtering

use polars::prelude::*;

use super::error::Result;

/// Fraction of non-missing values per column, in table order.
pub fn analyze_populated_fraction(df: &DataFrame) -> Vec<(String, f64)> {
    let rows = df.height();
    df.get_columns()
        .iter()
        .map(|col| {
            let fraction = if rows == 0 {
                0.0
            } else {
                (rows - col.null_count()) as f64 / rows as f64
            };
            (col.name().to_string(), fraction)
        })
        .collect()
}

/// Columns whose populated fraction is strictly greater than `threshold`
pub fn get_retained_columns(populated: &[(String, f64)], threshold: f64) -> Vec<String> {
    populated
        .iter()
        .filter(|(_, fraction)| *fraction > threshold)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Columns at or below the threshold, for reporting
pub fn get_sparse_columns(populated: &[(String, f64)], threshold: f64) -> Vec<String> {
    populated
        .iter()
        .filter(|(_, fraction)| *fraction <= threshold)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Keep the retained columns that `df` actually has, in retained order.
///
/// Retained names absent from `df` are skipped, so a scoring table without
/// the outcome column passes through.
pub fn apply_column_filter(df: &DataFrame, retained: &[String]) -> Result<DataFrame> {
    let present: Vec<String> = retained
        .iter()
        .filter(|name| df.column(name).is_ok())
        .cloned()
        .collect();
    Ok(df.select(present)?)
}
