//! Feature-preparation recipe: fit once on training data, apply verbatim
//!
//! `fit_recipe` produces an immutable [`Recipe`]; `apply_recipe` is a pure
//! function of a recipe and a table. Nothing is refit when the recipe is
//! applied to validation or scoring data.

use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::PrepConfig;
use super::correlation::{correlation_matrix, select_features_to_drop, CorrelationDrop};
use super::error::{PipelineError, Result};
use super::frame::{column_names, float_values};
use super::variance::{analyze_variance, VarianceStats};

/// Version of the serialized recipe layout
pub const RECIPE_FORMAT_VERSION: u32 = 1;

/// Fitted feature-preparation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub format_version: u32,
    pub outcome: String,
    /// Identifier columns found in the training table
    pub identifiers: Vec<String>,
    /// Numeric columns considered as predictors before filtering
    pub candidates: Vec<String>,
    pub zero_variance: Vec<VarianceStats>,
    pub near_zero_variance: Vec<VarianceStats>,
    pub correlated: Vec<CorrelationDrop>,
    /// Final predictors, in model order
    pub predictors: Vec<String>,
    /// Training medians used to fill missing predictor values
    pub medians: Vec<f64>,
}

impl Recipe {
    /// Candidate predictors removed by any filter
    pub fn dropped(&self) -> Vec<String> {
        let kept: HashSet<&String> = self.predictors.iter().collect();
        self.candidates
            .iter()
            .filter(|c| !kept.contains(c))
            .cloned()
            .collect()
    }
}

/// Fit the recipe on a training table.
///
/// Candidates are the numeric columns that are neither the outcome nor an
/// identifier. Zero-variance, then near-zero-variance, then correlated
/// columns are removed; medians of the survivors are recorded.
pub fn fit_recipe(df: &DataFrame, config: &PrepConfig) -> Result<Recipe> {
    if df.column(&config.outcome).is_err() {
        return Err(PipelineError::schema_mismatch(
            &config.outcome,
            "outcome column not found in the training table",
        ));
    }

    let identifiers: Vec<String> = config
        .identifiers
        .iter()
        .filter(|c| df.column(c).is_ok())
        .cloned()
        .collect();

    let candidates: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|col| col.dtype().is_primitive_numeric())
        .map(|col| col.name().to_string())
        .filter(|name| *name != config.outcome && !identifiers.contains(name))
        .collect();

    let stats = analyze_variance(df, &candidates, config.freq_cut, config.unique_cut)?;
    let zero_variance: Vec<VarianceStats> =
        stats.iter().filter(|s| s.zero_variance).cloned().collect();
    let near_zero_variance: Vec<VarianceStats> = stats
        .iter()
        .filter(|s| s.near_zero_variance)
        .cloned()
        .collect();

    let survivors: Vec<String> = stats
        .iter()
        .filter(|s| !s.zero_variance && !s.near_zero_variance)
        .map(|s| s.feature.clone())
        .collect();

    let matrix = correlation_matrix(df, &survivors, None)?;
    let correlated = select_features_to_drop(&matrix, &survivors, config.correlation_threshold);
    let removed: HashSet<&str> = correlated.iter().map(|d| d.feature.as_str()).collect();

    let predictors: Vec<String> = survivors
        .iter()
        .filter(|name| !removed.contains(name.as_str()))
        .cloned()
        .collect();

    let medians = predictors
        .iter()
        .map(|name| {
            let values: Vec<f64> = float_values(df, name)?.into_iter().flatten().collect();
            median(&values).ok_or_else(|| {
                PipelineError::schema_mismatch(name, "no observed values to compute a median")
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(Recipe {
        format_version: RECIPE_FORMAT_VERSION,
        outcome: config.outcome.clone(),
        identifiers,
        candidates,
        zero_variance,
        near_zero_variance,
        correlated,
        predictors,
        medians,
    })
}

/// Apply a fitted recipe to any table.
///
/// Output layout: columns the recipe does not treat as predictors
/// (identifiers, outcome, unknown columns) in input order, then the
/// predictors in recipe order as `Float64` with missing values filled by
/// the training medians. Candidates the recipe dropped are removed.
pub fn apply_recipe(recipe: &Recipe, df: &DataFrame) -> Result<DataFrame> {
    let predictor_set: HashSet<&str> = recipe.predictors.iter().map(String::as_str).collect();
    let dropped: HashSet<String> = recipe.dropped().into_iter().collect();

    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for name in column_names(df) {
        if predictor_set.contains(name.as_str()) || dropped.contains(&name) {
            continue;
        }
        columns.push(df.column(&name)?.clone());
    }

    for (name, fill) in recipe.predictors.iter().zip(recipe.medians.iter()) {
        if df.column(name).is_err() {
            return Err(PipelineError::schema_mismatch(
                name,
                "required predictor column is missing from the table",
            ));
        }
        let values: Vec<f64> = float_values(df, name)?
            .into_iter()
            .map(|v| v.unwrap_or(*fill))
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Predictor columns of a prepared table, in the order they appear
pub fn predictor_columns(recipe: &Recipe, df: &DataFrame) -> Vec<String> {
    let predictor_set: HashSet<&str> = recipe.predictors.iter().map(String::as_str).collect();
    column_names(df)
        .into_iter()
        .filter(|name| predictor_set.contains(name.as_str()))
        .collect()
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
