//! Stage functions shared by the CLI and library callers
//!
//! The CLI calls these one at a time between its step headers; `run_pipeline`
//! chains them without any terminal output.

use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::*;

use super::config::PipelineConfig;
use super::dataset::Dataset;
use super::error::{PipelineError, Result};
use super::evaluate::{evaluate, fit_final, EvaluationReport};
use super::forest::RandomForest;
use super::frame::{string_values, take_rows};
use super::loader::load_raw_table;
use super::missing::{analyze_populated_fraction, apply_column_filter, get_retained_columns, get_sparse_columns};
use super::recipe::{apply_recipe, fit_recipe, Recipe};
use super::schema::{coerce_table, drop_index_column, CoercionReport, Schema};
use super::scoring::{score_table, Predictions, SCORING_ID_COLUMN};
use super::search::{grid_search, SearchResult};
use super::split::{stratified_split, Partition};

/// Training and scoring tables after the sparse-column filter
#[derive(Debug, Clone)]
pub struct FilteredTables {
    pub train: DataFrame,
    pub score: Option<DataFrame>,
    /// Populated fraction of every training column, in table order
    pub populated: Vec<(String, f64)>,
    pub retained: Vec<String>,
    pub sparse: Vec<String>,
}

/// Compute the retained columns on `train` and apply them to both tables.
///
/// The scoring table also keeps its `problem_id` column.
pub fn filter_columns(
    train: &DataFrame,
    score: Option<&DataFrame>,
    threshold: f64,
) -> Result<FilteredTables> {
    let populated = analyze_populated_fraction(train);
    let retained = get_retained_columns(&populated, threshold);
    let sparse = get_sparse_columns(&populated, threshold);

    let mut score_keep = retained.clone();
    if !score_keep.iter().any(|c| c == SCORING_ID_COLUMN) {
        score_keep.push(SCORING_ID_COLUMN.to_string());
    }
    Ok(FilteredTables {
        train: apply_column_filter(train, &retained)?,
        score: score
            .map(|df| apply_column_filter(df, &score_keep))
            .transpose()?,
        populated,
        retained,
        sparse,
    })
}

/// Coerce to the activity schema and drop the leading row index if configured.
///
/// When the table has the outcome column, rows whose outcome is missing
/// (an NA token, or a label converted under the lenient policy) are removed
/// and counted in the report.
pub fn coerce(df: &DataFrame, config: &PipelineConfig) -> Result<(DataFrame, CoercionReport)> {
    let (typed, mut report) = coerce_table(df, &Schema::activity(), config.coercion)?;
    let mut typed = if config.drop_index_column {
        drop_index_column(&typed)?
    } else {
        typed
    };

    let unlabeled = typed
        .column(&config.prep.outcome)
        .ok()
        .filter(|outcome| outcome.null_count() > 0)
        .map(|outcome| (outcome.null_count(), outcome.is_not_null()));
    if let Some((missing, mask)) = unlabeled {
        typed = typed.filter(&mask)?;
        report.rows_without_outcome = missing;
    }
    Ok((typed, report))
}

/// Distinct outcome labels, sorted
pub fn outcome_classes(df: &DataFrame, outcome: &str) -> Result<Vec<String>> {
    if df.column(outcome).is_err() {
        return Err(PipelineError::schema_mismatch(
            outcome,
            "outcome column not found in the training table",
        ));
    }
    let classes: BTreeSet<String> = string_values(df, outcome)?.into_iter().flatten().collect();
    if classes.len() < 2 {
        return Err(PipelineError::Model(format!(
            "outcome '{}' needs at least two classes, found {}",
            outcome,
            classes.len()
        )));
    }
    Ok(classes.into_iter().collect())
}

/// Everything the search and the final fit need
#[derive(Debug, Clone)]
pub struct PreparedTraining {
    pub classes: Vec<String>,
    pub partition: Partition,
    /// Recipe fit on the training partition only
    pub recipe: Recipe,
    pub dataset: Dataset,
}

/// Split the typed training table, fit the recipe on the training side and
/// apply it to every row
pub fn prepare_training(typed: &DataFrame, config: &PipelineConfig) -> Result<PreparedTraining> {
    let outcome = config.prep.outcome.as_str();
    let classes = outcome_classes(typed, outcome)?;
    let labels = super::dataset::encode_labels(typed, outcome, &classes)?;
    let partition = stratified_split(&labels, config.train_fraction, config.seed);

    let recipe = fit_recipe(&take_rows(typed, &partition.train)?, &config.prep)?;
    let prepared = apply_recipe(&recipe, typed)?;
    let dataset = Dataset::from_frame(&prepared, &recipe.predictors, outcome, &classes)?;

    Ok(PreparedTraining {
        classes,
        partition,
        recipe,
        dataset,
    })
}

/// Search, refit and evaluate
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub search: SearchResult,
    pub forest: RandomForest,
    pub evaluation: EvaluationReport,
}

pub fn train_and_evaluate(prepared: &PreparedTraining, config: &PipelineConfig) -> Result<TrainedModel> {
    let search = grid_search(
        &prepared.dataset,
        &prepared.partition.train,
        &config.search,
        config.seed,
        None,
    )?;
    let forest = fit_final(
        &prepared.dataset,
        &prepared.partition.train,
        search.best_params(),
        config.seed,
    )?;
    let evaluation = evaluate(&forest, &prepared.dataset, &prepared.partition.test)?;
    Ok(TrainedModel {
        search,
        forest,
        evaluation,
    })
}

/// Apply the recipe to a typed scoring table and predict every row
pub fn score(forest: &RandomForest, recipe: &Recipe, typed: &DataFrame) -> Result<Predictions> {
    let prepared = apply_recipe(recipe, typed)?;
    score_table(forest, recipe, &prepared)
}

/// Result of a full headless run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub filtered_columns: Vec<String>,
    pub coercion: CoercionReport,
    /// Coercion of the scoring table, when one was given
    pub score_coercion: Option<CoercionReport>,
    pub prepared: PreparedTraining,
    pub model: TrainedModel,
    pub predictions: Option<Predictions>,
}

/// Run every stage on the files at `train_path` and (optionally) `score_path`
pub fn run_pipeline(
    config: &PipelineConfig,
    train_path: &Path,
    score_path: Option<&Path>,
) -> Result<PipelineRun> {
    config.validate()?;

    let train_raw = load_raw_table(train_path, &config.na_tokens)?;
    let score_raw = score_path
        .map(|p| load_raw_table(p, &config.na_tokens))
        .transpose()?;

    let filtered = filter_columns(&train_raw, score_raw.as_ref(), config.missing_threshold)?;
    let (train, coercion) = coerce(&filtered.train, config)?;
    let (score_typed, score_coercion) = match filtered.score.as_ref() {
        Some(df) => {
            let (typed, report) = coerce(df, config)?;
            (Some(typed), Some(report))
        }
        None => (None, None),
    };

    let prepared = prepare_training(&train, config)?;
    let model = train_and_evaluate(&prepared, config)?;
    let predictions = score_typed
        .as_ref()
        .map(|df| score(&model.forest, &prepared.recipe, df))
        .transpose()?;

    Ok(PipelineRun {
        filtered_columns: filtered.sparse,
        coercion,
        score_coercion,
        prepared,
        model,
        predictions,
    })
}
