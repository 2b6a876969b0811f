//! Tests for fitting and applying the feature-preparation recipe

use harforest::pipeline::{
    apply_recipe, fit_recipe, predictor_columns, PipelineError, PrepConfig,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

/// 40 rows of a typed training table
fn training_frame() -> DataFrame {
    let n = 40usize;
    let labels: Vec<&str> = (0..n).map(|i| ["A", "B", "C", "D", "E"][i % 5]).collect();
    let signal: Vec<f64> = (0..n).map(|i| (i % 5) as f64 * 3.0 + (i % 7) as f64 * 0.1).collect();
    let twin: Vec<f64> = signal.iter().map(|v| v * 2.0 + 1.0).collect();
    let noise: Vec<Option<f64>> = (0..n)
        .map(|i| if i == 4 { None } else { Some(((i * 37) % 11) as f64) })
        .collect();
    let rare: Vec<f64> = (0..n).map(|i| if i == 13 { 1.0 } else { 0.0 }).collect();
    df! {
        "user_name" => (0..n).map(|i| if i % 2 == 0 { "pedro" } else { "adelmo" }).collect::<Vec<_>>(),
        "num_window" => (0..n).map(|i| i as f64).collect::<Vec<_>>(),
        "signal" => signal,
        "constant" => vec![7.0f64; n],
        "twin" => twin,
        "rare" => rare,
        "noise" => noise,
        "classe" => labels,
    }
    .unwrap()
}

#[test]
fn test_fit_removes_each_kind_of_predictor() {
    let df = training_frame();
    let recipe = fit_recipe(&df, &PrepConfig::default()).unwrap();

    assert_eq!(recipe.identifiers, vec!["user_name", "num_window"]);
    assert_eq!(recipe.candidates, vec!["signal", "constant", "twin", "rare", "noise"]);
    assert_eq!(recipe.zero_variance.len(), 1);
    assert_eq!(recipe.zero_variance[0].feature, "constant");
    assert_eq!(recipe.near_zero_variance.len(), 1);
    assert_eq!(recipe.near_zero_variance[0].feature, "rare");
    // signal and twin are exactly collinear; one of them goes
    assert_eq!(recipe.correlated.len(), 1);
    let dropped = recipe.correlated[0].feature.as_str();
    assert!(dropped == "signal" || dropped == "twin");
    assert_eq!(recipe.predictors.len(), 2);
    assert_eq!(recipe.predictors[1], "noise");
    assert_eq!(recipe.medians.len(), 2);
}

#[test]
fn test_apply_layout_and_imputation() {
    let df = training_frame();
    let recipe = fit_recipe(&df, &PrepConfig::default()).unwrap();
    let prepared = apply_recipe(&recipe, &df).unwrap();

    let names: Vec<String> = prepared.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut expected = vec!["user_name".to_string(), "num_window".to_string(), "classe".to_string()];
    expected.extend(recipe.predictors.iter().cloned());
    assert_eq!(names, expected);
    assert_eq!(prepared.column("noise").unwrap().null_count(), 0);
    let filled = prepared.column("noise").unwrap().f64().unwrap().get(4).unwrap();
    assert_eq!(filled, recipe.medians[1]);
}

#[test]
fn test_apply_to_scoring_table_keeps_predictor_order() {
    let df = training_frame();
    let recipe = fit_recipe(&df, &PrepConfig::default()).unwrap();

    // Different column order, no outcome, extra id column
    let score = df! {
        "problem_id" => [1.0f64, 2.0],
        "noise" => [Some(3.0f64), None],
        "twin" => [1.0f64, 2.0],
        "signal" => [0.5f64, 9.0],
    }
    .unwrap();
    let prepared = apply_recipe(&recipe, &score).unwrap();
    assert_eq!(predictor_columns(&recipe, &prepared), recipe.predictors);
    common::assert_missing_columns(&prepared, &[recipe.correlated[0].feature.as_str()]);
    common::assert_has_columns(&prepared, &["problem_id"]);
}

#[test]
fn test_apply_fails_on_missing_predictor() {
    let df = training_frame();
    let recipe = fit_recipe(&df, &PrepConfig::default()).unwrap();
    let score = df! { "signal" => [1.0f64], "twin" => [3.0f64] }.unwrap();
    match apply_recipe(&recipe, &score) {
        Err(PipelineError::SchemaMismatch { column, .. }) => assert_eq!(column, "noise"),
        other => panic!("expected a schema mismatch, got {:?}", other.map(|d| d.shape())),
    }
}

#[test]
fn test_fit_requires_outcome() {
    let df = df! { "signal" => [1.0f64, 2.0] }.unwrap();
    assert!(matches!(
        fit_recipe(&df, &PrepConfig::default()),
        Err(PipelineError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_recipe_serializes() {
    let df = training_frame();
    let recipe = fit_recipe(&df, &PrepConfig::default()).unwrap();
    let json = serde_json::to_string(&recipe).unwrap();
    let back: harforest::pipeline::Recipe = serde_json::from_str(&json).unwrap();
    assert_eq!(back.predictors, recipe.predictors);
    assert_eq!(back.dropped(), recipe.dropped());
    for (a, b) in back.medians.iter().zip(&recipe.medians) {
        assert!((a - b).abs() < 1e-9);
    }
}
