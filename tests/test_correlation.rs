//! Tests for correlation analysis and greedy decorrelation

use harforest::pipeline::{correlation_matrix, find_correlated_pairs, select_features_to_drop};
use indicatif::ProgressBar;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn names(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_pair_at_095_drops_exactly_one() {
    // b = a + small perturbation, |r| about 0.95
    let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..20)
        .map(|i| i as f64 + if i % 2 == 0 { 2.5 } else { -2.5 })
        .collect();
    let df = df! { "a" => a, "b" => b }.unwrap();
    let cols = names(&["a", "b"]);
    let matrix = correlation_matrix(&df, &cols, None).unwrap();
    let r = matrix[(0, 1)];
    assert!(r > 0.9 && r < 0.99, "r = {}", r);

    let drops = select_features_to_drop(&matrix, &cols, 0.9);
    assert_eq!(drops.len(), 1);
    // Equal mean |r| on both sides, so the later column goes
    assert_eq!(drops[0].feature, "b");
    assert_eq!(drops[0].partner, "a");
}

#[test]
fn test_drops_member_with_higher_mean_correlation() {
    let df = common::create_correlation_frame();
    let cols = names(&["a", "b", "c", "d"]);
    let matrix = correlation_matrix(&df, &cols, None).unwrap();

    let pairs = find_correlated_pairs(&matrix, &cols, 0.9);
    assert!(!pairs.is_empty());
    assert!(pairs.windows(2).all(|w| w[0].correlation.abs() >= w[1].correlation.abs()));

    let drops = select_features_to_drop(&matrix, &cols, 0.9);
    let dropped: Vec<&str> = drops.iter().map(|d| d.feature.as_str()).collect();
    // a, b and c are mutually collinear; two of them must go, d stays
    assert_eq!(dropped.len(), 2);
    assert!(!dropped.contains(&"d"));
}

#[test]
fn test_no_drops_below_threshold() {
    let df = common::create_correlation_frame();
    let cols = names(&["a", "d"]);
    let matrix = correlation_matrix(&df, &cols, None).unwrap();
    assert!(select_features_to_drop(&matrix, &cols, 0.9).is_empty());
}

#[test]
fn test_matrix_path_matches_pairwise_path() {
    // 16 complete columns take the matrix path; a 2-column slice takes the pairwise path
    let n = 30;
    let mut columns: Vec<Column> = Vec::new();
    for j in 0..16 {
        let values: Vec<f64> = (0..n)
            .map(|i| ((i * (j + 3)) % 17) as f64 + (i as f64) * 0.1 * j as f64)
            .collect();
        columns.push(Column::new(format!("f{}", j).into(), values));
    }
    let df = DataFrame::new(columns).unwrap();
    let all: Vec<String> = (0..16).map(|j| format!("f{}", j)).collect();

    let full = correlation_matrix(&df, &all, None).unwrap();
    let pair = correlation_matrix(&df, &all[3..5], None).unwrap();
    assert!((full[(3, 4)] - pair[(0, 1)]).abs() < 1e-9);
    assert!((full[(5, 5)] - 1.0).abs() < 1e-12);
}

#[test]
fn test_pairwise_progress_is_caller_owned() {
    let df = common::create_correlation_frame();
    let cols = names(&["a", "b", "c", "d"]);

    let pb = ProgressBar::hidden();
    let with_bar = correlation_matrix(&df, &cols, Some(&pb)).unwrap();
    assert_eq!(pb.length(), Some(6));
    assert_eq!(pb.position(), 6);

    let without = correlation_matrix(&df, &cols, None).unwrap();
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(with_bar[(i, j)], without[(i, j)]);
        }
    }
}
