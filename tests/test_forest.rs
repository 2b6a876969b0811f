//! Tests for the random-forest classifier

use harforest::pipeline::forest::{argmax, ForestParams, RandomForest};

#[path = "common/mod.rs"]
mod common;

fn params(trees: usize, mtry: usize, min_leaf: usize) -> ForestParams {
    ForestParams {
        trees,
        mtry,
        min_leaf,
    }
}

#[test]
fn test_forest_generalizes_on_separable_data() {
    let data = common::separable_dataset(30, 4, 11);
    let train: Vec<usize> = (0..120).collect();
    let test: Vec<usize> = (120..150).collect();

    let forest = RandomForest::fit(&data, &train, params(40, 2, 2), 5).unwrap();
    let predicted = forest.predict(&data.features, &test).unwrap();
    let correct = predicted
        .iter()
        .zip(&test)
        .filter(|(p, &r)| **p == data.labels[r])
        .count();
    assert!(correct >= 27, "only {} of 30 correct", correct);
}

#[test]
fn test_importance_ranks_signal_first() {
    let data = common::separable_dataset(20, 5, 2);
    let rows: Vec<usize> = (0..data.n_rows()).collect();
    let forest = RandomForest::fit(&data, &rows, params(30, 2, 1), 8).unwrap();

    let ranked = forest.feature_importances();
    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked[0].0, "f0");
    assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
}

#[test]
fn test_larger_min_leaf_gives_smoother_probabilities() {
    let data = common::separable_dataset(20, 3, 4);
    let rows: Vec<usize> = (0..data.n_rows()).collect();
    let deep = RandomForest::fit(&data, &rows, params(10, 3, 1), 1).unwrap();
    let shallow = RandomForest::fit(&data, &rows, params(10, 3, 40), 1).unwrap();

    let max_prob = |forest: &RandomForest| {
        forest
            .predict_proba(&data.features, &rows)
            .unwrap()
            .iter()
            .map(|p| p[argmax(p)])
            .sum::<f64>()
            / rows.len() as f64
    };
    assert!(max_prob(&deep) > max_prob(&shallow));
}

#[test]
fn test_forest_serializes() {
    let data = common::separable_dataset(10, 3, 6);
    let rows: Vec<usize> = (0..data.n_rows()).collect();
    let forest = RandomForest::fit(&data, &rows, params(5, 2, 2), 3).unwrap();
    let json = serde_json::to_string(&forest).unwrap();
    let back: RandomForest = serde_json::from_str(&json).unwrap();
    let before = forest.predict_proba(&data.features, &rows).unwrap();
    let after = back.predict_proba(&data.features, &rows).unwrap();
    for (a, b) in before.iter().zip(&after) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9);
        }
    }
}
