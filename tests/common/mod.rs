//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::PathBuf;

use faer::Mat;
use harforest::pipeline::{Dataset, PipelineConfig, SearchConfig};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

pub const CLASSES: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Header of the synthetic activity tables.
///
/// - leading unnamed row-index column
/// - the six identifier columns
/// - `roll_belt`: separates the classes
/// - `pitch_belt`: partly informative
/// - `yaw_belt`, `magnet_arm_z`: noise
/// - `total_accel_belt`: ~2 x `roll_belt` (|r| > 0.99)
/// - `gyros_belt_x`: constant (zero variance)
/// - `min_yaw_dumbbell`: almost always 0 (near-zero variance)
/// - `kurtosis_roll_belt`: ~2% populated, the rest `NA` / `#DIV/0!` / empty
const FEATURE_HEADER: &str = "\"\",user_name,raw_timestamp_part_1,raw_timestamp_part_2,cvtd_timestamp,new_window,num_window,roll_belt,pitch_belt,yaw_belt,total_accel_belt,gyros_belt_x,min_yaw_dumbbell,magnet_arm_z,kurtosis_roll_belt";

fn feature_row(i: usize, class: usize, rng: &mut ChaCha8Rng) -> String {
    let users = ["carlitos", "pedro", "adelmo"];
    let roll = class as f64 * 10.0 + rng.gen_range(0.0..3.0);
    let pitch = ((class * 3) % 5) as f64 * 4.0 + rng.gen_range(0.0..6.0);
    let yaw = rng.gen_range(-90.0..90.0);
    let accel = roll * 2.0 + rng.gen_range(0.0..0.05);
    let min_yaw = if i % 40 == 7 { "1" } else { "0" };
    let magnet = rng.gen_range(-400.0..400.0);
    let kurtosis = match i % 50 {
        3 => "1.52".to_string(),
        5 => "#DIV/0!".to_string(),
        9 => String::new(),
        _ => "NA".to_string(),
    };
    let new_window = if i % 25 == 0 { "yes" } else { "no" };

    format!(
        "{},{},{},{},{:02}/12/2011 11:{:02},{},{},{:.4},{:.4},{:.4},{:.4},0,{},{:.3},{}",
        i + 1,
        users[i % users.len()],
        1322489729 + i as u64,
        100000 + i * 37,
        1 + i % 28,
        i % 60,
        new_window,
        1 + i / 10,
        roll,
        pitch,
        yaw,
        accel,
        min_yaw,
        magnet,
        kurtosis
    )
}

/// Training CSV text: `per_class` rows of each class A..E, interleaved
pub fn activity_training_csv(per_class: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut text = format!("{},classe\n", FEATURE_HEADER);
    for i in 0..per_class * CLASSES.len() {
        let class = i % CLASSES.len();
        let row = feature_row(i, class, &mut rng);
        writeln!(text, "{},{}", row, CLASSES[class]).unwrap();
    }
    text
}

/// Scoring CSV text with `problem_id` in place of the outcome.
///
/// Row `k` is generated from class `k % 5`, so the expected labels are known.
pub fn activity_scoring_csv(rows: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut text = format!("{},problem_id\n", FEATURE_HEADER);
    for k in 0..rows {
        let row = feature_row(k, k % CLASSES.len(), &mut rng);
        writeln!(text, "{},{}", row, k + 1).unwrap();
    }
    text
}

/// Write `content` to `name` inside a fresh temporary directory
pub fn create_temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (temp_dir, path)
}

/// Write a second file into an existing temporary directory
pub fn add_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let mut file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Dataset with `per_class` rows of each of five classes and `n_features`
/// columns; feature 0 separates the classes, the rest are noise
pub fn separable_dataset(per_class: usize, n_features: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = per_class * CLASSES.len();
    let labels: Vec<usize> = (0..n).map(|i| i % CLASSES.len()).collect();
    let noise: Vec<f64> = (0..n * n_features).map(|_| rng.gen_range(0.0..1.0)).collect();
    let features = Mat::<f64>::from_fn(n, n_features, |i, j| {
        if j == 0 {
            labels[i] as f64 * 2.0 + noise[i * n_features]
        } else {
            noise[i * n_features + j] * 10.0
        }
    });
    Dataset {
        features,
        feature_names: (0..n_features).map(|j| format!("f{}", j)).collect(),
        labels,
        classes: CLASSES.iter().map(|s| s.to_string()).collect(),
    }
}

/// Configuration small enough for tests to finish quickly
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        search: SearchConfig {
            folds: 3,
            grid_levels: 2,
            trees: 15,
            ..SearchConfig::default()
        },
        ..PipelineConfig::default()
    }
}

/// Assert that a DataFrame has specific columns
pub fn assert_has_columns(df: &DataFrame, expected_columns: &[&str]) {
    let actual: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_columns {
        assert!(
            actual.contains(&col.to_string()),
            "Expected column '{}' not found. Available columns: {:?}",
            col,
            actual
        );
    }
}

/// Assert that a DataFrame does not have specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_columns: &[&str]) {
    let actual: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_columns {
        assert!(
            !actual.contains(&col.to_string()),
            "Column '{}' should not be present. Available columns: {:?}",
            col,
            actual
        );
    }
}

/// Columns with known correlation structure
///
/// - `b` = 2 * `a` (r = 1)
/// - `c` = reversed `a` (r = -1)
/// - `d` unrelated to `a`
pub fn create_correlation_frame() -> DataFrame {
    df! {
        "label" => ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"],
        "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "b" => [2.0f64, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0],
        "c" => [10.0f64, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
        "d" => [5.0f64, 1.0, 8.0, 2.0, 9.0, 3.0, 7.0, 4.0, 6.0, 0.0],
    }
    .unwrap()
}
