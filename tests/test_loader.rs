//! Tests for raw table ingestion

use harforest::pipeline::{
    get_column_names, load_raw_table, load_raw_table_with_stats, PipelineError, DEFAULT_NA_TOKENS,
};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

fn na_tokens() -> Vec<String> {
    DEFAULT_NA_TOKENS.iter().map(|s| s.to_string()).collect()
}

fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_load_csv_as_strings() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "a,b,c").unwrap();
    writeln!(file, "1,2.5,x").unwrap();
    writeln!(file, "4,5,y").unwrap();
    drop(file);

    let (df, rows, cols, mem_mb) = load_raw_table_with_stats(&csv_path, &na_tokens()).unwrap();

    assert_eq!(rows, 2, "Should have 2 data rows");
    assert_eq!(cols, 3, "Should have 3 columns");
    assert_eq!(names(&df), vec!["a", "b", "c"]);
    assert!(mem_mb >= 0.0, "Memory estimate should be non-negative");
    for col in df.get_columns() {
        assert_eq!(col.dtype(), &DataType::String, "raw columns are strings");
    }
}

#[test]
fn test_na_tokens_become_null() {
    let (_dir, path) = common::create_temp_file(
        "na.csv",
        "a,b\nNA,1\n#DIV/0!,2\n,3\n 7 ,4\n",
    );
    let df = load_raw_table(&path, &na_tokens()).unwrap();
    let a: Vec<Option<&str>> = df.column("a").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(a, vec![None, None, None, Some("7")]);
}

#[test]
fn test_header_normalization_and_index_column() {
    let (_dir, path) = common::create_temp_file(
        "hdr.csv",
        "\"\",User Name,roll.belt,Roll Belt\n1,pedro,1,2\n",
    );
    let columns = get_column_names(&path).unwrap();
    assert_eq!(columns, vec!["x", "user_name", "roll_belt", "roll_belt_2"]);
}

#[test]
fn test_load_parquet_casts_to_strings() {
    let mut df = df! {
        "x" => [1i32, 2, 3],
        "y" => [4.5f64, 5.5, 6.5],
    }
    .unwrap();
    let (_dir, path) = common::create_temp_parquet(&mut df);

    let loaded = load_raw_table(&path, &na_tokens()).unwrap();
    assert_eq!(loaded.shape(), (3, 2));
    assert_eq!(loaded.column("y").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_unsupported_extension() {
    let (_dir, path) = common::create_temp_file("data.txt", "a,b\n1,2\n");
    let err = load_raw_table(&path, &na_tokens()).unwrap_err();
    assert!(matches!(err, PipelineError::Ingestion { .. }));
    assert!(err.to_string().contains("unsupported file format"));
}

#[test]
fn test_missing_file_is_ingestion_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.csv");
    assert!(matches!(
        load_raw_table(&path, &na_tokens()),
        Err(PipelineError::Ingestion { .. })
    ));
}

#[test]
fn test_synthetic_activity_table_loads() {
    let (_dir, path) = common::create_temp_file("train.csv", &common::activity_training_csv(4, 1));
    let df = load_raw_table(&path, &na_tokens()).unwrap();
    assert_eq!(df.height(), 20);
    common::assert_has_columns(&df, &["x", "user_name", "cvtd_timestamp", "classe"]);
}
