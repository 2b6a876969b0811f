//! Dataset loader for CSV and Parquet files
//!
//! Every field is read as a string so that type coercion decides what each
//! value means. The header row is read by hand so column names can be
//! normalized before polars sees them.

use std::collections::HashMap;
use std::path::Path;

use polars::prelude::*;

use super::error::{PipelineError, Result};

/// Load a dataset as a raw string table.
///
/// Column names are normalized with [`normalize_column_names`], values are
/// trimmed and any value in `na_tokens` becomes null.
pub fn load_raw_table(path: &Path, na_tokens: &[String]) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let (header, columns) = match extension.as_str() {
        "csv" => read_csv_strings(path)?,
        "parquet" => read_parquet_strings(path)?,
        _ => {
            return Err(PipelineError::ingestion(
                path,
                format!(
                    "unsupported file format '{}'. Supported formats: csv, parquet",
                    extension
                ),
            ))
        }
    };

    let names = normalize_column_names(&header);
    let columns: Vec<Column> = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| {
            let cleaned: Vec<Option<String>> = values
                .into_iter()
                .map(|v| {
                    v.map(|s| s.trim().to_string())
                        .filter(|s| !na_tokens.iter().any(|t| t == s))
                })
                .collect();
            Column::new(name.into(), cleaned)
        })
        .collect();

    DataFrame::new(columns).map_err(|e| PipelineError::ingestion(path, e.to_string()))
}

/// Load a raw table and report (rows, columns, estimated MB) alongside it
pub fn load_raw_table_with_stats(
    path: &Path,
    na_tokens: &[String],
) -> Result<(DataFrame, usize, usize, f64)> {
    let df = load_raw_table(path, na_tokens)?;
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    Ok((df, rows, cols, memory_mb))
}

type RawColumns = (Vec<String>, Vec<Vec<Option<String>>>);

fn read_csv_strings(path: &Path) -> Result<RawColumns> {
    let df = LazyCsvReader::new(path)
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| PipelineError::ingestion(path, e.to_string()))?;

    if df.width() == 0 || df.height() == 0 {
        return Err(PipelineError::ingestion(path, "file has no header row"));
    }

    let mut header = Vec::with_capacity(df.width());
    let mut columns = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let ca = col
            .str()
            .map_err(|e| PipelineError::ingestion(path, e.to_string()))?;
        let mut values = ca.into_iter();
        header.push(values.next().flatten().unwrap_or("").to_string());
        columns.push(values.map(|v| v.map(str::to_string)).collect());
    }
    Ok((header, columns))
}

fn read_parquet_strings(path: &Path) -> Result<RawColumns> {
    let df = LazyFrame::scan_parquet(path, Default::default())
        .and_then(|lf| lf.collect())
        .map_err(|e| PipelineError::ingestion(path, e.to_string()))?;

    if df.width() == 0 {
        return Err(PipelineError::ingestion(path, "file has no columns"));
    }

    let mut header = Vec::with_capacity(df.width());
    let mut columns = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        header.push(col.name().to_string());
        let as_str = col
            .cast(&DataType::String)
            .map_err(|e| PipelineError::ingestion(path, e.to_string()))?;
        let ca = as_str
            .str()
            .map_err(|e| PipelineError::ingestion(path, e.to_string()))?;
        columns.push(ca.into_iter().map(|v| v.map(str::to_string)).collect());
    }
    Ok((header, columns))
}

/// Normalize one header field to snake_case.
///
/// An empty name becomes `x`, the conventional name of an unnamed row index.
pub fn normalize_column_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('"').trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut pending_sep = false;

    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        "x".to_string()
    } else {
        out
    }
}

/// Normalize a header row, suffixing duplicates with `_2`, `_3`, ...
pub fn normalize_column_names(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .map(|name| {
            let base = normalize_column_name(name);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

/// Read only the normalized column names of a file
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let df = load_raw_table(path, &[])?;
    Ok(df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect())
}
