//! Small DataFrame accessors shared by the pipeline stages

use polars::prelude::*;

use super::error::{PipelineError, Result};

/// Column values as `f64`, casting numeric types
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df.column(name)?;
    if !col.dtype().is_primitive_numeric() {
        return Err(PipelineError::schema_mismatch(
            name,
            format!("expected a numeric column, found {}", col.dtype()),
        ));
    }
    let cast = col.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Column values as strings, casting non-string types
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let cast = df.column(name)?.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Column names of `df` as owned strings
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Rows of `df` at `indices`, in the given order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}
