//! Column type coercion against the fixed activity-recognition schema

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{CoercionPolicy, CLASS_LABELS, OUTCOME_COLUMN};
use super::error::{PipelineError, Result};

/// Format of the `cvtd_timestamp` column (day/month/year hour:minute)
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Name given to an unnamed leading row-index column by the loader
pub const INDEX_COLUMN: &str = "x";

/// Semantic type a column is coerced to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SemanticType {
    Numeric,
    Categorical { labels: Vec<String> },
    Timestamp { format: String },
    Identifier,
}

impl SemanticType {
    fn describe(&self) -> String {
        match self {
            SemanticType::Numeric => "numeric".to_string(),
            SemanticType::Categorical { labels } => format!("one of {{{}}}", labels.join(", ")),
            SemanticType::Timestamp { format } => format!("timestamp ({})", format),
            SemanticType::Identifier => "text".to_string(),
        }
    }
}

/// Per-column target types; columns without an override are numeric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    overrides: Vec<(String, SemanticType)>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::activity()
    }
}

impl Schema {
    /// Schema of the weight-lifting activity tables
    pub fn activity() -> Self {
        Self::new()
            .with_override("user_name", SemanticType::Identifier)
            .with_override(
                "cvtd_timestamp",
                SemanticType::Timestamp {
                    format: TIMESTAMP_FORMAT.to_string(),
                },
            )
            .with_override(
                "new_window",
                SemanticType::Categorical {
                    labels: vec!["yes".to_string(), "no".to_string()],
                },
            )
            .with_override(
                OUTCOME_COLUMN,
                SemanticType::Categorical {
                    labels: CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
                },
            )
    }

    /// Schema where every column is numeric
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
        }
    }

    pub fn with_override(mut self, column: &str, ty: SemanticType) -> Self {
        self.overrides.retain(|(name, _)| name != column);
        self.overrides.push((column.to_string(), ty));
        self
    }

    pub fn type_of(&self, column: &str) -> SemanticType {
        self.overrides
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty.clone())
            .unwrap_or(SemanticType::Numeric)
    }
}

/// Values converted to missing under the lenient policy, per column
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoercionReport {
    pub converted_to_missing: Vec<(String, usize)>,
    /// Rows removed because their outcome was missing after coercion
    pub rows_without_outcome: usize,
}

impl CoercionReport {
    pub fn total(&self) -> usize {
        self.converted_to_missing.iter().map(|(_, n)| n).sum()
    }
}

/// Cast every column of `df` to its semantic type.
///
/// Under [`CoercionPolicy::Strict`] the first unparsable value aborts with
/// [`PipelineError::TypeCoercion`].
pub fn coerce_table(
    df: &DataFrame,
    schema: &Schema,
    policy: CoercionPolicy,
) -> Result<(DataFrame, CoercionReport)> {
    let mut report = CoercionReport::default();
    let mut columns = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let name = col.name().to_string();
        let ty = schema.type_of(&name);
        let (coerced, converted) = coerce_column(col, &name, &ty, policy)?;
        if converted > 0 {
            report.converted_to_missing.push((name, converted));
        }
        columns.push(coerced);
    }

    Ok((DataFrame::new(columns)?, report))
}

fn coerce_column(
    col: &Column,
    name: &str,
    ty: &SemanticType,
    policy: CoercionPolicy,
) -> Result<(Column, usize)> {
    if matches!(ty, SemanticType::Numeric) && col.dtype().is_primitive_numeric() {
        return Ok((col.cast(&DataType::Float64)?, 0));
    }

    let as_str = col.cast(&DataType::String)?;
    let values = as_str.str()?;
    let mut converted = 0usize;

    let mut check = |row: usize, raw: &str, parsed: bool| -> Result<bool> {
        if parsed {
            return Ok(true);
        }
        match policy {
            CoercionPolicy::Strict => Err(PipelineError::TypeCoercion {
                column: name.to_string(),
                row: row + 1,
                value: raw.to_string(),
                expected: ty.describe(),
            }),
            CoercionPolicy::Lenient => {
                converted += 1;
                Ok(false)
            }
        }
    };

    let column = match ty {
        SemanticType::Numeric => {
            let mut out: Vec<Option<f64>> = Vec::with_capacity(values.len());
            for (row, v) in values.into_iter().enumerate() {
                out.push(match v {
                    None => None,
                    Some(raw) => {
                        let parsed = raw.trim().parse::<f64>().ok().filter(|x| x.is_finite());
                        if check(row, raw, parsed.is_some())? {
                            parsed
                        } else {
                            None
                        }
                    }
                });
            }
            Column::new(name.into(), out)
        }
        SemanticType::Categorical { labels } => {
            let mut out: Vec<Option<String>> = Vec::with_capacity(values.len());
            for (row, v) in values.into_iter().enumerate() {
                out.push(match v {
                    None => None,
                    Some(raw) => {
                        let value = raw.trim();
                        let known = labels.iter().any(|l| l == value);
                        if check(row, raw, known)? {
                            Some(value.to_string())
                        } else {
                            None
                        }
                    }
                });
            }
            Column::new(name.into(), out)
        }
        SemanticType::Timestamp { format } => {
            let mut out: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for (row, v) in values.into_iter().enumerate() {
                out.push(match v {
                    None => None,
                    Some(raw) => {
                        let parsed = NaiveDateTime::parse_from_str(raw.trim(), format)
                            .ok()
                            .map(|dt| dt.and_utc().timestamp_millis());
                        if check(row, raw, parsed.is_some())? {
                            parsed
                        } else {
                            None
                        }
                    }
                });
            }
            Column::new(name.into(), out)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        SemanticType::Identifier => as_str.clone(),
    };

    Ok((column, converted))
}

/// Drop the leading row-index column if the table starts with one
pub fn drop_index_column(df: &DataFrame) -> Result<DataFrame> {
    let first_is_index = df
        .get_columns()
        .first()
        .map(|c| c.name().as_str() == INDEX_COLUMN)
        .unwrap_or(false);

    if !first_is_index {
        return Ok(df.clone());
    }
    let keep: Vec<String> = df
        .get_column_names()
        .iter()
        .skip(1)
        .map(|s| s.to_string())
        .collect();
    Ok(df.select(keep)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults_to_numeric() {
        let schema = Schema::activity();
        assert_eq!(schema.type_of("roll_belt"), SemanticType::Numeric);
        assert_eq!(schema.type_of("user_name"), SemanticType::Identifier);
        assert!(matches!(
            schema.type_of("classe"),
            SemanticType::Categorical { .. }
        ));
    }

    #[test]
    fn test_override_replaces_existing() {
        let schema = Schema::activity().with_override("user_name", SemanticType::Numeric);
        assert_eq!(schema.type_of("user_name"), SemanticType::Numeric);
    }

    #[test]
    fn test_drop_index_only_when_leading() {
        let df = df! {
            "x" => ["1", "2"],
            "roll_belt" => ["1.5", "2.5"],
        }
        .unwrap();
        let dropped = drop_index_column(&df).unwrap();
        let names: Vec<String> = dropped
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["roll_belt"]);

        let df = df! {
            "roll_belt" => ["1.5", "2.5"],
            "x" => ["1", "2"],
        }
        .unwrap();
        assert_eq!(drop_index_column(&df).unwrap().width(), 2);
    }
}
