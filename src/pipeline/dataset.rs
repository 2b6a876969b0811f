//! Conversion of prepared tables into model inputs

use faer::Mat;
use polars::prelude::*;

use super::error::{PipelineError, Result};
use super::frame::{float_values, string_values};

/// Dense feature matrix (rows = observations) with integer class labels
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Mat<f64>,
    pub feature_names: Vec<String>,
    pub labels: Vec<usize>,
    pub classes: Vec<String>,
}

impl Dataset {
    pub fn from_frame(
        df: &DataFrame,
        predictors: &[String],
        outcome: &str,
        classes: &[String],
    ) -> Result<Self> {
        Ok(Self {
            features: design_matrix(df, predictors)?,
            feature_names: predictors.to_vec(),
            labels: encode_labels(df, outcome, classes)?,
            classes: classes.to_vec(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Predictor columns as a row-major view; every value must be present
pub fn design_matrix(df: &DataFrame, predictors: &[String]) -> Result<Mat<f64>> {
    let columns: Vec<Vec<f64>> = predictors
        .iter()
        .map(|name| {
            float_values(df, name)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        PipelineError::schema_mismatch(
                            name,
                            format!("missing value at row {} after preparation", row + 1),
                        )
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    Ok(Mat::<f64>::from_fn(df.height(), predictors.len(), |i, j| {
        columns[j][i]
    }))
}

/// Outcome labels as indices into `classes`
pub fn encode_labels(df: &DataFrame, outcome: &str, classes: &[String]) -> Result<Vec<usize>> {
    string_values(df, outcome)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            let value = v.unwrap_or_default();
            classes
                .iter()
                .position(|c| *c == value)
                .ok_or_else(|| PipelineError::TypeCoercion {
                    column: outcome.to_string(),
                    row: row + 1,
                    value,
                    expected: format!("one of {{{}}}", classes.join(", ")),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_matrix_layout() {
        let df = df! {
            "a" => [1.0f64, 2.0, 3.0],
            "b" => [10.0f64, 20.0, 30.0],
        }
        .unwrap();
        let m = design_matrix(&df, &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m[(1, 0)], 20.0);
        assert_eq!(m[(2, 1)], 3.0);
    }

    #[test]
    fn test_design_matrix_rejects_missing() {
        let df = df! {
            "a" => [Some(1.0f64), None],
        }
        .unwrap();
        assert!(design_matrix(&df, &["a".to_string()]).is_err());
    }

    #[test]
    fn test_encode_labels() {
        let df = df! {
            "classe" => ["B", "A", "E"],
        }
        .unwrap();
        let classes: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        assert_eq!(encode_labels(&df, "classe", &classes).unwrap(), vec![1, 0, 4]);

        let bad = df! { "classe" => ["Z"] }.unwrap();
        assert!(matches!(
            encode_labels(&bad, "classe", &classes),
            Err(PipelineError::TypeCoercion { .. })
        ));
    }
}
