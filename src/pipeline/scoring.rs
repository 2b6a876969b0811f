//! Class predictions for a prepared scoring table

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use super::dataset::design_matrix;
use super::error::Result;
use super::forest::{argmax, RandomForest};
use super::frame::{float_values, string_values};
use super::recipe::Recipe;

/// Identifier column of the scoring table
pub const SCORING_ID_COLUMN: &str = "problem_id";

/// Predicted class and class probabilities per scoring row
#[derive(Debug, Clone)]
pub struct Predictions {
    /// Name of the identifier column (`problem_id`, or `row` when absent)
    pub id_column: String,
    pub ids: Vec<String>,
    pub predicted: Vec<String>,
    /// Per-row probabilities in `classes` order
    pub probabilities: Vec<Vec<f64>>,
    pub classes: Vec<String>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }

    /// How many rows were assigned each class, in class order
    pub fn class_counts(&self) -> Vec<(String, usize)> {
        self.classes
            .iter()
            .map(|c| (c.clone(), self.predicted.iter().filter(|p| *p == c).count()))
            .collect()
    }

    /// Predictions as a table: id, `predicted`, then one `prob_<class>` per class
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![
            Column::new(self.id_column.as_str().into(), self.ids.clone()),
            Column::new("predicted".into(), self.predicted.clone()),
        ];
        for (k, class) in self.classes.iter().enumerate() {
            let values: Vec<f64> = self.probabilities.iter().map(|p| p[k]).collect();
            columns.push(Column::new(format!("prob_{}", class).into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Row identifiers: `problem_id` when present (integral values printed
/// without a fraction), else 1-based row numbers
fn row_ids(df: &DataFrame) -> Result<(String, Vec<String>)> {
    let Ok(col) = df.column(SCORING_ID_COLUMN) else {
        let ids = (1..=df.height()).map(|i| i.to_string()).collect();
        return Ok(("row".to_string(), ids));
    };

    let ids = if col.dtype().is_primitive_numeric() {
        float_values(df, SCORING_ID_COLUMN)?
            .into_iter()
            .map(|v| match v {
                Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
                Some(v) => v.to_string(),
                None => String::new(),
            })
            .collect()
    } else {
        string_values(df, SCORING_ID_COLUMN)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect()
    };
    Ok((SCORING_ID_COLUMN.to_string(), ids))
}

/// Predict every row of a table already passed through `apply_recipe`
pub fn score_table(forest: &RandomForest, recipe: &Recipe, prepared: &DataFrame) -> Result<Predictions> {
    let x = design_matrix(prepared, &recipe.predictors)?;
    let rows: Vec<usize> = (0..x.nrows()).collect();
    let probabilities = forest.predict_proba(&x, &rows)?;
    let predicted = probabilities
        .iter()
        .map(|p| forest.classes[argmax(p)].clone())
        .collect();
    let (id_column, ids) = row_ids(prepared)?;

    Ok(Predictions {
        id_column,
        ids,
        predicted,
        probabilities,
        classes: forest.classes.clone(),
    })
}

/// Write predictions as CSV with a header row
pub fn write_predictions_csv(predictions: &Predictions, path: &Path) -> Result<()> {
    let mut df = predictions.to_dataframe()?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_ids_fall_back_to_row_numbers() {
        let df = df! { "a" => [1.0f64, 2.0, 3.0] }.unwrap();
        let (name, ids) = row_ids(&df).unwrap();
        assert_eq!(name, "row");
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_row_ids_print_integral_problem_ids() {
        let df = df! { "problem_id" => [1.0f64, 20.0] }.unwrap();
        let (name, ids) = row_ids(&df).unwrap();
        assert_eq!(name, "problem_id");
        assert_eq!(ids, vec!["1", "20"]);
    }

    #[test]
    fn test_to_dataframe_layout() {
        let predictions = Predictions {
            id_column: "row".to_string(),
            ids: vec!["1".to_string(), "2".to_string()],
            predicted: vec!["B".to_string(), "A".to_string()],
            probabilities: vec![vec![0.25, 0.75], vec![0.6, 0.4]],
            classes: vec!["A".to_string(), "B".to_string()],
        };
        let df = predictions.to_dataframe().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["row", "predicted", "prob_A", "prob_B"]);
        assert_eq!(
            predictions.class_counts(),
            vec![("A".to_string(), 1), ("B".to_string(), 1)]
        );
    }
}
