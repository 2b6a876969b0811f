//! Pipeline configuration with defaults matching the reference analysis

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, Result};

/// Outcome column of the training table
pub const OUTCOME_COLUMN: &str = "classe";

/// Outcome labels, in reporting order
pub const CLASS_LABELS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Bookkeeping columns that never become predictors
pub const IDENTIFIER_COLUMNS: [&str; 6] = [
    "user_name",
    "raw_timestamp_part_1",
    "raw_timestamp_part_2",
    "cvtd_timestamp",
    "new_window",
    "num_window",
];

/// Tokens read as missing values
pub const DEFAULT_NA_TOKENS: [&str; 3] = ["NA", "", "#DIV/0!"];

/// How type coercion treats values that do not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Fail the run on the first unparsable value
    #[default]
    Strict,
    /// Convert unparsable values to missing and report how many were converted
    Lenient,
}

/// Settings for fitting the feature-preparation recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    pub outcome: String,
    pub identifiers: Vec<String>,
    /// Most-common / second-most-common frequency ratio above which a column may be near-zero-variance
    pub freq_cut: f64,
    /// Percent of distinct values at or below which a column may be near-zero-variance
    pub unique_cut: f64,
    /// Absolute correlation above which one column of a pair is dropped
    pub correlation_threshold: f64,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            outcome: OUTCOME_COLUMN.to_string(),
            identifiers: IDENTIFIER_COLUMNS.iter().map(|s| s.to_string()).collect(),
            freq_cut: 95.0 / 5.0,
            unique_cut: 10.0,
            correlation_threshold: 0.9,
        }
    }
}

/// Settings for the cross-validated grid search and the forests it fits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub folds: usize,
    pub grid_levels: usize,
    pub trees: usize,
    pub mtry_min: usize,
    /// Upper bound of the mtry axis; clipped to the predictor count (None = predictor count)
    pub mtry_max: Option<usize>,
    pub min_leaf_min: usize,
    pub min_leaf_max: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            grid_levels: 5,
            trees: 450,
            mtry_min: 1,
            mtry_max: None,
            min_leaf_min: 2,
            min_leaf_max: 40,
            timeout_secs: None,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Full configuration of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Columns whose non-missing fraction is at or below this are dropped
    pub missing_threshold: f64,
    pub na_tokens: Vec<String>,
    pub coercion: CoercionPolicy,
    /// Drop a leading unnamed row-index column after coercion
    pub drop_index_column: bool,
    pub train_fraction: f64,
    pub seed: u64,
    pub prep: PrepConfig,
    pub search: SearchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            missing_threshold: 0.05,
            na_tokens: DEFAULT_NA_TOKENS.iter().map(|s| s.to_string()).collect(),
            coercion: CoercionPolicy::Strict,
            drop_index_column: true,
            train_fraction: 0.8,
            seed: 20240,
            prep: PrepConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject values outside their meaningful range
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(PipelineError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, v
                )))
            }
        };
        unit("missing_threshold", self.missing_threshold)?;
        unit("correlation_threshold", self.prep.correlation_threshold)?;

        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "train_fraction must be strictly between 0.0 and 1.0, got {}",
                self.train_fraction
            )));
        }
        if self.prep.freq_cut < 1.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "freq_cut must be at least 1.0, got {}",
                self.prep.freq_cut
            )));
        }
        if !(0.0..=100.0).contains(&self.prep.unique_cut) {
            return Err(PipelineError::InvalidConfig(format!(
                "unique_cut must be between 0 and 100, got {}",
                self.prep.unique_cut
            )));
        }

        let s = &self.search;
        if s.folds < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "folds must be at least 2, got {}",
                s.folds
            )));
        }
        if s.grid_levels == 0 || s.trees == 0 {
            return Err(PipelineError::InvalidConfig(
                "grid_levels and trees must be at least 1".to_string(),
            ));
        }
        if s.mtry_min == 0 || s.min_leaf_min == 0 {
            return Err(PipelineError::InvalidConfig(
                "mtry_min and min_leaf_min must be at least 1".to_string(),
            ));
        }
        if let Some(max) = s.mtry_max {
            if max < s.mtry_min {
                return Err(PipelineError::InvalidConfig(format!(
                    "mtry range is empty: [{}, {}]",
                    s.mtry_min, max
                )));
            }
        }
        if s.min_leaf_max < s.min_leaf_min {
            return Err(PipelineError::InvalidConfig(format!(
                "min_leaf range is empty: [{}, {}]",
                s.min_leaf_min, s.min_leaf_max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.trees, 450);
        assert_eq!(config.search.folds, 5);
        assert!((config.prep.freq_cut - 19.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = PipelineConfig::default();
        config.train_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.search.folds = 1;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.search.mtry_min = 10;
        config.search.mtry_max = Some(5);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.prep.correlation_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
