//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{CoercionPolicy, PipelineConfig, PrepConfig, SearchConfig};

/// harforest - Tune and evaluate a random forest on weight-lifting activity data
#[derive(Parser, Debug)]
#[command(name = "harforest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Training table (CSV or Parquet) with the `classe` outcome column
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Scoring table (CSV or Parquet) to predict after training
    #[arg(short, long)]
    pub score: Option<PathBuf>,

    /// Output directory for the bundle and predictions.
    /// Defaults to the directory of the training file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Drop columns whose non-missing fraction is at or below this value
    #[arg(long, default_value = "0.05", value_parser = validate_unit_interval)]
    pub missing_threshold: f64,

    /// Near-zero-variance cutoff on the most/second-most frequent value ratio
    #[arg(long, default_value = "19", value_parser = validate_freq_cut)]
    pub freq_cut: f64,

    /// Near-zero-variance cutoff on the percentage of distinct values
    #[arg(long, default_value = "10", value_parser = validate_percentage)]
    pub unique_cut: f64,

    /// Drop one predictor from each pair whose absolute correlation exceeds this value
    #[arg(long, default_value = "0.9", value_parser = validate_unit_interval)]
    pub correlation_threshold: f64,

    /// Share of each class placed in the training partition
    #[arg(long, default_value = "0.8", value_parser = validate_fraction)]
    pub train_fraction: f64,

    /// Cross-validation folds
    #[arg(long, default_value = "5")]
    pub folds: usize,

    /// Levels per hyperparameter axis of the search grid
    #[arg(long, default_value = "5")]
    pub grid_levels: usize,

    /// Trees per forest
    #[arg(long, default_value = "450")]
    pub trees: usize,

    /// Smallest number of predictors sampled per split
    #[arg(long, default_value = "1")]
    pub mtry_min: usize,

    /// Largest number of predictors sampled per split (clipped to the predictor count)
    #[arg(long)]
    pub mtry_max: Option<usize>,

    /// Smallest minimum leaf size in the grid
    #[arg(long, default_value = "2")]
    pub min_leaf_min: usize,

    /// Largest minimum leaf size in the grid
    #[arg(long, default_value = "40")]
    pub min_leaf_max: usize,

    /// Seed for the split, the folds and every forest
    #[arg(long, default_value = "20240")]
    pub seed: u64,

    /// Abort the grid search when it runs longer than this many seconds
    #[arg(long)]
    pub search_timeout: Option<u64>,

    /// Convert unparsable values to missing instead of failing the run
    #[arg(long, default_value = "false")]
    pub lenient: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a table with a previously written bundle
    Predict {
        /// Bundle zip written by a training run
        bundle: PathBuf,

        /// Table to score (CSV or Parquet)
        input: PathBuf,

        /// Output CSV (defaults to `<input stem>_predictions.csv` next to the input)
        output: Option<PathBuf>,

        /// Convert unparsable values to missing instead of failing
        #[arg(long, default_value = "false")]
        lenient: bool,
    },
}

impl Cli {
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Output directory, defaulting to the training file's directory
    pub fn output_dir(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(self.output.clone().unwrap_or_else(|| {
            input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        }))
    }

    /// Pipeline configuration from the parsed flags
    pub fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            missing_threshold: self.missing_threshold,
            coercion: if self.lenient {
                CoercionPolicy::Lenient
            } else {
                CoercionPolicy::Strict
            },
            train_fraction: self.train_fraction,
            seed: self.seed,
            prep: PrepConfig {
                freq_cut: self.freq_cut,
                unique_cut: self.unique_cut,
                correlation_threshold: self.correlation_threshold,
                ..PrepConfig::default()
            },
            search: SearchConfig {
                folds: self.folds,
                grid_levels: self.grid_levels,
                trees: self.trees,
                mtry_min: self.mtry_min,
                mtry_max: self.mtry_max,
                min_leaf_min: self.min_leaf_min,
                min_leaf_max: self.min_leaf_max,
                timeout_secs: self.search_timeout,
            },
            ..defaults
        }
    }
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a valid number", s))
}

/// Validator for thresholds in [0, 1]
fn validate_unit_interval(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!("must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for train_fraction, which must leave rows on both sides
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}

fn validate_freq_cut(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if value < 1.0 {
        Err(format!("must be at least 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

fn validate_percentage(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if !(0.0..=100.0).contains(&value) {
        Err(format!("must be between 0 and 100, got {}", value))
    } else {
        Ok(value)
    }
}
