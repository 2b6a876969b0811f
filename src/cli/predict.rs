//! Scoring a new table with a saved bundle

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::pipeline::{
    apply_column_filter, coerce, load_raw_table, score, write_predictions_csv, CoercionPolicy,
    PipelineConfig,
};
use crate::report::{load_bundle, predictions_path};
use crate::utils::{create_spinner, finish_with_success, print_warning};

/// Load `bundle`, prepare `input` with its recipe and write predictions as CSV
pub fn run_predict(bundle: &Path, input: &Path, output: Option<&Path>, lenient: bool) -> Result<()> {
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let parent = input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            predictions_path(parent, input)
        }
    };

    println!(
        "\n {} Scoring with a saved bundle",
        style("◆").cyan().bold()
    );
    println!("   Bundle: {}", style(bundle.display()).dim());
    println!("   Input:  {}", style(input.display()).dim());
    println!("   Output: {}", style(output_path.display()).dim());
    println!();

    let spinner = create_spinner("Loading bundle...");
    let (recipe, forest) = load_bundle(bundle)?;
    finish_with_success(
        &spinner,
        &format!(
            "Bundle loaded ({} trees, {} predictors)",
            forest.n_trees(),
            recipe.predictors.len()
        ),
    );

    let config = PipelineConfig {
        coercion: if lenient {
            CoercionPolicy::Lenient
        } else {
            CoercionPolicy::Strict
        },
        ..PipelineConfig::default()
    };

    let spinner = create_spinner("Preparing table...");
    let raw = load_raw_table(input, &config.na_tokens)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    // Only the recipe's predictors and an id column matter here
    let mut keep = recipe.predictors.clone();
    keep.push(crate::pipeline::SCORING_ID_COLUMN.to_string());
    let narrowed = apply_column_filter(&raw, &keep)?;
    let (typed, coercion) = coerce(&narrowed, &config)?;
    finish_with_success(&spinner, &format!("Prepared {} row(s)", typed.height()));
    if coercion.total() > 0 {
        print_warning(&format!(
            "{} unparsable value(s) treated as missing",
            coercion.total()
        ));
    }

    let spinner = create_spinner("Predicting...");
    let predictions = score(&forest, &recipe, &typed)?;
    write_predictions_csv(&predictions, &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    finish_with_success(&spinner, "Predictions written");

    for (class, count) in predictions.class_counts() {
        println!("      {}: {}", style(class).bold(), count);
    }
    println!();
    Ok(())
}
