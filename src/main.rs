//! harforest: activity-recognition modelling CLI
//!
//! Runs the full pipeline on a training table: column filter, type coercion,
//! feature preparation, cross-validated grid search, final fit, validation
//! report, optional scoring and a saved model bundle.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use harforest::cli::{confirm_search, predict::run_predict, Cli, Commands};
use harforest::pipeline::{
    build_grid, coerce, evaluate, filter_columns, fit_final, grid_search, load_raw_table_with_stats,
    prepare_training, score, write_predictions_csv,
};
use harforest::report::{
    bundle_path, display_evaluation, display_leaderboard, predictions_path, write_bundle,
    PipelineSummary, ReportParams, RunReport,
};
use harforest::utils::{
    create_search_bar, create_spinner, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Predict {
                bundle,
                input,
                output,
                lenient,
            } => run_predict(bundle, input, output.as_deref(), *lenient),
        };
    }

    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a training file.")
    })?;
    let output_dir = cli
        .output_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not derive an output directory"))?;
    let config = cli.pipeline_config();
    config.validate()?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(input, cli.score.as_deref(), &output_dir, &config);

    // Step 1: Load tables
    print_step_header(1, "Load Data");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading training table...");
    let (train_raw, rows, cols, memory_mb) = load_raw_table_with_stats(input, &config.na_tokens)
        .with_context(|| format!("Failed to load training table {}", input.display()))?;
    finish_with_success(&spinner, "Training table loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    let score_raw = match &cli.score {
        Some(path) => {
            let spinner = create_spinner("Reading scoring table...");
            let (df, rows, _, _) = load_raw_table_with_stats(path, &config.na_tokens)
                .with_context(|| format!("Failed to load scoring table {}", path.display()))?;
            finish_with_success(&spinner, &format!("Scoring table loaded ({} rows)", rows));
            Some(df)
        }
        None => None,
    };

    let mut summary = PipelineSummary::new(cols, rows);
    let elapsed = step_start.elapsed();
    summary.record_time("Load", elapsed);
    print_step_time(elapsed);

    // Step 2: Sparse column filter
    print_step_header(2, "Column Filter");
    let step_start = Instant::now();
    let filtered = filter_columns(&train_raw, score_raw.as_ref(), config.missing_threshold)?;
    if filtered.sparse.is_empty() {
        print_info("No columns at or below the populated-fraction threshold");
    } else {
        print_count(
            "sparse column(s)",
            filtered.sparse.len(),
            Some(&format!("(<= {:.1}% populated)", config.missing_threshold * 100.0)),
        );
        print_success("Dropped sparse columns from both tables");
    }
    summary.add_sparse_drops(filtered.sparse.clone());
    let elapsed = step_start.elapsed();
    summary.record_time("Column filter", elapsed);
    print_step_time(elapsed);

    // Step 3: Type coercion
    print_step_header(3, "Type Coercion");
    let step_start = Instant::now();
    let spinner = create_spinner("Coercing columns...");
    let (train, coercion) = coerce(&filtered.train, &config)?;
    let score_typed = match &filtered.score {
        Some(df) => {
            let (typed, report) = coerce(df, &config)?;
            if report.total() > 0 {
                print_warning(&format!(
                    "{} unparsable scoring value(s) treated as missing",
                    report.total()
                ));
            }
            Some(typed)
        }
        None => None,
    };
    if coercion.total() > 0 {
        finish_with_warning(
            &spinner,
            &format!(
                "{} unparsable value(s) treated as missing in {} column(s)",
                coercion.total(),
                coercion.converted_to_missing.len()
            ),
        );
        for (column, n) in coercion.converted_to_missing.iter().take(10) {
            println!("        {} {} ({})", style("•").dim(), column, n);
        }
    } else {
        finish_with_success(&spinner, "Columns coerced");
    }
    if coercion.rows_without_outcome > 0 {
        print_warning(&format!(
            "{} training row(s) without a class label removed",
            coercion.rows_without_outcome
        ));
    }
    summary.set_coercion(coercion.total());
    let elapsed = step_start.elapsed();
    summary.record_time("Type coercion", elapsed);
    print_step_time(elapsed);

    // Step 4: Split and feature preparation
    print_step_header(4, "Feature Preparation");
    let step_start = Instant::now();
    let spinner = create_spinner("Splitting and fitting the recipe...");
    let prepared = prepare_training(&train, &config)?;
    finish_with_success(&spinner, "Recipe fitted on the training partition");

    let recipe = &prepared.recipe;
    print_info(&format!(
        "Partition: {} training / {} validation rows",
        prepared.partition.train.len(),
        prepared.partition.test.len()
    ));
    print_count("candidate predictor(s)", recipe.candidates.len(), None);
    print_count("zero-variance predictor(s)", recipe.zero_variance.len(), None);
    print_count(
        "near-zero-variance predictor(s)",
        recipe.near_zero_variance.len(),
        Some(&format!(
            "(ratio > {}, unique <= {}%)",
            config.prep.freq_cut, config.prep.unique_cut
        )),
    );
    print_count(
        "correlated predictor(s)",
        recipe.correlated.len(),
        Some(&format!("(|r| > {:.2})", config.prep.correlation_threshold)),
    );
    for drop in recipe.correlated.iter().take(10) {
        println!(
            "        {} {} ({} r={:.3})",
            style("•").dim(),
            drop.feature,
            style(&drop.partner).dim(),
            drop.correlation
        );
    }
    print_success(&format!("{} predictor(s) retained", recipe.predictors.len()));
    summary.set_recipe(recipe);
    let elapsed = step_start.elapsed();
    summary.record_time("Feature preparation", elapsed);
    print_step_time(elapsed);

    // Step 5: Grid search
    print_step_header(5, "Hyperparameter Search");
    let grid = build_grid(&config.search, recipe.predictors.len())?;
    let fits = grid.len() * config.search.folds;
    if !cli.no_confirm && !confirm_search(grid.len(), config.search.folds, config.search.trees)? {
        println!("Cancelled by user.");
        return Ok(());
    }
    let step_start = Instant::now();
    let pb = create_search_bar(fits);
    let search = grid_search(
        &prepared.dataset,
        &prepared.partition.train,
        &config.search,
        config.seed,
        Some(&pb),
    );
    pb.finish_and_clear();
    let search = search?;
    let best = search.best_candidate();
    print_success(&format!(
        "Selected mtry={} min_leaf={} (mean AUC {:.4})",
        best.combination.mtry, best.combination.min_leaf, best.mean_auc
    ));
    display_leaderboard(&search, 10);
    let elapsed = step_start.elapsed();
    summary.record_time("Grid search", elapsed);
    print_step_time(elapsed);

    // Step 6: Final fit and validation
    print_step_header(6, "Final Fit & Evaluation");
    let step_start = Instant::now();
    let spinner = create_spinner("Refitting on the training partition...");
    let forest = fit_final(
        &prepared.dataset,
        &prepared.partition.train,
        search.best_params(),
        config.seed,
    )?;
    let evaluation = evaluate(&forest, &prepared.dataset, &prepared.partition.test)?;
    finish_with_success(&spinner, "Model evaluated on the validation partition");
    display_evaluation(&evaluation, 15);
    let elapsed = step_start.elapsed();
    summary.record_time("Final fit", elapsed);
    print_step_time(elapsed);

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    // Step 7: Score the scoring table
    let mut written_predictions = None;
    if let (Some(score_path), Some(score_df)) = (&cli.score, &score_typed) {
        print_step_header(7, "Scoring");
        let step_start = Instant::now();
        let spinner = create_spinner("Predicting scoring rows...");
        let predictions = score(&forest, recipe, score_df)?;
        let path = predictions_path(&output_dir, score_path);
        write_predictions_csv(&predictions, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        finish_with_success(&spinner, &format!("Predictions written to {}", path.display()));
        for (class, count) in predictions.class_counts() {
            println!("      {}: {}", style(class).bold(), count);
        }
        written_predictions = Some(path);
        let elapsed = step_start.elapsed();
        summary.record_time("Scoring", elapsed);
        print_step_time(elapsed);
    }

    // Step 8: Save bundle
    print_step_header(8, "Save Bundle");
    let step_start = Instant::now();
    let spinner = create_spinner("Writing bundle...");
    let zip_path = bundle_path(&output_dir, input);
    let report = RunReport::new(ReportParams {
        training_file: input,
        scoring_file: cli.score.as_deref(),
        predictions_file: written_predictions.as_deref(),
        config: &config,
        summary: &summary,
        populated: &filtered.populated,
        coercion: &coercion,
        search: &search,
        forest: &forest,
        evaluation: &evaluation,
    });
    write_bundle(&zip_path, &report, recipe, &forest)?;
    finish_with_success(&spinner, &format!("Bundle saved to {}", zip_path.display()));
    let elapsed = step_start.elapsed();
    summary.record_time("Save", elapsed);
    print_step_time(elapsed);

    summary.display();
    print_completion();

    Ok(())
}
