//! Run summary and result tables

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::{ConfusionMatrix, EvaluationReport, Recipe, SearchResult};
use crate::utils::format_duration;

/// Column counts and stage timings of one run
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineSummary {
    pub initial_columns: usize,
    pub training_rows: usize,
    pub dropped_sparse: Vec<String>,
    pub coerced_to_missing: usize,
    pub candidates: usize,
    pub dropped_zero_variance: usize,
    pub dropped_near_zero_variance: usize,
    pub dropped_correlation: usize,
    pub predictors: usize,
    #[serde(skip)]
    pub timings: Vec<(String, Duration)>,
}

impl PipelineSummary {
    pub fn new(initial_columns: usize, training_rows: usize) -> Self {
        Self {
            initial_columns,
            training_rows,
            ..Default::default()
        }
    }

    pub fn add_sparse_drops(&mut self, columns: Vec<String>) {
        self.dropped_sparse = columns;
    }

    pub fn set_coercion(&mut self, converted: usize) {
        self.coerced_to_missing = converted;
    }

    pub fn set_recipe(&mut self, recipe: &Recipe) {
        self.candidates = recipe.candidates.len();
        self.dropped_zero_variance = recipe.zero_variance.len();
        self.dropped_near_zero_variance = recipe.near_zero_variance.len();
        self.dropped_correlation = recipe.correlated.len();
        self.predictors = recipe.predictors.len();
    }

    /// Record the duration of a stage; stages are listed in insertion order
    pub fn record_time(&mut self, stage: &str, elapsed: Duration) {
        self.timings.push((stage.to_string(), elapsed));
    }

    pub fn total_time(&self) -> Duration {
        self.timings.iter().map(|(_, d)| *d).sum()
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let drop_cell = |n: usize| {
            Cell::new(n).fg(if n == 0 { Color::White } else { Color::Red })
        };

        table.add_row(vec![
            Cell::new("📁 Initial Columns"),
            Cell::new(self.initial_columns),
        ]);
        table.add_row(vec![
            Cell::new("📄 Training Rows"),
            Cell::new(self.training_rows),
        ]);
        table.add_row(vec![
            Cell::new("🗑️  Dropped (Sparse)"),
            drop_cell(self.dropped_sparse.len()),
        ]);
        table.add_row(vec![
            Cell::new("❓ Values Set Missing"),
            Cell::new(self.coerced_to_missing).fg(if self.coerced_to_missing == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
        table.add_row(vec![
            Cell::new("🔢 Candidate Predictors"),
            Cell::new(self.candidates),
        ]);
        table.add_row(vec![
            Cell::new("➖ Dropped (Zero Variance)"),
            drop_cell(self.dropped_zero_variance),
        ]);
        table.add_row(vec![
            Cell::new("📉 Dropped (Near-Zero Var)"),
            drop_cell(self.dropped_near_zero_variance),
        ]);
        table.add_row(vec![
            Cell::new("🔗 Dropped (Correlation)"),
            drop_cell(self.dropped_correlation),
        ]);
        table.add_row(vec![
            Cell::new("✅ Final Predictors"),
            Cell::new(self.predictors)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table
    }

    pub fn display(&self) {
        print_section("📋", "RUN SUMMARY");
        print_indented(&self.table());

        if !self.timings.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("⏱").cyan(),
                style("STAGE TIMINGS").white().bold()
            );
            for (stage, elapsed) in &self.timings {
                println!(
                    "      {:<28} {}",
                    stage,
                    style(format_duration(*elapsed)).dim()
                );
            }
            println!(
                "      {:<28} {}",
                style("Total").bold(),
                style(format_duration(self.total_time())).bold()
            );
        }
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Top `limit` grid points by cross-validated AUC
pub fn leaderboard_table(search: &SearchResult, limit: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("mtry").add_attribute(Attribute::Bold),
        Cell::new("min_leaf").add_attribute(Attribute::Bold),
        Cell::new("Mean AUC").add_attribute(Attribute::Bold),
        Cell::new("Std Err").add_attribute(Attribute::Bold),
    ]);

    let best = search.best_candidate().combination;
    for (rank, candidate) in search.leaderboard().into_iter().take(limit).enumerate() {
        let is_best = candidate.combination == best;
        let auc = Cell::new(format!("{:.4}", candidate.mean_auc)).set_alignment(CellAlignment::Right);
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(candidate.combination.mtry),
            Cell::new(candidate.combination.min_leaf),
            if is_best {
                auc.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                auc
            },
            Cell::new(format!("{:.4}", candidate.std_err)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Confusion matrix with predicted classes as rows and true classes as columns
pub fn confusion_table(confusion: &ConfusionMatrix) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    let mut header = vec![Cell::new("Pred \\ True").add_attribute(Attribute::Bold)];
    header.extend(
        confusion
            .classes
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
    );
    header.push(Cell::new("Total").add_attribute(Attribute::Dim));
    table.set_header(header);

    let predicted = confusion.predicted_counts();
    for (i, class) in confusion.classes.iter().enumerate() {
        let mut row = vec![Cell::new(class).add_attribute(Attribute::Bold)];
        for (j, &n) in confusion.counts[i].iter().enumerate() {
            let cell = Cell::new(n).set_alignment(CellAlignment::Right);
            row.push(if i == j {
                cell.fg(Color::Green)
            } else if n > 0 {
                cell.fg(Color::Red)
            } else {
                cell
            });
        }
        row.push(Cell::new(predicted[i]).add_attribute(Attribute::Dim));
        table.add_row(row);
    }

    let mut totals = vec![Cell::new("Total").add_attribute(Attribute::Dim)];
    totals.extend(
        confusion
            .true_counts()
            .into_iter()
            .map(|n| Cell::new(n).add_attribute(Attribute::Dim)),
    );
    totals.push(Cell::new(confusion.total()).add_attribute(Attribute::Bold));
    table.add_row(totals);
    table
}

/// Top `limit` predictors by impurity importance
pub fn importance_table(report: &EvaluationReport, limit: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Predictor").add_attribute(Attribute::Bold),
        Cell::new("Gini Decrease").add_attribute(Attribute::Bold),
        Cell::new("Share").add_attribute(Attribute::Bold),
    ]);
    for (rank, imp) in report.importances.iter().take(limit).enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&imp.feature),
            Cell::new(format!("{:.2}", imp.importance)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", imp.percent)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Print the grid-search leaderboard
pub fn display_leaderboard(search: &SearchResult, limit: usize) {
    print_section("🏆", "GRID SEARCH LEADERBOARD");
    print_indented(&leaderboard_table(search, limit));
    println!(
        "      {} of {} combinations shown, {} folds each",
        limit.min(search.candidates.len()),
        search.candidates.len(),
        search.folds
    );
}

/// Print validation metrics, the confusion matrix and the importance ranking
pub fn display_evaluation(report: &EvaluationReport, importance_limit: usize) {
    print_section("🎯", "VALIDATION RESULTS");
    println!(
        "      Accuracy:  {}",
        style(format!("{:.2}%", report.accuracy * 100.0)).green().bold()
    );
    println!(
        "      Macro AUC: {}",
        style(format!("{:.4}", report.macro_auc)).green().bold()
    );
    let per_class: Vec<String> = report
        .per_class_auc
        .iter()
        .map(|c| match c.auc {
            Some(auc) => format!("{} {:.4}", c.class, auc),
            None => format!("{} n/a", c.class),
        })
        .collect();
    println!("      Per class: {}", style(per_class.join("  ")).dim());
    println!(
        "      Rows:      {}",
        report.validation_rows
    );

    print_section("🧮", "CONFUSION MATRIX");
    print_indented(&confusion_table(&report.confusion));

    print_section("🌲", "PREDICTOR IMPORTANCE");
    print_indented(&importance_table(report, importance_limit));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_timings() {
        let mut summary = PipelineSummary::new(160, 100);
        summary.record_time("Load", Duration::from_millis(250));
        summary.record_time("Search", Duration::from_millis(750));
        assert_eq!(summary.total_time(), Duration::from_secs(1));
        assert!(summary.table().to_string().contains("160"));
    }

    #[test]
    fn test_confusion_table_has_totals() {
        let classes = vec!["A".to_string(), "B".to_string()];
        let cm = ConfusionMatrix::new(&[0, 1, 1], &[0, 0, 1], &classes);
        let rendered = confusion_table(&cm).to_string();
        assert!(rendered.contains("Pred \\ True"));
        assert!(rendered.contains("Total"));
    }
}
