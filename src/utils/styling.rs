//! Terminal styling for the pipeline's console output

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

use crate::pipeline::PipelineConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TREE: Emoji<'_, '_> = Emoji("🌲 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");

const BOX_WIDTH: usize = 60;

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ╦ ╦╔═╗╦═╗  ┌─┐┌─┐┬─┐┌─┐┌─┐┌┬┐
    ╠═╣╠═╣╠╦╝  ├┤ │ │├┬┘├┤ └─┐ │
    ╩ ╩╩ ╩╩╚═  └  └─┘┴└─└─┘└─┘ ┴
    "#;

    println!();
    println!("{}", style(banner).green().bold());
    println!(
        "    {}",
        style("Activity recognition with tuned random forests").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

fn card_line(icon: &Emoji<'_, '_>, label: &str, value: String) {
    println!(
        "    │  {}{:<24}{:<width$}│",
        icon,
        label,
        value,
        width = BOX_WIDTH - 30
    );
}

/// Print the configuration card
pub fn print_config(input: &Path, score: Option<&Path>, output_dir: &Path, config: &PipelineConfig) {
    let line = "─".repeat(BOX_WIDTH - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(BOX_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    card_line(&FOLDER, "Training:", truncate_path(input, 28));
    card_line(
        &FOLDER,
        "Scoring:",
        score
            .map(|p| truncate_path(p, 28))
            .unwrap_or_else(|| "-".to_string()),
    );
    card_line(&SAVE, "Output dir:", truncate_path(output_dir, 28));
    println!("    ├{}┤", line);
    card_line(
        &CHART,
        "Missing threshold:",
        format!("{:.1}%", config.missing_threshold * 100.0),
    );
    card_line(
        &LINK,
        "Correlation cutoff:",
        format!("{:.2}", config.prep.correlation_threshold),
    );
    card_line(
        &TREE,
        "Trees / folds:",
        format!("{} / {}", config.search.trees, config.search.folds),
    );
    card_line(
        &TREE,
        "min_leaf range:",
        format!("[{}, {}]", config.search.min_leaf_min, config.search.min_leaf_max),
    );
    card_line(&DICE, "Seed:", config.seed.to_string());
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("⏱  {}", format_duration(elapsed))).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("harforest run complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, threshold_info: Option<&str>) {
    if let Some(info) = threshold_info {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

/// Render a duration as `1.23s` or `2m 05s`
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let whole = elapsed.as_secs();
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

/// Keep the tail of `s` when it is longer than `max_len` characters
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
    }
}
