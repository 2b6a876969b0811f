//! Progress bar helpers using indicatif

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a progress bar with a success message
pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

/// Finish a progress bar with a warning message
pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}

/// Progress bar over the grid-search model fits
pub fn create_search_bar(fits: usize) -> ProgressBar {
    let pb = ProgressBar::new(fits as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   Fitting forests [{bar:40.green/blue}] {pos}/{len} fits ({percent}%) [{elapsed_precise} < {eta}]")
            .unwrap()
            .progress_chars("█▓▒░"),
    );
    pb
}
