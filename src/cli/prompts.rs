//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask before the grid search, which is the expensive stage
pub fn confirm_search(combinations: usize, folds: usize, trees: usize) -> Result<bool> {
    let message = format!(
        "Run the grid search ({} combination(s) x {} fold(s) = {} forests of {} trees)?",
        combinations,
        folds,
        combinations * folds,
        trees
    );
    confirm_step(&message)
}
