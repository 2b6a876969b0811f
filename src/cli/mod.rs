//! CLI module - argument parsing, interactive prompts and the predict command

pub mod args;
pub mod predict;
pub mod prompts;

pub use args::{Cli, Commands};
pub use prompts::*;
