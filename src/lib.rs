//! harforest: activity-recognition modelling pipeline
//!
//! Loads the weight-lifting sensor tables, filters and types their columns,
//! fits a feature-preparation recipe, tunes a random forest by
//! cross-validated grid search and evaluates it on a held-out split.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
