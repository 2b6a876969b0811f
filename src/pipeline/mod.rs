//! Pipeline module - the stages from raw tables to an evaluated forest

pub mod config;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod forest;
pub mod frame;
pub mod loader;
pub mod metrics;
pub mod missing;
pub mod recipe;
pub mod runner;
pub mod schema;
pub mod scoring;
pub mod search;
pub mod split;
pub mod variance;

pub use config::*;
pub use correlation::*;
pub use dataset::*;
pub use error::{PipelineError, Result};
pub use evaluate::*;
pub use forest::{ForestParams, RandomForest};
pub use loader::*;
pub use metrics::*;
pub use missing::*;
pub use recipe::*;
pub use runner::*;
pub use schema::*;
pub use scoring::*;
pub use search::*;
pub use split::*;
pub use variance::*;
