//! Report module - run summary tables and the persisted bundle

pub mod bundle;
pub mod summary;

pub use bundle::*;
pub use summary::*;
