//! Random-forest classifier
//!
//! Trees are grown on bootstrap samples of a shared feature matrix (rows
//! are passed as index lists, so cross-validation folds never copy data).
//! Splits minimize Gini impurity over `mtry` randomly chosen features.

pub mod ensemble;
pub mod tree;

pub use ensemble::{argmax, ForestParams, RandomForest};
pub use tree::{ClassificationTree, TreeNode, TreeParams};
