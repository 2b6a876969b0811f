//! Stratified train/validation split and stratified k-fold assignment
//!
//! All randomness comes from an explicit seed; classes are visited in
//! sorted order so the result never depends on hash iteration order.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::error::{PipelineError, Result};

/// Row indices of a two-way partition, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// One cross-validation fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn group_by_class(labels: &[usize], rows: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &row in rows {
        groups.entry(labels[row]).or_default().push(row);
    }
    groups
}

/// Split all rows so each class contributes `round(n_class * train_fraction)`
/// rows to the training side.
pub fn stratified_split(labels: &[usize], train_fraction: f64, seed: u64) -> Partition {
    let rows: Vec<usize> = (0..labels.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (_, mut members) in group_by_class(labels, &rows) {
        members.shuffle(&mut rng);
        let n_train = ((members.len() as f64 * train_fraction).round() as usize).min(members.len());
        train.extend_from_slice(&members[..n_train]);
        test.extend_from_slice(&members[n_train..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Partition { train, test }
}

/// Assign `rows` to `k` folds, dealing each shuffled class round-robin.
///
/// The deal continues where the previous class stopped, so fold sizes
/// differ by at most one overall as well as per class.
pub fn stratified_folds(labels: &[usize], rows: &[usize], k: usize, seed: u64) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(PipelineError::InvalidConfig(format!(
            "folds must be at least 2, got {}",
            k
        )));
    }
    if rows.len() < k {
        return Err(PipelineError::InvalidConfig(format!(
            "cannot build {} folds from {} rows",
            k,
            rows.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut offset = 0usize;

    for (_, mut members) in group_by_class(labels, rows) {
        members.shuffle(&mut rng);
        let n = members.len();
        for (i, row) in members.into_iter().enumerate() {
            buckets[(offset + i) % k].push(row);
        }
        offset = (offset + n) % k;
    }

    let folds = (0..k)
        .map(|index| {
            let mut test = buckets[index].clone();
            test.sort_unstable();
            let mut train: Vec<usize> = buckets
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .flat_map(|(_, b)| b.iter().copied())
                .collect();
            train.sort_unstable();
            Fold { index, train, test }
        })
        .collect();

    Ok(folds)
}

/// Share of each class among `rows`
pub fn class_fractions(labels: &[usize], rows: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &row in rows {
        counts[labels[row]] += 1;
    }
    let total = rows.len().max(1) as f64;
    counts.into_iter().map(|c| c as f64 / total).collect()
}
