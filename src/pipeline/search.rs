//! Cross-validated grid search over random-forest hyperparameters
//!
//! Every (fold, combination) pair is an independent job on the rayon pool.
//! Jobs only read the shared dataset and return their own score; the
//! scores are gathered into a `[combination][fold]` table after all jobs
//! finish, so the outcome does not depend on scheduling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;

use super::config::SearchConfig;
use super::dataset::Dataset;
use super::error::{PipelineError, Result};
use super::forest::{ForestParams, RandomForest};
use super::metrics::macro_auc;
use super::split::{stratified_folds, Fold};

/// One grid point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Combination {
    pub mtry: usize,
    pub min_leaf: usize,
}

/// Cross-validated score of one grid point
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub combination: Combination,
    /// Held-out macro AUC per fold, in fold order
    pub fold_scores: Vec<f64>,
    pub mean_auc: f64,
    pub std_err: f64,
}

/// Outcome of the grid search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// All candidates in grid order
    pub candidates: Vec<CandidateScore>,
    /// Index into `candidates` of the selected combination
    pub best: usize,
    pub folds: usize,
    pub trees: usize,
}

impl SearchResult {
    pub fn best_candidate(&self) -> &CandidateScore {
        &self.candidates[self.best]
    }

    pub fn best_params(&self) -> ForestParams {
        let c = self.best_candidate().combination;
        ForestParams {
            trees: self.trees,
            mtry: c.mtry,
            min_leaf: c.min_leaf,
        }
    }

    /// Candidates sorted by mean AUC, best first (grid order among equals)
    pub fn leaderboard(&self) -> Vec<&CandidateScore> {
        let mut ranked: Vec<&CandidateScore> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| {
            b.mean_auc
                .partial_cmp(&a.mean_auc)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}

/// `levels` evenly spaced integers over `[lo, hi]`, rounded, duplicates removed
fn axis(lo: usize, hi: usize, levels: usize) -> Vec<usize> {
    let mut values: Vec<usize> = Vec::with_capacity(levels);
    for i in 0..levels {
        let v = if levels == 1 {
            lo
        } else {
            let t = i as f64 / (levels - 1) as f64;
            (lo as f64 + t * (hi - lo) as f64).round() as usize
        };
        if !values.contains(&v) {
            values.push(v);
        }
    }
    values
}

/// Regular grid for `n_predictors` predictors; `mtry` varies slowest
pub fn build_grid(config: &SearchConfig, n_predictors: usize) -> Result<Vec<Combination>> {
    if n_predictors == 0 {
        return Err(PipelineError::Model(
            "no predictors left to search over".to_string(),
        ));
    }
    let mtry_hi = config.mtry_max.unwrap_or(n_predictors).min(n_predictors);
    let mtry_lo = config.mtry_min.min(mtry_hi).max(1);
    let leaf_lo = config.min_leaf_min.max(1);
    let leaf_hi = config.min_leaf_max.max(leaf_lo);

    let leaf_axis = axis(leaf_lo, leaf_hi, config.grid_levels);
    Ok(axis(mtry_lo, mtry_hi, config.grid_levels)
        .into_iter()
        .flat_map(|mtry| {
            leaf_axis
                .iter()
                .map(move |&min_leaf| Combination { mtry, min_leaf })
        })
        .collect())
}

/// Forest seed of every job on `fold`
pub fn fold_seed(seed: u64, fold: usize) -> u64 {
    // Keeps tree seeds (fold seed + tree index) of different folds apart
    seed.wrapping_add((fold as u64 + 1) * 100_000)
}

/// Index of the highest score; the first one wins ties
pub fn select_best(means: &[f64]) -> usize {
    let mut best = 0;
    for (i, &m) in means.iter().enumerate() {
        if m > means[best] {
            best = i;
        }
    }
    best
}

fn mean_and_std_err(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, (var / n as f64).sqrt())
}

/// Fail when a held-out fold lacks positives or negatives for some class
fn check_folds(data: &Dataset, folds: &[Fold]) -> Result<()> {
    for fold in folds {
        for (class, name) in data.classes.iter().enumerate() {
            let positives = fold.test.iter().filter(|&&r| data.labels[r] == class).count();
            let negatives = fold.test.len() - positives;
            if positives == 0 || negatives == 0 {
                return Err(PipelineError::DegenerateFold {
                    fold: fold.index + 1,
                    class: name.clone(),
                    positives,
                    negatives,
                });
            }
        }
    }
    Ok(())
}

/// Grid search on `rows` of `data`.
///
/// `progress`, when given, is advanced once per finished job.
pub fn grid_search(
    data: &Dataset,
    rows: &[usize],
    config: &SearchConfig,
    seed: u64,
    progress: Option<&ProgressBar>,
) -> Result<SearchResult> {
    let grid = build_grid(config, data.features.ncols())?;
    let folds = stratified_folds(&data.labels, rows, config.folds, seed)?;
    check_folds(data, &folds)?;

    let jobs: Vec<(usize, usize)> = (0..grid.len())
        .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
        .collect();
    let total = jobs.len();
    let completed = AtomicUsize::new(0);
    let started = Instant::now();
    let deadline = config.timeout();

    let scores: Vec<f64> = jobs
        .par_iter()
        .map(|&(c, f)| {
            if let Some(limit) = deadline {
                if started.elapsed() >= limit {
                    return Err(PipelineError::DeadlineExceeded {
                        limit_secs: limit.as_secs(),
                        completed: completed.load(Ordering::Relaxed),
                        total,
                    });
                }
            }

            let fold = &folds[f];
            let params = ForestParams {
                trees: config.trees,
                mtry: grid[c].mtry,
                min_leaf: grid[c].min_leaf,
            };
            let forest = RandomForest::fit(data, &fold.train, params, fold_seed(seed, f))?;
            let probs = forest.predict_proba(&data.features, &fold.test)?;
            let truth: Vec<usize> = fold.test.iter().map(|&r| data.labels[r]).collect();
            let score = macro_auc(&probs, &truth, data.n_classes()).map_err(|d| {
                PipelineError::DegenerateFold {
                    fold: f + 1,
                    class: data.classes[d.class].clone(),
                    positives: d.positives,
                    negatives: d.negatives,
                }
            })?;

            completed.fetch_add(1, Ordering::Relaxed);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            Ok(score)
        })
        .collect::<Result<Vec<f64>>>()?;

    // jobs are laid out combination-major, so each chunk is one combination
    let candidates: Vec<CandidateScore> = grid
        .iter()
        .zip(scores.chunks(folds.len()))
        .map(|(&combination, fold_scores)| {
            let (mean_auc, std_err) = mean_and_std_err(fold_scores);
            CandidateScore {
                combination,
                fold_scores: fold_scores.to_vec(),
                mean_auc,
                std_err,
            }
        })
        .collect();

    let means: Vec<f64> = candidates.iter().map(|c| c.mean_auc).collect();
    Ok(SearchResult {
        best: select_best(&means),
        candidates,
        folds: folds.len(),
        trees: config.trees,
    })
}

/// Number of forests `grid_search` will fit
pub fn planned_fits(config: &SearchConfig, n_predictors: usize) -> Result<usize> {
    Ok(build_grid(config, n_predictors)?.len() * config.folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_levels() {
        assert_eq!(axis(2, 40, 5), vec![2, 12, 21, 31, 40]);
        assert_eq!(axis(1, 3, 5), vec![1, 2, 3]);
        assert_eq!(axis(4, 9, 1), vec![4]);
    }

    #[test]
    fn test_grid_order_and_clipping() {
        let config = SearchConfig {
            mtry_max: Some(100),
            ..SearchConfig::default()
        };
        let grid = build_grid(&config, 9).unwrap();
        assert_eq!(grid.len(), 25);
        assert_eq!(grid[0], Combination { mtry: 1, min_leaf: 2 });
        assert_eq!(grid[1], Combination { mtry: 1, min_leaf: 12 });
        assert_eq!(grid[24], Combination { mtry: 9, min_leaf: 40 });
        assert!(grid.iter().all(|c| c.mtry <= 9));
    }

    #[test]
    fn test_select_best_first_wins() {
        assert_eq!(select_best(&[0.9, 0.95, 0.95, 0.7]), 1);
        assert_eq!(select_best(&[0.5]), 0);
    }

    #[test]
    fn test_std_err() {
        let (mean, se) = mean_and_std_err(&[1.0, 3.0]);
        assert_eq!(mean, 2.0);
        assert!((se - 1.0).abs() < 1e-12);
        assert_eq!(mean_and_std_err(&[0.8]), (0.8, 0.0));
    }

    #[test]
    fn test_fold_seeds_differ() {
        assert_ne!(fold_seed(1, 0), fold_seed(1, 1));
        assert_eq!(fold_seed(1, 2), fold_seed(1, 2));
    }
}
