//! Random forest classifier

use faer::Mat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{ClassificationTree, TreeParams};
use crate::pipeline::dataset::Dataset;
use crate::pipeline::error::{PipelineError, Result};

/// Hyperparameters of a forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub trees: usize,
    /// Features sampled as split candidates at each node
    pub mtry: usize,
    /// Minimum rows on each side of a split
    pub min_leaf: usize,
}

/// A fitted random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    pub seed: u64,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    trees: Vec<ClassificationTree>,
    /// Count-weighted Gini decrease per feature, summed over all trees
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on `rows` of `data`.
    ///
    /// Tree `i` draws its bootstrap sample and its split candidates from a
    /// generator seeded with `seed + i`, so the forest is reproducible
    /// regardless of how rayon schedules the trees.
    pub fn fit(data: &Dataset, rows: &[usize], params: ForestParams, seed: u64) -> Result<Self> {
        let n_features = data.features.ncols();
        let n_classes = data.n_classes();

        if rows.is_empty() {
            return Err(PipelineError::Model("cannot fit a forest on zero rows".to_string()));
        }
        if n_features == 0 {
            return Err(PipelineError::Model("cannot fit a forest without predictors".to_string()));
        }
        if params.trees == 0 || params.mtry == 0 || params.min_leaf == 0 {
            return Err(PipelineError::Model(format!(
                "trees, mtry and min_leaf must be positive, got {:?}",
                params
            )));
        }

        let tree_params = TreeParams {
            mtry: params.mtry.min(n_features),
            min_leaf: params.min_leaf,
            max_depth: None,
        };

        let fitted: Vec<(ClassificationTree, Vec<f64>)> = (0..params.trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let bootstrap: Vec<usize> = (0..rows.len())
                    .map(|_| rows[rng.gen_range(0..rows.len())])
                    .collect();
                let mut importances = vec![0.0; n_features];
                let tree = ClassificationTree::fit(
                    &data.features,
                    &data.labels,
                    n_classes,
                    bootstrap,
                    tree_params,
                    &mut rng,
                    &mut importances,
                );
                (tree, importances)
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, tree_importances) in fitted {
            for (total, v) in importances.iter_mut().zip(tree_importances) {
                *total += v;
            }
            trees.push(tree);
        }

        Ok(Self {
            params,
            seed,
            feature_names: data.feature_names.clone(),
            classes: data.classes.clone(),
            trees,
            importances,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Class probabilities (leaf distributions averaged over trees) for each
    /// of `rows` of `x`
    pub fn predict_proba(&self, x: &Mat<f64>, rows: &[usize]) -> Result<Vec<Vec<f64>>> {
        if x.ncols() != self.feature_names.len() {
            return Err(PipelineError::Model(format!(
                "expected {} feature columns, got {}",
                self.feature_names.len(),
                x.ncols()
            )));
        }
        if let Some(&bad) = rows.iter().find(|&&r| r >= x.nrows()) {
            return Err(PipelineError::Model(format!(
                "row {} is out of range for {} rows",
                bad,
                x.nrows()
            )));
        }

        let n_classes = self.classes.len();
        let n_trees = self.trees.len().max(1) as f64;
        Ok(rows
            .par_iter()
            .map(|&row| {
                let mut probs = vec![0.0; n_classes];
                for tree in &self.trees {
                    for (p, v) in probs.iter_mut().zip(tree.predict_proba_row(x, row)) {
                        *p += v;
                    }
                }
                probs.iter_mut().for_each(|p| *p /= n_trees);
                probs
            })
            .collect())
    }

    /// Most probable class index per row; ties go to the lower index
    pub fn predict(&self, x: &Mat<f64>, rows: &[usize]) -> Result<Vec<usize>> {
        Ok(self
            .predict_proba(x, rows)?
            .iter()
            .map(|p| argmax(p))
            .collect())
    }

    /// Importances summed over trees, paired with feature names, largest first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_dataset() -> Dataset {
        // Class is decided by column 0; column 1 is noise
        let n = 60;
        let features = Mat::<f64>::from_fn(n, 2, |i, j| {
            if j == 0 {
                (i % 3) as f64 * 10.0 + (i as f64 * 0.01)
            } else {
                ((i * 7919) % 13) as f64
            }
        });
        let labels: Vec<usize> = (0..n).map(|i| i % 3).collect();
        Dataset {
            features,
            feature_names: vec!["signal".to_string(), "noise".to_string()],
            labels,
            classes: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        }
    }

    fn params() -> ForestParams {
        ForestParams {
            trees: 25,
            mtry: 1,
            min_leaf: 1,
        }
    }

    #[test]
    fn test_forest_learns_signal() {
        let data = toy_dataset();
        let rows: Vec<usize> = (0..data.n_rows()).collect();
        let forest = RandomForest::fit(&data, &rows, params(), 9).unwrap();
        assert_eq!(forest.n_trees(), 25);

        let predictions = forest.predict(&data.features, &rows).unwrap();
        let correct = predictions
            .iter()
            .zip(&data.labels)
            .filter(|(p, y)| p == y)
            .count();
        assert!(correct >= 55, "only {} of 60 correct", correct);

        let ranked = forest.feature_importances();
        assert_eq!(ranked[0].0, "signal");
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let data = toy_dataset();
        let rows: Vec<usize> = (0..data.n_rows()).collect();
        let forest = RandomForest::fit(&data, &rows, params(), 3).unwrap();
        for p in forest.predict_proba(&data.features, &rows).unwrap() {
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let data = toy_dataset();
        let rows: Vec<usize> = (0..40).collect();
        let test: Vec<usize> = (40..60).collect();
        let a = RandomForest::fit(&data, &rows, params(), 5).unwrap();
        let b = RandomForest::fit(&data, &rows, params(), 5).unwrap();
        assert_eq!(
            a.predict_proba(&data.features, &test).unwrap(),
            b.predict_proba(&data.features, &test).unwrap()
        );
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_rejects_bad_input() {
        let data = toy_dataset();
        assert!(RandomForest::fit(&data, &[], params(), 1).is_err());

        let rows: Vec<usize> = (0..data.n_rows()).collect();
        let forest = RandomForest::fit(&data, &rows, params(), 1).unwrap();
        let wrong = Mat::<f64>::zeros(3, 5);
        assert!(forest.predict_proba(&wrong, &[0]).is_err());
        assert!(forest.predict_proba(&data.features, &[1000]).is_err());
    }

    #[test]
    fn test_argmax_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5]), 0);
    }
}
