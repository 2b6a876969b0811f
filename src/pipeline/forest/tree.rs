//! Classification tree grown on a subset of rows of a shared feature matrix

use faer::Mat;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease for a split to count as an improvement
const MIN_DECREASE: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the class distribution of its training rows
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node; rows with `value <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        /// Count-weighted Gini decrease achieved by this split
        decrease: f64,
    },
}

/// Growth limits of a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Features sampled as split candidates at each node
    pub mtry: usize,
    /// Minimum rows on each side of a split
    pub min_leaf: usize,
    pub max_depth: Option<usize>,
}

/// Gini impurity of a class histogram
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    decrease: f64,
}

struct Builder<'a> {
    x: &'a Mat<f64>,
    y: &'a [usize],
    n_classes: usize,
    params: TreeParams,
    rng: &'a mut ChaCha8Rng,
    importances: &'a mut [f64],
}

impl Builder<'_> {
    fn histogram(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    fn leaf(counts: &[usize], n: usize) -> TreeNode {
        let distribution = counts
            .iter()
            .map(|&c| if n == 0 { 0.0 } else { c as f64 / n as f64 })
            .collect();
        TreeNode::Leaf {
            distribution,
            n_samples: n,
        }
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> TreeNode {
        let n = rows.len();
        let counts = self.histogram(&rows);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_small = n < 2 * self.params.min_leaf.max(1);
        let too_deep = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || too_small || too_deep {
            return Self::leaf(&counts, n);
        }

        let best = match self.find_best_split(&rows, &counts) {
            Some(best) => best,
            None => return Self::leaf(&counts, n),
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x[(r, best.feature_idx)] <= best.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return Self::leaf(&counts, n);
        }

        self.importances[best.feature_idx] += best.decrease;

        let left = Box::new(self.build(left_rows, depth + 1));
        let right = Box::new(self.build(right_rows, depth + 1));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples: n,
            decrease: best.decrease,
        }
    }

    /// Best split over `mtry` randomly sampled features, sweeping each
    /// feature's sorted values once.
    fn find_best_split(&mut self, rows: &[usize], counts: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        let n_features = self.x.ncols();
        let mtry = self.params.mtry.clamp(1, n_features.max(1));
        let min_leaf = self.params.min_leaf.max(1);
        let parent = n as f64 * gini(counts, n);

        let mut best: Option<BestSplit> = None;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature_idx in sample(&mut *self.rng, n_features, mtry).into_iter() {
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x[(r, feature_idx)], self.y[r])));
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();

            for i in 0..n - 1 {
                let (value, label) = pairs[i];
                left[label] += 1;
                right[label] -= 1;

                let n_left = i + 1;
                let n_right = n - n_left;
                let next = pairs[i + 1].0;
                if n_left < min_leaf || n_right < min_leaf || value >= next {
                    continue;
                }

                let decrease = parent
                    - n_left as f64 * gini(&left, n_left)
                    - n_right as f64 * gini(&right, n_right);
                if decrease > MIN_DECREASE && best.as_ref().map_or(true, |b| decrease > b.decrease)
                {
                    let mid = value + (next - value) / 2.0;
                    best = Some(BestSplit {
                        feature_idx,
                        // Adjacent floats can round the midpoint up to `next`
                        threshold: if mid < next { mid } else { value },
                        decrease,
                    });
                }
            }
        }

        best
    }
}

/// A fitted classification tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationTree {
    root: TreeNode,
    n_classes: usize,
}

impl ClassificationTree {
    /// Grow a tree on `rows` of `x` (duplicates allowed, as in a bootstrap
    /// sample). Count-weighted Gini decreases are added to `importances`.
    pub fn fit(
        x: &Mat<f64>,
        y: &[usize],
        n_classes: usize,
        rows: Vec<usize>,
        params: TreeParams,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> Self {
        let mut builder = Builder {
            x,
            y,
            n_classes,
            params,
            rng,
            importances,
        };
        let root = builder.build(rows, 0);
        Self { root, n_classes }
    }

    /// Class distribution of the leaf `row` of `x` falls into
    pub fn predict_proba_row(&self, x: &Mat<f64>, row: usize) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { distribution, .. } => return distribution,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if x[(row, *feature_idx)] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        node_depth(&self.root)
    }

    /// Get number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }
}
