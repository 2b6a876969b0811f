//! Classification metrics: accuracy, one-vs-rest ROC/AUC, confusion matrix

use serde::Serialize;

/// A class for which a one-vs-rest ranking metric is undefined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegenerateClass {
    pub class: usize,
    pub positives: usize,
    pub negatives: usize,
}

/// Fraction of predictions equal to the truth
pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    correct as f64 / truth.len() as f64
}

/// Binary AUC by the rank-sum statistic; tied scores share their mean rank.
///
/// Returns None when either side is empty.
pub fn binary_auc(scores: &[f64], positive: &[bool]) -> Option<f64> {
    let n_pos = positive.iter().filter(|&&p| p).count();
    let n_neg = positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares the mean rank
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += mean_rank * order[i..=j].iter().filter(|&&k| positive[k]).count() as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// One-vs-rest AUC for each class, from per-row class probabilities
pub fn one_vs_rest_auc(probs: &[Vec<f64>], truth: &[usize], n_classes: usize) -> Vec<Option<f64>> {
    (0..n_classes)
        .map(|class| {
            let scores: Vec<f64> = probs.iter().map(|p| p[class]).collect();
            let positive: Vec<bool> = truth.iter().map(|&t| t == class).collect();
            binary_auc(&scores, &positive)
        })
        .collect()
}

/// Mean of the one-vs-rest AUCs over all classes.
///
/// Fails on the first class with no positives or no negatives, since
/// skipping it would bias the average.
pub fn macro_auc(
    probs: &[Vec<f64>],
    truth: &[usize],
    n_classes: usize,
) -> std::result::Result<f64, DegenerateClass> {
    let per_class = one_vs_rest_auc(probs, truth, n_classes);
    let mut total = 0.0;
    for (class, auc) in per_class.into_iter().enumerate() {
        match auc {
            Some(v) => total += v,
            None => {
                let positives = truth.iter().filter(|&&t| t == class).count();
                return Err(DegenerateClass {
                    class,
                    positives,
                    negatives: truth.len() - positives,
                });
            }
        }
    }
    Ok(total / n_classes.max(1) as f64)
}

/// One point of a ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Rows scoring at or above this are predicted positive
    pub threshold: f64,
}

/// ROC curve points from the strictest threshold down, starting at (0, 0)
pub fn roc_curve(scores: &[f64], positive: &[bool]) -> Vec<RocPoint> {
    let n_pos = positive.iter().filter(|&&p| p).count().max(1) as f64;
    let n_neg = positive.iter().filter(|&&p| !p).count().max(1) as f64;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if positive[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            fpr: fp as f64 / n_neg,
            tpr: tp as f64 / n_pos,
            threshold,
        });
    }
    points
}

/// Square table of counts, rows = predicted class, columns = true class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(predicted: &[usize], truth: &[usize], classes: &[String]) -> Self {
        let k = classes.len();
        let mut counts = vec![vec![0usize; k]; k];
        for (&p, &t) in predicted.iter().zip(truth) {
            counts[p][t] += 1;
        }
        Self {
            classes: classes.to_vec(),
            counts,
        }
    }

    /// Row sums: how often each class was predicted
    pub fn predicted_counts(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Column sums: how often each class actually occurred
    pub fn true_counts(&self) -> Vec<usize> {
        (0..self.classes.len())
            .map(|t| self.counts.iter().map(|row| row[t]).sum())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.classes.len()).map(|i| self.counts[i][i]).sum()
    }
}
