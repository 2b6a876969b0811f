//! Final fit on the training partition and one-shot validation evaluation

use serde::Serialize;

use super::dataset::Dataset;
use super::error::Result;
use super::forest::{ForestParams, RandomForest};
use super::metrics::{accuracy, one_vs_rest_auc, roc_curve, ConfusionMatrix, RocPoint};

/// AUC of one class against the rest
#[derive(Debug, Clone, Serialize)]
pub struct ClassAuc {
    pub class: String,
    /// None when the validation rows hold no (or only) rows of this class
    pub auc: Option<f64>,
}

/// ROC curve of one class against the rest
#[derive(Debug, Clone, Serialize)]
pub struct ClassRoc {
    pub class: String,
    pub points: Vec<RocPoint>,
}

/// Impurity importance of one predictor
#[derive(Debug, Clone, Serialize)]
pub struct Importance {
    pub feature: String,
    /// Gini decrease summed over all trees
    pub importance: f64,
    /// Share of the total importance, in percent
    pub percent: f64,
}

/// Read-only evaluation artifacts for the validation partition
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub validation_rows: usize,
    pub accuracy: f64,
    /// Mean of the defined per-class AUCs
    pub macro_auc: f64,
    pub per_class_auc: Vec<ClassAuc>,
    pub roc: Vec<ClassRoc>,
    pub confusion: ConfusionMatrix,
    pub importances: Vec<Importance>,
}

/// Refit with the selected hyperparameters on every training row
pub fn fit_final(
    data: &Dataset,
    train_rows: &[usize],
    params: ForestParams,
    seed: u64,
) -> Result<RandomForest> {
    RandomForest::fit(data, train_rows, params, seed)
}

/// Importances largest first, with each one's share of the total
pub fn ranked_importances(forest: &RandomForest) -> Vec<Importance> {
    let ranked = forest.feature_importances();
    let total: f64 = ranked.iter().map(|(_, v)| v).sum();
    ranked
        .into_iter()
        .map(|(feature, importance)| Importance {
            percent: if total > 0.0 {
                importance / total * 100.0
            } else {
                0.0
            },
            feature,
            importance,
        })
        .collect()
}

/// Score `forest` once on the held-out `validation_rows` of `data`
pub fn evaluate(
    forest: &RandomForest,
    data: &Dataset,
    validation_rows: &[usize],
) -> Result<EvaluationReport> {
    let probs = forest.predict_proba(&data.features, validation_rows)?;
    let predicted: Vec<usize> = probs.iter().map(|p| super::forest::argmax(p)).collect();
    let truth: Vec<usize> = validation_rows.iter().map(|&r| data.labels[r]).collect();

    let per_class: Vec<ClassAuc> = one_vs_rest_auc(&probs, &truth, data.n_classes())
        .into_iter()
        .zip(&data.classes)
        .map(|(auc, class)| ClassAuc {
            class: class.clone(),
            auc,
        })
        .collect();
    let defined: Vec<f64> = per_class.iter().filter_map(|c| c.auc).collect();
    let macro_auc = if defined.is_empty() {
        0.0
    } else {
        defined.iter().sum::<f64>() / defined.len() as f64
    };

    let roc = data
        .classes
        .iter()
        .enumerate()
        .map(|(k, class)| {
            let scores: Vec<f64> = probs.iter().map(|p| p[k]).collect();
            let positive: Vec<bool> = truth.iter().map(|&t| t == k).collect();
            ClassRoc {
                class: class.clone(),
                points: roc_curve(&scores, &positive),
            }
        })
        .collect();

    Ok(EvaluationReport {
        validation_rows: validation_rows.len(),
        accuracy: accuracy(&predicted, &truth),
        macro_auc,
        per_class_auc: per_class,
        roc,
        confusion: ConfusionMatrix::new(&predicted, &truth, &data.classes),
        importances: ranked_importances(forest),
    })
}
