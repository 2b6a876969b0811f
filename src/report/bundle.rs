//! Run report and model bundle persistence
//!
//! A bundle is a zip archive holding three JSON documents:
//! `report.json` (what happened during the run), `recipe.json` (the fitted
//! feature-preparation recipe) and `model.json` (the fitted forest). The
//! `predict` subcommand needs only the last two.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::pipeline::{
    CoercionReport, EvaluationReport, PipelineConfig, RandomForest, Recipe, SearchResult,
    RECIPE_FORMAT_VERSION,
};
use crate::report::PipelineSummary;

/// Version of the bundle layout
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

const REPORT_ENTRY: &str = "report.json";
const RECIPE_ENTRY: &str = "recipe.json";
const MODEL_ENTRY: &str = "model.json";

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub harforest_version: String,
    pub format_version: u32,
    pub training_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions_file: Option<String>,
}

/// Populated fraction of one training column and the filter's verdict
#[derive(Debug, Clone, Serialize)]
pub struct ColumnEntry {
    pub name: String,
    pub populated_fraction: f64,
    pub retained: bool,
}

/// Wall time of one stage in milliseconds
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub ms: u64,
}

/// Selected hyperparameters and the forest they produced
#[derive(Debug, Clone, Serialize)]
pub struct ModelOverview {
    pub trees: usize,
    pub mtry: usize,
    pub min_leaf: usize,
    pub seed: u64,
    pub classes: Vec<String>,
}

/// Complete run report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub config: PipelineConfig,
    pub summary: PipelineSummary,
    pub timing: Vec<StageTiming>,
    pub columns: Vec<ColumnEntry>,
    pub coercion: CoercionReport,
    pub search: SearchResult,
    pub model: ModelOverview,
    pub evaluation: EvaluationReport,
}

/// Parameters for building a [`RunReport`]
pub struct ReportParams<'a> {
    pub training_file: &'a Path,
    pub scoring_file: Option<&'a Path>,
    pub predictions_file: Option<&'a Path>,
    pub config: &'a PipelineConfig,
    pub summary: &'a PipelineSummary,
    pub populated: &'a [(String, f64)],
    pub coercion: &'a CoercionReport,
    pub search: &'a SearchResult,
    pub forest: &'a RandomForest,
    pub evaluation: &'a EvaluationReport,
}

impl RunReport {
    pub fn new(params: ReportParams<'_>) -> Self {
        let threshold = params.config.missing_threshold;
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                harforest_version: env!("CARGO_PKG_VERSION").to_string(),
                format_version: BUNDLE_FORMAT_VERSION,
                training_file: params.training_file.display().to_string(),
                scoring_file: params.scoring_file.map(|p| p.display().to_string()),
                predictions_file: params.predictions_file.map(|p| p.display().to_string()),
            },
            config: params.config.clone(),
            summary: params.summary.clone(),
            timing: params
                .summary
                .timings
                .iter()
                .map(|(stage, elapsed)| StageTiming {
                    stage: stage.clone(),
                    ms: elapsed.as_millis() as u64,
                })
                .collect(),
            columns: params
                .populated
                .iter()
                .map(|(name, fraction)| ColumnEntry {
                    name: name.clone(),
                    populated_fraction: *fraction,
                    retained: *fraction > threshold,
                })
                .collect(),
            coercion: params.coercion.clone(),
            search: params.search.clone(),
            model: ModelOverview {
                trees: params.forest.n_trees(),
                mtry: params.forest.params.mtry,
                min_leaf: params.forest.params.min_leaf,
                seed: params.forest.seed,
                classes: params.forest.classes.clone(),
            },
            evaluation: params.evaluation.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    forest: RandomForest,
}

/// Write report, recipe and model into a zip bundle at `zip_path`
pub fn write_bundle(
    zip_path: &Path,
    report: &RunReport,
    recipe: &Recipe,
    forest: &RandomForest,
) -> Result<()> {
    let zip_file = File::create(zip_path)
        .with_context(|| format!("Failed to create bundle: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let model = ModelFile {
        format_version: BUNDLE_FORMAT_VERSION,
        forest: forest.clone(),
    };
    let entries: [(&str, Vec<u8>); 3] = [
        (REPORT_ENTRY, serde_json::to_vec_pretty(report)?),
        (RECIPE_ENTRY, serde_json::to_vec_pretty(recipe)?),
        (MODEL_ENTRY, serde_json::to_vec(&model)?),
    ];
    for (name, content) in entries {
        zip.start_file(name, options)
            .with_context(|| format!("Failed to add {} to bundle", name))?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize bundle")?;
    Ok(())
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str, zip_path: &Path) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("Bundle {} has no {}", zip_path.display(), name))?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// Read the recipe and forest back from a bundle
pub fn load_bundle(zip_path: &Path) -> Result<(Recipe, RandomForest)> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open bundle: {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Not a zip archive: {}", zip_path.display()))?;

    let recipe: Recipe = serde_json::from_str(&read_entry(&mut archive, RECIPE_ENTRY, zip_path)?)
        .context("Failed to parse recipe.json")?;
    let model: ModelFile = serde_json::from_str(&read_entry(&mut archive, MODEL_ENTRY, zip_path)?)
        .context("Failed to parse model.json")?;

    if model.format_version != BUNDLE_FORMAT_VERSION {
        bail!(
            "Unsupported model format version {} (expected {})",
            model.format_version,
            BUNDLE_FORMAT_VERSION
        );
    }
    if recipe.format_version != RECIPE_FORMAT_VERSION {
        bail!(
            "Unsupported recipe format version {} (expected {})",
            recipe.format_version,
            RECIPE_FORMAT_VERSION
        );
    }
    if recipe.predictors != model.forest.feature_names {
        bail!("Recipe predictors do not match the model's features");
    }
    Ok((recipe, model.forest))
}

/// Bundle path for a training file: `<dir>/<stem>_bundle.zip`
pub fn bundle_path(output_dir: &Path, training_file: &Path) -> std::path::PathBuf {
    output_dir.join(format!("{}_bundle.zip", file_stem(training_file)))
}

/// Predictions path for a scoring file: `<dir>/<stem>_predictions.csv`
pub fn predictions_path(output_dir: &Path, scoring_file: &Path) -> std::path::PathBuf {
    output_dir.join(format!("{}_predictions.csv", file_stem(scoring_file)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("harforest")
        .to_string()
}
