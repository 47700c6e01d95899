//! Stage implementations shared by the CLI subcommands.
//!
//! Each stage reads its declared input artifact from disk and writes its own
//! outputs, so any stage can be re-run on its own:
//!
//! clean: raw CSV -> cleaned.csv
//! describe: cleaned.csv -> summary.csv
//! fit: cleaned.csv -> trimmed -> split -> model_*.json + regression_results.csv
//! evaluate: cleaned.csv -> same split + model_*.json -> metrics_*.csv + predictions_*.csv

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::data::{CleanOutput, Split, SplitSpec, clean_panel, load_trimmed, model_ready, stratified_split};
use crate::domain::{Metrics, ModelKind, PipelineConfig, SplitSignature};
use crate::error::AppError;
use crate::fit::{FitSuite, fit_all};
use crate::io::{
    ModelArtifact, load_raw_panel, read_artifact, write_artifact, write_cleaned_csv, write_metrics_csv,
    write_predictions_csv, write_regression_csv, write_summary_csv,
};
use crate::report::{IndicatorSummary, describe, evaluate, regression_table};

/// Outputs of the fit stage.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub signature: SplitSignature,
    pub n_train: usize,
    pub suite: FitSuite,
}

/// Outputs of a full `run`: every stage in order.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub clean: CleanOutput,
    pub summaries: Vec<IndicatorSummary>,
    pub fit: FitRun,
    /// Held-out metrics of the models that fit; empty when none did.
    pub evaluation: Vec<(ModelKind, Metrics)>,
}

/// Stage 1: reshape and clean the raw panel.
pub fn run_clean(config: &PipelineConfig) -> Result<CleanOutput, AppError> {
    info!("Reading raw panel '{}'", config.input_path.display());
    let panel = load_raw_panel(&config.input_path)?;
    for err in &panel.row_errors {
        warn!("line {}: {}", err.line, err.message);
    }

    let output = clean_panel(&panel)?;
    write_cleaned_csv(&config.cleaned_path(), &output.observations)?;
    info!(
        "Wrote {} cleaned country-years to '{}'",
        output.observations.len(),
        config.cleaned_path().display()
    );
    Ok(output)
}

/// Stage 2: descriptive statistics of the trimmed view.
pub fn run_describe(config: &PipelineConfig) -> Result<Vec<IndicatorSummary>, AppError> {
    let trimmed = load_trimmed(&config.cleaned_path())?;
    if trimmed.is_empty() {
        return Err(AppError::Data("No observations remain after trimming.".to_string()));
    }
    let summaries = describe(&trimmed);
    write_summary_csv(&config.summary_path(), &summaries)?;
    Ok(summaries)
}

/// Re-derive the train/test split from the cleaned artifact.
pub fn derive_split(config: &PipelineConfig) -> Result<Split, AppError> {
    let trimmed = load_trimmed(&config.cleaned_path())?;
    let rows = model_ready(&trimmed);
    info!(
        "Model-ready rows: {} of {} trimmed (complete cases only)",
        rows.len(),
        trimmed.len()
    );
    stratified_split(
        &rows,
        SplitSpec {
            seed: config.seed,
            train_fraction: config.train_fraction,
            strata: config.strata,
        },
    )
}

/// Stage 3: fit every model on the training partition and persist artifacts.
///
/// Models that fail are reported in `FitRun::suite.failures`. Their artifacts
/// and evaluation outputs from earlier runs are removed, so the output
/// directory never mixes results from two datasets.
pub fn run_fit(config: &PipelineConfig) -> Result<FitRun, AppError> {
    let split = derive_split(config)?;
    info!(
        "Split: {} train / {} test (seed {})",
        split.train.len(),
        split.test.len(),
        config.seed
    );

    let suite = fit_all(&split.train, &config.forest);

    for kind in ModelKind::ALL {
        let path = config.artifact_path(kind);
        match suite.get(kind) {
            Some(model) => {
                write_artifact(&path, &ModelArtifact::new(model.clone(), split.signature.clone()))?;
                info!("Wrote {} artifact '{}'", kind.display_name(), path.display());
            }
            None => remove_outputs_of(config, kind)?,
        }
    }

    let linear: Vec<_> = suite.fits.iter().filter_map(|m| m.as_linear()).collect();
    if linear.is_empty() {
        remove_stale(&config.regression_path())?;
    } else {
        write_regression_csv(&config.regression_path(), &regression_table(&linear))?;
    }

    Ok(FitRun {
        signature: split.signature,
        n_train: split.train.len(),
        suite,
    })
}

/// Stage 4: score every available model artifact on the re-derived test partition.
pub fn run_evaluate(config: &PipelineConfig) -> Result<Vec<(ModelKind, Metrics)>, AppError> {
    let split = derive_split(config)?;
    let mut results = Vec::new();

    for kind in ModelKind::ALL {
        let path = config.artifact_path(kind);
        if !path.exists() {
            warn!("No {} artifact at '{}'; skipping", kind.display_name(), path.display());
            remove_stale(&config.metrics_path(kind))?;
            remove_stale(&config.predictions_path(kind))?;
            continue;
        }

        let artifact = read_artifact(&path)?;
        check_alignment(kind, &artifact.split, &split.signature)?;

        let (predictions, metrics) = evaluate(&artifact.model, &split.test)?;
        write_predictions_csv(&config.predictions_path(kind), &predictions)?;
        write_metrics_csv(&config.metrics_path(kind), &metrics)?;
        info!(
            "{}: RMSE={:.4} R2={:.4} on {} test rows",
            kind.display_name(),
            metrics.rmse,
            metrics.r_squared,
            metrics.n
        );
        results.push((kind, metrics));
    }

    if results.is_empty() {
        return Err(AppError::Config(format!(
            "No model artifacts found in '{}'; run the fit stage first.",
            config.out_dir.display()
        )));
    }
    Ok(results)
}

/// Run every stage in order.
///
/// Models that fit are evaluated even when others failed; the caller decides
/// how to report `fit.suite.failures`. Fails outright only when no model fit.
pub fn run_all(config: &PipelineConfig) -> Result<PipelineRun, AppError> {
    let clean = run_clean(config)?;
    let summaries = run_describe(config)?;
    let fit = run_fit(config)?;
    if fit.suite.fits.is_empty() {
        return Err(AppError::Fit(fit.suite.failures));
    }
    let evaluation = run_evaluate(config)?;

    Ok(PipelineRun {
        clean,
        summaries,
        fit,
        evaluation,
    })
}

/// Remove the artifact and evaluation outputs of a model that did not fit.
fn remove_outputs_of(config: &PipelineConfig, kind: ModelKind) -> Result<(), AppError> {
    remove_stale(&config.artifact_path(kind))?;
    remove_stale(&config.metrics_path(kind))?;
    remove_stale(&config.predictions_path(kind))
}

fn remove_stale(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| AppError::io(path, e))?;
        warn!("Removed stale output '{}'", path.display());
    }
    Ok(())
}

/// Fail unless the artifact was trained against exactly this partition.
pub fn check_alignment(kind: ModelKind, trained: &SplitSignature, current: &SplitSignature) -> Result<(), AppError> {
    if trained == current {
        return Ok(());
    }

    let reason = if trained.seed != current.seed {
        format!("trained with seed {}, evaluating with seed {}", trained.seed, current.seed)
    } else if trained.train_fraction_ppm != current.train_fraction_ppm || trained.strata != current.strata {
        "train fraction or strata differ from training time".to_string()
    } else if trained.n_total != current.n_total {
        format!(
            "model-ready dataset had {} rows at training time, now {}",
            trained.n_total, current.n_total
        )
    } else {
        "test partition membership differs from training time".to_string()
    };
    Err(AppError::Misalignment { model: kind, reason })
}
