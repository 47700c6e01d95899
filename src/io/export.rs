//! Delimited-text exports.
//!
//! Every file is rendered in memory first and then published with
//! `write_atomic`, so a failed stage never leaves a half-written file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{Indicator, Metrics, Observation};
use crate::error::AppError;
use crate::report::{IndicatorSummary, Prediction, RegressionTable};

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    let result = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(AppError::io(path, e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the cleaned country-year table.
pub fn write_cleaned_csv(path: &Path, rows: &[Observation]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["country_name", "country_code", "year"];
    header.extend(Indicator::ALL.iter().map(|i| i.field_name()));
    w.write_record(&header).map_err(|e| AppError::csv(path, e))?;

    for obs in rows {
        let mut record = vec![obs.country_name.clone(), obs.country_code.clone(), obs.year.to_string()];
        record.extend(Indicator::ALL.iter().map(|i| fmt_opt(obs.get(*i))));
        w.write_record(&record).map_err(|e| AppError::csv(path, e))?;
    }

    finish(path, w)
}

/// Write the side-by-side regression table.
pub fn write_regression_csv(path: &Path, table: &RegressionTable) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["term".to_string()];
    header.extend(table.columns.iter().map(|k| k.slug().to_string()));
    w.write_record(&header).map_err(|e| AppError::csv(path, e))?;

    for row in &table.rows {
        let mut record = vec![row.term.clone()];
        record.extend(row.cells.iter().cloned());
        w.write_record(&record).map_err(|e| AppError::csv(path, e))?;
    }

    finish(path, w)
}

/// Write one model's held-out metrics as `metric,value` rows.
pub fn write_metrics_csv(path: &Path, metrics: &Metrics) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    let rows = [
        ("rmse", format!("{:.10}", metrics.rmse)),
        ("r_squared", format!("{:.10}", metrics.r_squared)),
        ("mae", format!("{:.10}", metrics.mae)),
        ("n_test", metrics.n.to_string()),
    ];

    w.write_record(["metric", "value"]).map_err(|e| AppError::csv(path, e))?;
    for (name, value) in rows {
        w.write_record([name, value.as_str()]).map_err(|e| AppError::csv(path, e))?;
    }

    finish(path, w)
}

/// Write `(actual, predicted)` pairs, one row per test observation.
pub fn write_predictions_csv(path: &Path, predictions: &[Prediction]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["country_code", "year", "actual", "predicted"])
        .map_err(|e| AppError::csv(path, e))?;

    for p in predictions {
        w.write_record([
            p.country_code.clone(),
            p.year.to_string(),
            format!("{:.10}", p.actual),
            format!("{:.10}", p.predicted),
        ])
        .map_err(|e| AppError::csv(path, e))?;
    }

    finish(path, w)
}

/// Write the descriptive summary of the trimmed dataset.
pub fn write_summary_csv(path: &Path, summaries: &[IndicatorSummary]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "indicator", "n", "missing", "mean", "sd", "min", "median", "max", "cor_gdp_growth",
    ])
    .map_err(|e| AppError::csv(path, e))?;

    for s in summaries {
        w.write_record([
            s.indicator.field_name().to_string(),
            s.n.to_string(),
            s.missing.to_string(),
            fmt_opt(s.mean),
            fmt_opt(s.sd),
            fmt_opt(s.min),
            fmt_opt(s.median),
            fmt_opt(s.max),
            fmt_opt(s.cor_target),
        ])
        .map_err(|e| AppError::csv(path, e))?;
    }

    finish(path, w)
}

fn finish(path: &Path, w: csv::Writer<Vec<u8>>) -> Result<(), AppError> {
    let bytes = w
        .into_inner()
        .map_err(|e| AppError::io(path, e.into_error()))?;
    write_atomic(path, &bytes)
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}
