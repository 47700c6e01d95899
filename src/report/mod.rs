//! Reporting utilities: held-out predictions, metrics, regression tables and
//! descriptive summaries.

pub mod format;

pub use format::*;

use crate::domain::{Indicator, Metrics, ModelKind, ModelRow, Observation, TARGET};
use crate::error::AppError;
use crate::fit::{INTERCEPT, LinearFit};
use crate::math::{mae, mean, median, pearson, r_squared, rmse, std_dev};
use crate::models::FittedModel;

/// One held-out prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub country_code: String,
    pub year: i32,
    pub actual: f64,
    pub predicted: f64,
}

/// Predict every test row and score the predictions.
pub fn evaluate(model: &FittedModel, test: &[ModelRow]) -> Result<(Vec<Prediction>, Metrics), AppError> {
    if test.is_empty() {
        return Err(AppError::Data("Test partition is empty; nothing to evaluate.".to_string()));
    }

    let mut predictions = Vec::with_capacity(test.len());
    for row in test {
        let predicted = model.predict(&row.features);
        if !predicted.is_finite() {
            return Err(AppError::Data(format!(
                "Non-finite {} prediction for {} {}",
                model.kind(),
                row.country_code,
                row.year
            )));
        }
        predictions.push(Prediction {
            country_code: row.country_code.clone(),
            year: row.year,
            actual: row.target,
            predicted,
        });
    }

    let actual: Vec<f64> = predictions.iter().map(|p| p.actual).collect();
    let predicted: Vec<f64> = predictions.iter().map(|p| p.predicted).collect();
    let metrics = Metrics {
        rmse: rmse(&actual, &predicted),
        r_squared: r_squared(&actual, &predicted),
        mae: mae(&actual, &predicted),
        n: predictions.len(),
    };

    Ok((predictions, metrics))
}

/// Side-by-side regression table, one column per linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTable {
    pub columns: Vec<ModelKind>,
    pub rows: Vec<RegressionRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionRow {
    pub term: String,
    pub cells: Vec<String>,
}

/// Build the table: coefficient rows as `estimate (se) stars`, then N and R².
pub fn regression_table(fits: &[&LinearFit]) -> RegressionTable {
    let mut terms = vec![INTERCEPT.to_string()];
    terms.extend(
        crate::domain::FEATURES
            .iter()
            .map(|f| f.field_name().to_string()),
    );
    terms.retain(|t| fits.iter().any(|fit| fit.coefficient(t).is_some()));

    let mut rows: Vec<RegressionRow> = terms
        .into_iter()
        .map(|term| {
            let cells = fits
                .iter()
                .map(|fit| fit.coefficient(&term).map(format_coefficient).unwrap_or_default())
                .collect();
            RegressionRow { term, cells }
        })
        .collect();

    rows.push(RegressionRow {
        term: "N".to_string(),
        cells: fits.iter().map(|f| f.stats.n.to_string()).collect(),
    });
    rows.push(RegressionRow {
        term: "R2".to_string(),
        cells: fits.iter().map(|f| format!("{:.3}", f.stats.r_squared)).collect(),
    });
    rows.push(RegressionRow {
        term: "Adj. R2".to_string(),
        cells: fits.iter().map(|f| format!("{:.3}", f.stats.adj_r_squared)).collect(),
    });

    RegressionTable {
        columns: fits.iter().map(|f| f.kind).collect(),
        rows,
    }
}

/// Descriptive statistics for one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSummary {
    pub indicator: Indicator,
    pub n: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
    /// Pairwise-complete Pearson correlation with GDP growth.
    pub cor_target: Option<f64>,
}

/// Summarise every indicator over the given observations.
pub fn describe(observations: &[Observation]) -> Vec<IndicatorSummary> {
    Indicator::ALL
        .iter()
        .map(|&indicator| {
            let values: Vec<f64> = observations.iter().filter_map(|o| o.get(indicator)).collect();
            let (xs, ys): (Vec<f64>, Vec<f64>) = observations
                .iter()
                .filter_map(|o| Some((o.get(indicator)?, o.get(TARGET)?)))
                .unzip();

            IndicatorSummary {
                indicator,
                n: values.len(),
                missing: observations.len() - values.len(),
                mean: mean(&values),
                sd: std_dev(&values),
                min: values.iter().copied().reduce(f64::min),
                median: median(&values),
                max: values.iter().copied().reduce(f64::max),
                cor_target: pearson(&xs, &ys),
            }
        })
        .collect()
}
