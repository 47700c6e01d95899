//! Fit every model variant on the training partition.
//!
//! Each variant is attempted independently: a degenerate training set for one
//! model is recorded as a `FitFailure` and the remaining models still fit.

use log::{info, warn};

use crate::domain::{ForestParams, ModelKind, ModelRow};
use crate::error::FitFailure;
use crate::fit::forest::fit_forest;
use crate::fit::linear::fit_linear;
use crate::models::FittedModel;

/// Output of fitting the full model suite.
#[derive(Debug, Clone)]
pub struct FitSuite {
    pub fits: Vec<FittedModel>,
    /// Models that could not be fit, and why (for diagnostics).
    pub failures: Vec<FitFailure>,
}

impl FitSuite {
    pub fn get(&self, kind: ModelKind) -> Option<&FittedModel> {
        self.fits.iter().find(|m| m.kind() == kind)
    }
}

/// Fit baseline, extended and forest models on `train` only.
pub fn fit_all(train: &[ModelRow], forest: &ForestParams) -> FitSuite {
    let mut fits = Vec::new();
    let mut failures = Vec::new();

    for kind in ModelKind::ALL {
        let result = match kind {
            ModelKind::Baseline | ModelKind::Extended => fit_linear(kind, train).map(FittedModel::Linear),
            ModelKind::Forest => fit_forest(train, forest).map(FittedModel::Forest),
        };
        match result {
            Ok(model) => {
                info!("Fitted {} on {} training rows", kind.display_name(), train.len());
                fits.push(model);
            }
            Err(failure) => {
                warn!("{} failed to fit: {}", kind.display_name(), failure.reason);
                failures.push(failure);
            }
        }
    }

    FitSuite { fits, failures }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize, flat_inflation: bool) -> Vec<ModelRow> {
        (0..n)
            .map(|i| {
                let e = 2.0 + (i % 6) as f64;
                ModelRow {
                    country_code: format!("C{i}"),
                    year: 2000 + i as i32,
                    features: [
                        e,
                        ((i * 3) % 7) as f64,
                        if flat_inflation { 2.0 } else { ((i * 5) % 9) as f64 },
                        ((i * 7) % 4) as f64,
                    ],
                    target: 0.5 * e + ((i * 13) % 5) as f64 * 0.1,
                }
            })
            .collect()
    }

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        }
    }

    #[test]
    fn all_models_fit_on_healthy_data() {
        let suite = fit_all(&rows(40, false), &params());
        assert!(suite.failures.is_empty(), "{:?}", suite.failures);
        assert_eq!(suite.fits.len(), 3);
        assert!(suite.get(ModelKind::Forest).is_some());
    }

    #[test]
    fn one_failure_does_not_block_other_models() {
        let suite = fit_all(&rows(40, true), &params());
        let failed: Vec<ModelKind> = suite.failures.iter().map(|f| f.model).collect();
        assert_eq!(failed, vec![ModelKind::Extended, ModelKind::Forest]);
        assert!(suite.get(ModelKind::Baseline).is_some());
    }

    #[test]
    fn linear_and_forest_agree_on_near_constant_features() {
        let train: Vec<ModelRow> = rows(40, false)
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.features[2] = 2.0 + i as f64 * 1e-10;
                r
            })
            .collect();
        let suite = fit_all(&train, &params());
        let failed: Vec<ModelKind> = suite.failures.iter().map(|f| f.model).collect();
        assert_eq!(failed, vec![ModelKind::Extended, ModelKind::Forest]);
        for failure in &suite.failures {
            assert!(failure.reason.contains("zero variance"), "{}", failure.reason);
        }
    }
}
