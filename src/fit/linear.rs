//! Ordinary least squares with classical inference.
//!
//! For a model `y = Xβ + ε` with an intercept column:
//!
//! ```text
//! β̂      = argmin ‖y − Xβ‖²          (SVD solve)
//! σ̂²     = RSS / (n − p)
//! se(β̂)  = sqrt(diag(σ̂² (XᵀX)⁻¹))
//! t      = β̂ / se,   p = 2 · (1 − F_t(|t|; n − p))
//! ```
//!
//! Guardrails: at least `features + 1` rows and no constant feature column.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::domain::{Indicator, ModelKind, ModelRow};
use crate::error::FitFailure;
use crate::math::{inverse_gram, is_constant, r_squared, solve_least_squares};

pub const INTERCEPT: &str = "(Intercept)";

/// One estimated coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    #[serde(with = "nullable_f64")]
    pub std_error: f64,
    #[serde(with = "nullable_f64")]
    pub t_stat: f64,
    #[serde(with = "nullable_f64")]
    pub p_value: f64,
}

impl Coefficient {
    pub fn stars(&self) -> &'static str {
        significance_stars(self.p_value)
    }
}

/// Significance marker: `***` p<0.001, `**` p<0.01, `*` p<0.05.
pub fn significance_stars(p_value: f64) -> &'static str {
    if p_value < 0.001 {
        "***"
    } else if p_value < 0.01 {
        "**"
    } else if p_value < 0.05 {
        "*"
    } else {
        ""
    }
}

/// Whole-model statistics on the training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearStats {
    pub n: usize,
    pub df_residual: usize,
    pub r_squared: f64,
    #[serde(with = "nullable_f64")]
    pub adj_r_squared: f64,
    /// Residual standard error.
    #[serde(with = "nullable_f64")]
    pub sigma: f64,
    #[serde(with = "nullable_f64")]
    pub f_statistic: f64,
    #[serde(with = "nullable_f64")]
    pub f_p_value: f64,
}

/// JSON has no NaN or infinity: non-finite values are written as `null` and
/// read back as NaN.
mod nullable_f64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// A fitted linear model. Coefficients are intercept first, then `features` in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub kind: ModelKind,
    pub features: Vec<Indicator>,
    pub coefficients: Vec<Coefficient>,
    pub stats: LinearStats,
}

impl LinearFit {
    /// Predict from a feature vector in `FEATURES` layout.
    pub fn predict(&self, x: &[f64; 4]) -> f64 {
        let mut y = self.coefficients[0].estimate;
        for (feature, coef) in self.features.iter().zip(&self.coefficients[1..]) {
            if let Some(idx) = feature.feature_index() {
                y += coef.estimate * x[idx];
            }
        }
        y
    }

    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0].estimate
    }
}

/// Fit a baseline or extended linear model on training rows.
pub fn fit_linear(kind: ModelKind, rows: &[ModelRow]) -> Result<LinearFit, FitFailure> {
    if kind == ModelKind::Forest {
        return Err(FitFailure::new(kind, "not a linear model"));
    }
    let features: Vec<Indicator> = kind.features().to_vec();
    let k = features.len();
    let p = k + 1;
    let n = rows.len();

    if n < p {
        return Err(FitFailure::new(
            kind,
            format!("insufficient training rows: n={n} < features+1={p}"),
        ));
    }

    let columns: Vec<usize> = features.iter().filter_map(|f| f.feature_index()).collect();
    for (feature, &col) in features.iter().zip(&columns) {
        let values: Vec<f64> = rows.iter().map(|r| r.features[col]).collect();
        if is_constant(&values) {
            return Err(FitFailure::new(kind, format!("feature `{feature}` has zero variance")));
        }
    }

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    for (i, row) in rows.iter().enumerate() {
        x[(i, 0)] = 1.0;
        for (j, &col) in columns.iter().enumerate() {
            x[(i, j + 1)] = row.features[col];
        }
        y[i] = row.target;
    }

    let beta = solve_least_squares(&x, &y)
        .ok_or_else(|| FitFailure::new(kind, "least squares solve failed (ill-conditioned design)"))?;
    let xtx_inv = inverse_gram(&x)
        .ok_or_else(|| FitFailure::new(kind, "design matrix is rank deficient (collinear features)"))?;

    let fitted = &x * &beta;
    let rss: f64 = (&y - &fitted).iter().map(|r| r * r).sum();
    let df = n - p;
    let sigma2 = if df > 0 { rss / df as f64 } else { f64::NAN };

    let t_dist = if df > 0 {
        Some(StudentsT::new(0.0, 1.0, df as f64).map_err(|e| FitFailure::new(kind, format!("t distribution: {e}")))?)
    } else {
        None
    };

    let mut terms = vec![INTERCEPT.to_string()];
    terms.extend(features.iter().map(|f| f.field_name().to_string()));

    let coefficients = terms
        .into_iter()
        .enumerate()
        .map(|(j, term)| {
            let estimate = beta[j];
            let std_error = if df > 0 {
                (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt()
            } else {
                f64::NAN
            };
            let t_stat = t_statistic(estimate, std_error);
            let p_value = match &t_dist {
                Some(dist) => two_sided_p(dist, t_stat),
                None => f64::NAN,
            };
            Coefficient {
                term,
                estimate,
                std_error,
                t_stat,
                p_value,
            }
        })
        .collect();

    let y_vec: Vec<f64> = y.iter().copied().collect();
    let fitted_vec: Vec<f64> = fitted.iter().copied().collect();
    let r2 = r_squared(&y_vec, &fitted_vec);
    let (adj_r_squared, f_statistic, f_p_value) = if df > 0 {
        let adj = 1.0 - (1.0 - r2) * (n as f64 - 1.0) / df as f64;
        let (f, fp) = f_test(r2, k, df);
        (adj, f, fp)
    } else {
        (f64::NAN, f64::NAN, f64::NAN)
    };

    Ok(LinearFit {
        kind,
        features,
        coefficients,
        stats: LinearStats {
            n,
            df_residual: df,
            r_squared: r2,
            adj_r_squared,
            sigma: sigma2.sqrt(),
            f_statistic,
            f_p_value,
        },
    })
}

fn t_statistic(estimate: f64, std_error: f64) -> f64 {
    if std_error > 0.0 {
        estimate / std_error
    } else if std_error == 0.0 {
        if estimate == 0.0 { 0.0 } else { f64::INFINITY.copysign(estimate) }
    } else {
        f64::NAN
    }
}

fn two_sided_p(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)
}

/// Overall F test from R² (all slopes zero vs. the fitted model).
fn f_test(r2: f64, k: usize, df: usize) -> (f64, f64) {
    let df1 = k as f64;
    let df2 = df as f64;
    if r2 >= 1.0 {
        return (f64::INFINITY, 0.0);
    }
    let f = (r2 / df1) / ((1.0 - r2) / df2);
    let p = FisherSnedecor::new(df1, df2)
        .map(|dist| (1.0 - dist.cdf(f.max(0.0))).clamp(0.0, 1.0))
        .unwrap_or(f64::NAN);
    (f, p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(i: usize, features: [f64; 4], target: f64) -> ModelRow {
        ModelRow {
            country_code: format!("C{i}"),
            year: 2000 + i as i32,
            features,
            target,
        }
    }

    #[test]
    fn baseline_recovers_exact_line() {
        // education_spending = [2,4,6,8], gdp_growth = [1,2,3,4]
        let rows: Vec<ModelRow> = [2.0, 4.0, 6.0, 8.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| row(i, [x, 0.0, 0.0, 0.0], x / 2.0))
            .collect();

        let fit = fit_linear(ModelKind::Baseline, &rows).unwrap();
        let slope = fit.coefficient("education_spending").unwrap().estimate;
        assert!((slope - 0.5).abs() < 1e-10);
        assert!(fit.intercept().abs() < 1e-10);
        assert!((fit.stats.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.stats.r_squared <= 1.0);
        assert!((fit.predict(&[10.0, 99.0, 99.0, 99.0]) - 5.0).abs() < 1e-9);
    }

    fn noisy_rows(n: usize) -> Vec<ModelRow> {
        (0..n)
            .map(|i| {
                let e = 2.0 + (i % 7) as f64 * 0.6;
                let u = 4.0 + ((i * 3) % 11) as f64 * 0.5;
                let inf = 1.0 + ((i * 5) % 13) as f64 * 0.4;
                let pop = -0.5 + ((i * 7) % 5) as f64 * 0.3;
                let noise = ((i * 31) % 17) as f64 / 17.0 - 0.5;
                let y = 1.0 + 0.8 * e - 0.3 * u + 0.1 * inf + 0.5 * pop + noise;
                row(i, [e, u, inf, pop], y)
            })
            .collect()
    }

    #[test]
    fn extended_model_reports_inference() {
        let rows = noisy_rows(60);
        let fit = fit_linear(ModelKind::Extended, &rows).unwrap();
        assert_eq!(fit.coefficients.len(), 5);
        assert_eq!(fit.coefficients[0].term, INTERCEPT);
        assert_eq!(fit.stats.df_residual, 55);

        for c in &fit.coefficients {
            assert!(c.std_error > 0.0 && c.std_error.is_finite());
            assert!((0.0..=1.0).contains(&c.p_value));
        }
        let edu = fit.coefficient("education_spending").unwrap();
        assert!((edu.estimate - 0.8).abs() < 0.2);
        assert_eq!(edu.stars(), "***");
        assert!(fit.stats.r_squared > 0.8 && fit.stats.r_squared <= 1.0);
        assert!(fit.stats.adj_r_squared <= fit.stats.r_squared);
        assert!(fit.stats.f_p_value < 0.001);
    }

    #[test]
    fn fits_are_deterministic() {
        let rows = noisy_rows(40);
        let a = fit_linear(ModelKind::Extended, &rows).unwrap();
        let b = fit_linear(ModelKind::Extended, &rows).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_rows_is_a_fit_failure() {
        let rows = noisy_rows(4);
        let err = fit_linear(ModelKind::Extended, &rows).unwrap_err();
        assert_eq!(err.model, ModelKind::Extended);
        assert!(err.reason.contains("insufficient"));
    }

    #[test]
    fn constant_feature_is_a_fit_failure() {
        let rows: Vec<ModelRow> = noisy_rows(20)
            .into_iter()
            .map(|mut r| {
                r.features[2] = 3.0;
                r
            })
            .collect();
        let err = fit_linear(ModelKind::Extended, &rows).unwrap_err();
        assert!(err.reason.contains("inflation"), "{}", err.reason);

        // The baseline model does not use inflation and still fits.
        assert!(fit_linear(ModelKind::Baseline, &rows).is_ok());
    }

    #[test]
    fn stars_follow_fixed_thresholds() {
        assert_eq!(significance_stars(0.0005), "***");
        assert_eq!(significance_stars(0.005), "**");
        assert_eq!(significance_stars(0.03), "*");
        assert_eq!(significance_stars(0.05), "");
        assert_eq!(significance_stars(f64::NAN), "");
    }

    #[test]
    fn non_finite_statistics_survive_json() {
        let rows: Vec<ModelRow> = [2.0, 4.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| row(i, [x, 0.0, 0.0, 0.0], x / 2.0))
            .collect();
        // n == p leaves no residual degrees of freedom.
        let fit = fit_linear(ModelKind::Baseline, &rows).unwrap();
        assert!(fit.coefficients[1].std_error.is_nan());

        let json = serde_json::to_string(&fit).unwrap();
        let back: LinearFit = serde_json::from_str(&json).unwrap();
        assert!(back.coefficients[1].p_value.is_nan());
        assert!((back.coefficients[1].estimate - 0.5).abs() < 1e-10);
    }
}
