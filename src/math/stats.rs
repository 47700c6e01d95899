//! Small descriptive statistics and accuracy metrics.

use statrs::statistics::{Data, Median, Statistics};

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Statistics::mean(values))
}

/// Sample variance (n - 1 denominator), `None` below two values.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(Statistics::variance(values))
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Whether a column is constant up to rounding noise relative to its magnitude.
/// Fewer than two values count as constant.
pub fn is_constant(values: &[f64]) -> bool {
    match variance(values) {
        Some(v) => {
            let scale = values.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
            v <= 1e-12 * (1.0 + scale * scale)
        }
        None => true,
    }
}

/// Pearson correlation; `None` if either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sse: f64 = actual.iter().zip(predicted).map(|(a, p)| (p - a).powi(2)).sum();
    (sse / actual.len() as f64).sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sae: f64 = actual.iter().zip(predicted).map(|(a, p)| (p - a).abs()).sum();
    sae / actual.len() as f64
}

/// `1 - SS_res / SS_tot`.
///
/// When the actual values are constant, SS_tot is zero: a perfect prediction
/// scores 1 and anything else scores 0 (never above 1, never NaN).
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let Some(m) = mean(actual) else {
        return 0.0;
    };
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - m).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - ss_res / ss_tot).min(1.0)
}
