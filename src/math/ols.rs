//! Least squares primitives.
//!
//! Linear models here are tiny (at most five columns) but the design matrix is
//! tall, so we solve through SVD rather than the normal equations. The normal
//! matrix is still inverted once per fit for the coefficient covariance.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// `(XᵀX)⁻¹`, or `None` when the columns are linearly dependent.
pub fn inverse_gram(x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let gram = x.transpose() * x;
    gram.try_inverse()
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
}
