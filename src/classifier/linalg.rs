// Scoring helpers for a stored full-covariance mixture.
//
// linfa fits the covariances; a stored model keeps one Cholesky factor per
// component (a dozen columns each). The factor gives the log-determinant and
// Mahalanobis distances by forward substitution.

use ndarray::{Array2, ArrayView1};

/// Lower-triangular Cholesky factor `L` with `a = L Lᵀ`.
///
/// Returns None when `a` is not (numerically) positive definite.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// `log |a|` from its Cholesky factor.
pub fn log_det_from_cholesky(l: &Array2<f64>) -> f64 {
    2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>()
}

/// Squared Mahalanobis distance `dᵀ a⁻¹ d` given the Cholesky factor of `a`.
///
/// Solves `L y = d` by forward substitution; the distance is `|y|²`.
pub fn mahalanobis_sq(l: &Array2<f64>, diff: ArrayView1<f64>) -> f64 {
    let n = l.nrows();
    let mut y = vec![0.0; n];
    let mut total = 0.0;
    for i in 0..n {
        let mut sum = diff[i];
        for (k, yk) in y.iter().enumerate().take(i) {
            sum -= l[[i, k]] * yk;
        }
        y[i] = sum / l[[i, i]];
        total += y[i] * y[i];
    }
    total
}

/// Numerically stable `log Σ exp(v)`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
