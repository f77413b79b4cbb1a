// Gaussian mixture model with full covariances.
//
// Fitting is linfa-clustering's EM: k-means initialization, `n_runs`
// restarts, the run with the best lower bound kept. The only randomness is
// the seeded Xoshiro generator handed to linfa, so a fixed seed reproduces
// the fitted parameters exactly. The fitted weights, means and covariances
// are copied into a plain serializable struct that scores rows through the
// Cholesky factors of its covariances.
//
// All inputs here are already standardized (see scaler.rs).

use std::collections::HashSet;
use std::f64::consts::PI;

use linfa::traits::Fit;
use linfa::DatasetBase;
use linfa_clustering::{GaussianMixtureModel, GmmError, GmmInitMethod};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::linalg::{cholesky, log_det_from_cholesky, log_sum_exp, mahalanobis_sq};
use crate::error::{FitFailure, Result, SieveError};

/// EM settings for a single fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmParams {
    pub components: usize,
    pub max_iter: usize,
    /// Convergence threshold on the change in lower bound.
    pub tol: f64,
    /// Added to every covariance diagonal.
    pub reg_covar: f64,
    /// EM restarts, all drawing from the one seeded generator.
    pub n_runs: usize,
    pub seed: u64,
}

impl Default for EmParams {
    fn default() -> Self {
        Self {
            components: 2,
            max_iter: 100,
            tol: 1e-4,
            reg_covar: 1e-6,
            n_runs: 1,
            seed: 42,
        }
    }
}

/// Fitted mixture parameters in standardized feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    pub weights: Array1<f64>,
    /// One row per component.
    pub means: Array2<f64>,
    pub covariances: Vec<Array2<f64>>,
    /// Cholesky factors of `covariances`, kept so scoring never refactors.
    pub cholesky: Vec<Array2<f64>>,
    /// Mean per-row log-likelihood of the training data.
    pub log_likelihood: f64,
}

impl GaussianMixture {
    /// Copy the parameters out of a fitted linfa model.
    fn from_fitted(fitted: &GaussianMixtureModel<f64>, x: &Array2<f64>, reg_covar: f64) -> Result<Self> {
        let covariances: Vec<Array2<f64>> = fitted
            .covariances()
            .outer_iter()
            .map(|c| c.to_owned())
            .collect();
        let factors = covariances
            .iter()
            .map(|c| cholesky(c).ok_or(SieveError::Fit(FitFailure::SingularCovariance { reg_covar })))
            .collect::<Result<Vec<_>>>()?;

        let mut mixture = Self {
            weights: fitted.weights().to_owned(),
            means: fitted.means().to_owned(),
            covariances,
            cholesky: factors,
            log_likelihood: f64::NEG_INFINITY,
        };
        let total: f64 = x
            .axis_iter(Axis(0))
            .map(|row| log_sum_exp(&mixture.weighted_log_prob(row)))
            .sum();
        mixture.log_likelihood = total / x.nrows().max(1) as f64;
        Ok(mixture)
    }

    pub fn components(&self) -> usize {
        self.weights.len()
    }

    /// Joint log-density `log w_k + log N(x | μ_k, Σ_k)` for every component.
    pub fn weighted_log_prob(&self, x: ArrayView1<f64>) -> Vec<f64> {
        let d = x.len() as f64;
        (0..self.components())
            .map(|k| {
                let diff = &x - &self.means.row(k);
                let l = &self.cholesky[k];
                let maha = mahalanobis_sq(l, diff.view());
                let log_norm = -0.5 * (d * (2.0 * PI).ln() + log_det_from_cholesky(l));
                self.weights[k].ln() + log_norm - 0.5 * maha
            })
            .collect()
    }

    /// Posterior probability of each component for one standardized row.
    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Vec<f64> {
        let lp = self.weighted_log_prob(x);
        let norm = log_sum_exp(&lp);
        lp.iter().map(|v| (v - norm).exp()).collect()
    }

    /// Posterior matrix (rows × components) for a standardized matrix.
    pub fn predict_proba_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((x.nrows(), self.components()));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            for (k, p) in self.predict_proba(row).into_iter().enumerate() {
                out[[i, k]] = p;
            }
        }
        out
    }
}

/// Number of distinct rows, compared bit-for-bit.
pub fn distinct_rows(x: &Array2<f64>) -> usize {
    let mut seen: HashSet<Vec<u64>> = HashSet::new();
    for row in x.axis_iter(Axis(0)) {
        seen.insert(row.iter().map(|v| v.to_bits()).collect());
    }
    seen.len()
}

fn fit_failure(err: GmmError, params: &EmParams) -> SieveError {
    let failure = match err {
        GmmError::NotConverged(_) => FitFailure::NotConverged {
            iterations: params.max_iter,
            runs: params.n_runs,
        },
        GmmError::LinalgError(_) => FitFailure::SingularCovariance {
            reg_covar: params.reg_covar,
        },
        other => FitFailure::Backend(other.to_string()),
    };
    SieveError::Fit(failure)
}

/// Fit a mixture to a standardized matrix.
pub fn fit_em(x: &Array2<f64>, params: &EmParams) -> Result<GaussianMixture> {
    let n = x.nrows();
    let c = params.components;

    if n == 0 {
        return Err(SieveError::NoData("feature matrix is empty"));
    }
    if n < c {
        return Err(SieveError::Fit(FitFailure::TooFewRows {
            rows: n,
            components: c,
        }));
    }
    let distinct = distinct_rows(x);
    if distinct < c {
        return Err(SieveError::Fit(FitFailure::Degenerate {
            distinct_rows: distinct,
            components: c,
        }));
    }

    let rng = Xoshiro256Plus::seed_from_u64(params.seed);
    let dataset = DatasetBase::from(x.clone());
    let fitted = GaussianMixtureModel::params(c)
        .n_runs(params.n_runs as u64)
        .tolerance(params.tol)
        .max_n_iterations(params.max_iter as u64)
        .reg_covariance(params.reg_covar)
        .init_method(GmmInitMethod::KMeans)
        .with_rng(rng)
        .fit(&dataset)
        .map_err(|e| fit_failure(e, params))?;

    let mixture = GaussianMixture::from_fitted(&fitted, x, params.reg_covar)?;
    debug!(
        components = c,
        runs = params.n_runs,
        log_likelihood = mixture.log_likelihood,
        "EM fit finished"
    );
    Ok(mixture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn two_blobs() -> Array2<f64> {
        let mut rows = Vec::new();
        for i in 0..20 {
            let j = (i % 5) as f64 * 0.05;
            rows.push([-2.0 + j, -2.0 - j]);
            rows.push([2.0 - j, 2.0 + j * 0.5]);
        }
        Array2::from_shape_vec((40, 2), rows.into_iter().flatten().collect()).unwrap()
    }

    #[test]
    fn test_separates_two_blobs() {
        let x = two_blobs();
        let gmm = fit_em(&x, &EmParams::default()).unwrap();
        assert_eq!(gmm.components(), 2);
        assert!((gmm.weights.sum() - 1.0).abs() < 1e-9);
        assert!((gmm.weights[0] - 0.5).abs() < 1e-3);
        assert!(gmm.log_likelihood.is_finite());

        // Points from different blobs land in different components
        let a = gmm.predict_proba(x.row(0));
        let b = gmm.predict_proba(x.row(1));
        let argmax = |p: &[f64]| if p[0] >= p[1] { 0 } else { 1 };
        assert_ne!(argmax(&a), argmax(&b));
        assert!(a.iter().cloned().fold(0.0, f64::max) > 0.99);
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let x = two_blobs();
        let a = fit_em(&x, &EmParams::default()).unwrap();
        let b = fit_em(&x, &EmParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_too_few_rows_and_degenerate_input() {
        let one = arr2(&[[1.0, 2.0]]);
        assert!(matches!(
            fit_em(&one, &EmParams::default()),
            Err(SieveError::Fit(FitFailure::TooFewRows { .. }))
        ));

        let same = arr2(&[[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]]);
        assert!(matches!(
            fit_em(&same, &EmParams::default()),
            Err(SieveError::Fit(FitFailure::Degenerate { .. }))
        ));

        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            fit_em(&empty, &EmParams::default()),
            Err(SieveError::NoData(_))
        ));
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        // A single EM step has no earlier lower bound to settle against
        let x = two_blobs();
        let params = EmParams {
            max_iter: 1,
            ..EmParams::default()
        };
        assert!(matches!(
            fit_em(&x, &params),
            Err(SieveError::Fit(FitFailure::NotConverged {
                iterations: 1,
                runs: 1
            }))
        ));
    }

    #[test]
    fn test_distinct_rows() {
        let x = arr2(&[[0.0, 1.0], [0.0, 1.0], [1.0, 0.0]]);
        assert_eq!(distinct_rows(&x), 2);
    }
}
