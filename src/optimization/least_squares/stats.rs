//! least_squares::stats — goodness-of-fit and parameter uncertainty.
//!
//! Purpose
//! -------
//! Summarize a finished weighted least-squares fit: χ², reduced χ², the
//! information criteria, and (when the normal matrix is well conditioned)
//! the parameter covariance and standard errors.
//!
//! Key behaviors
//! -------------
//! - `redchi = χ² / max(n − p, 1)`.
//! - `aic = n·ln(χ²/n) + 2p`, `bic = n·ln(χ²/n) + ln(n)·p`, with χ² floored
//!   at `1e-250·n` so a perfect fit yields finite criteria.
//! - `cov = redchi · (JᵀJ)⁻¹` from a symmetric eigendecomposition of `JᵀJ`,
//!   where `J` is the Jacobian of the *weighted* residuals at θ̂.
//!
//! Conventions
//! -----------
//! - The normal matrix is treated as singular when its smallest eigenvalue is
//!   at most [`EIGEN_EPS`] times its largest; covariance and standard errors
//!   are then `None`.
//! - A Jacobian that cannot be formed at θ̂ (non-finite entries, or a model
//!   that fails at a difference step) also yields `None`; statistics never
//!   invalidate an otherwise successful fit.
use crate::optimization::least_squares::{
        adapter::WeightedResiduals,
        traits::{CurveModel, DiffScheme},
        types::{Cost, EIGEN_EPS, Jacobian, Theta, Weights},
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Summary statistics of a weighted least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitStatistics {
    pub ndata: usize,
    pub nvarys: usize,
    pub nfree: usize,
    pub chisqr: Cost,
    pub redchi: f64,
    pub aic: f64,
    pub bic: f64,
    pub covariance: Option<Array2<f64>>,
    pub stderr: Option<Array1<f64>>,
}

impl FitStatistics {
    /// Compute statistics from the final χ² and, optionally, the Jacobian of
    /// the weighted residuals at θ̂.
    ///
    /// Parameters
    /// ----------
    /// - `chisqr`: `Cost`
    ///   Weighted sum of squared residuals at θ̂.
    /// - `ndata`: `usize`
    ///   Number of observations `n`.
    /// - `nvarys`: `usize`
    ///   Number of fitted parameters `p`.
    /// - `jacobian`: `Option<&Jacobian>`
    ///   `n × p` residual Jacobian; `None` skips the covariance.
    pub fn new(chisqr: Cost, ndata: usize, nvarys: usize, jacobian: Option<&Jacobian>) -> Self {
        let nfree = ndata.saturating_sub(nvarys);
        let redchi = chisqr / nfree.max(1) as f64;
        let n = ndata as f64;
        let p = nvarys as f64;
        let neg2_loglik = n * (chisqr.max(1e-250 * n) / n).ln();
        let aic = neg2_loglik + 2.0 * p;
        let bic = neg2_loglik + n.ln() * p;

        let covariance = jacobian.and_then(|j| covariance_from_jacobian(j, redchi));
        let stderr = covariance.as_ref().map(|c| c.diag().mapv(|v| v.max(0.0).sqrt()));

        Self { ndata, nvarys, nfree, chisqr, redchi, aic, bic, covariance, stderr }
    }
}

/// Evaluate the residual Jacobian at θ̂ and compute [`FitStatistics`].
///
/// The extra model evaluations made here are outside any solver budget. Any
/// failure to form the Jacobian, model errors included, leaves the
/// covariance and standard errors at `None`.
pub fn fit_statistics<M: CurveModel>(
    model: &M, y: &Array1<f64>, weights: &Weights, theta_hat: &Theta, chisqr: Cost,
    scheme: DiffScheme,
) -> FitStatistics {
    let problem = WeightedResiduals::new(model, y, weights, scheme);
    let jacobian = problem.residual_jacobian(theta_hat).ok();
    FitStatistics::new(chisqr, y.len(), theta_hat.len(), jacobian.as_ref())
}

/// `redchi · (JᵀJ)⁻¹` via `JᵀJ = Q Λ Qᵀ`, or `None` if `J` is not finite or
/// `JᵀJ` is numerically singular.
fn covariance_from_jacobian(jacobian: &Jacobian, redchi: f64) -> Option<Array2<f64>> {
    if !jacobian.iter().all(|v| v.is_finite()) {
        return None;
    }
    let jtj = jacobian.t().dot(jacobian);
    let p = jtj.nrows();
    let eigen = DMatrix::from_fn(p, p, |i, j| jtj[[i, j]]).symmetric_eigen();
    let lambda_max = eigen.eigenvalues.iter().fold(0.0_f64, |m, &l| m.max(l));
    if lambda_max <= 0.0 || eigen.eigenvalues.iter().any(|&l| l <= EIGEN_EPS * lambda_max) {
        return None;
    }
    let q = &eigen.eigenvectors;
    let cov = Array2::from_shape_fn((p, p), |(i, j)| {
        redchi
            * eigen.eigenvalues.iter().enumerate().map(|(k, &l)| q[(i, k)] * q[(j, k)] / l).sum::<f64>()
    });
    Some(cov)
}
