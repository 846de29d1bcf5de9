//! Validation helpers for weighted least-squares fitting.
//!
//! - **Tolerance checks**: [`verify_ftol`], [`verify_xtol`], [`verify_gtol`]
//!   ensure numeric tolerances are finite and non-negative.
//! - **Budget checks**: [`verify_max_nfev`] rejects budgets too small to
//!   evaluate the starting point.
//! - **Problem checks**: [`validate_problem`] checks θ₀ and weight lengths.
//! - **Model output**: [`validate_predictions`] and [`validate_jacobian`]
//!   enforce shapes (and, for Jacobians, finiteness).
//! - **Parameter estimates**: [`validate_theta_hat`] ensures a candidate
//!   `theta_hat` exists and contains only finite values.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::types::{Jacobian, Predictions, Theta, Weights},
};

/// Validate the relative cost-reduction tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidFTol`] if the value is non-finite or negative.
pub fn verify_ftol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidFTol { tol, reason: "Tolerance must be finite." });
    }
    if tol < 0.0 {
        return Err(OptError::InvalidFTol { tol, reason: "Tolerance must be non-negative." });
    }
    Ok(())
}

/// Validate the relative step tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidXTol`] if the value is non-finite or negative.
pub fn verify_xtol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidXTol { tol, reason: "Tolerance must be finite." });
    }
    if tol < 0.0 {
        return Err(OptError::InvalidXTol { tol, reason: "Tolerance must be non-negative." });
    }
    Ok(())
}

/// Validate the gradient (max-norm) tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidGTol`] if the value is non-finite or negative.
pub fn verify_gtol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidGTol { tol, reason: "Tolerance must be finite." });
    }
    if tol < 0.0 {
        return Err(OptError::InvalidGTol { tol, reason: "Tolerance must be non-negative." });
    }
    Ok(())
}

/// Validate an evaluation budget.
///
/// The solver needs the residuals at θ₀ and at least one more model call
/// towards a Jacobian before it can step, so budgets below two are rejected.
/// Budgets that cannot cover a full finite-difference Jacobian are accepted
/// and stop softly at θ₀.
///
/// # Errors
/// Returns [`OptError::InvalidMaxNfev`] if `max_nfev < 2`.
pub fn verify_max_nfev(max_nfev: usize) -> OptResult<()> {
    if max_nfev < 2 {
        return Err(OptError::InvalidMaxNfev {
            max_nfev,
            reason: "Budget must allow the starting residuals and one further model call.",
        });
    }
    Ok(())
}

/// Validate the static inputs of one weighted solve.
///
/// Checks:
/// - at least one observation,
/// - `weights.len() == n_obs`,
/// - `theta0` non-empty with finite entries.
///
/// # Errors
/// - [`OptError::EmptyData`], [`OptError::DataLengthMismatch`],
///   [`OptError::EmptyTheta`], or [`OptError::NonFiniteTheta`].
pub fn validate_problem(n_obs: usize, weights: &Weights, theta0: &Theta) -> OptResult<()> {
    if n_obs == 0 {
        return Err(OptError::EmptyData);
    }
    if weights.len() != n_obs {
        return Err(OptError::DataLengthMismatch { observations: n_obs, weights: weights.len() });
    }
    if theta0.is_empty() {
        return Err(OptError::EmptyTheta);
    }
    for (index, &value) in theta0.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::NonFiniteTheta { index, value });
        }
    }
    Ok(())
}

/// Validate the length of a prediction vector.
///
/// Non-finite predictions are *not* rejected here: during a solve they only
/// make a trial step unattractive, and the IRLS driver applies its own
/// domain check on the final predictions.
///
/// # Errors
/// Returns [`OptError::PredictionLengthMismatch`] if `pred.len() != n_obs`.
pub fn validate_predictions(pred: &Predictions, n_obs: usize) -> OptResult<()> {
    if pred.len() != n_obs {
        return Err(OptError::PredictionLengthMismatch { expected: n_obs, found: pred.len() });
    }
    Ok(())
}

/// Validate the shape and entries of a residual Jacobian.
///
/// # Errors
/// - [`OptError::JacobianDimMismatch`] if the shape is not `n_obs × dim`.
/// - [`OptError::InvalidJacobian`] for the first non-finite entry.
pub fn validate_jacobian(jac: &Jacobian, n_obs: usize, dim: usize) -> OptResult<()> {
    if jac.nrows() != n_obs || jac.ncols() != dim {
        return Err(OptError::JacobianDimMismatch {
            expected: (n_obs, dim),
            found: (jac.nrows(), jac.ncols()),
        });
    }
    for ((row, col), &value) in jac.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidJacobian { row, col, value });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    // Purpose
    // -------
    // Tolerances accept zero and reject negative or non-finite values.
    //
    // Given
    // -----
    // - `0.0`, `-1e-8`, and `NaN` for each tolerance kind.
    //
    // Expect
    // ------
    // - `Ok` for zero; the matching error variant otherwise.
    fn tolerance_checks_accept_zero_and_reject_bad_values() {
        assert!(verify_ftol(0.0).is_ok());
        assert!(verify_xtol(0.0).is_ok());
        assert!(verify_gtol(0.0).is_ok());

        assert!(matches!(verify_ftol(-1e-8), Err(OptError::InvalidFTol { .. })));
        assert!(matches!(verify_xtol(f64::NAN), Err(OptError::InvalidXTol { .. })));
        assert!(matches!(verify_gtol(f64::INFINITY), Err(OptError::InvalidGTol { .. })));
    }

    #[test]
    // Purpose
    // -------
    // The evaluation budget must cover the starting residual and Jacobian.
    //
    // Expect
    // ------
    // - `1` is rejected, `2` is accepted.
    fn max_nfev_below_two_is_rejected() {
        assert!(matches!(verify_max_nfev(1), Err(OptError::InvalidMaxNfev { max_nfev: 1, .. })));
        assert!(verify_max_nfev(2).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `validate_problem` reports the first structural problem it finds.
    //
    // Given
    // -----
    // - Mismatched weights, empty θ₀, and a NaN entry in θ₀.
    //
    // Expect
    // ------
    // - `DataLengthMismatch`, `EmptyTheta`, and `NonFiniteTheta` respectively.
    fn validate_problem_flags_structural_errors() {
        let w = array![1.0, 1.0];
        let theta = array![1.0];

        assert_eq!(
            validate_problem(3, &w, &theta),
            Err(OptError::DataLengthMismatch { observations: 3, weights: 2 })
        );
        assert_eq!(validate_problem(2, &w, &Theta::zeros(0)), Err(OptError::EmptyTheta));
        assert!(matches!(
            validate_problem(2, &w, &array![f64::NAN]),
            Err(OptError::NonFiniteTheta { index: 0, .. })
        ));
        assert_eq!(validate_problem(0, &Weights::zeros(0), &theta), Err(OptError::EmptyData));
        assert!(validate_problem(2, &w, &theta).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Jacobian validation checks the `n × p` shape before the entries.
    //
    // Expect
    // ------
    // - Transposed shape yields `JacobianDimMismatch`.
    // - A NaN entry yields `InvalidJacobian` with its position.
    fn validate_jacobian_checks_shape_then_entries() {
        let wrong_shape = Array2::<f64>::zeros((2, 3));
        assert_eq!(
            validate_jacobian(&wrong_shape, 3, 2),
            Err(OptError::JacobianDimMismatch { expected: (3, 2), found: (2, 3) })
        );

        let mut jac = Array2::<f64>::zeros((3, 2));
        jac[[2, 1]] = f64::NAN;
        assert!(matches!(
            validate_jacobian(&jac, 3, 2),
            Err(OptError::InvalidJacobian { row: 2, col: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `validate_theta_hat` unwraps finite estimates and rejects the rest.
    fn validate_theta_hat_requires_present_finite_vector() {
        assert_eq!(validate_theta_hat(None), Err(OptError::MissingThetaHat));
        assert!(matches!(
            validate_theta_hat(Some(array![1.0, f64::INFINITY])),
            Err(OptError::InvalidThetaHat { index: 1, .. })
        ));
        assert_eq!(validate_theta_hat(Some(array![1.0, 2.0])), Ok(array![1.0, 2.0]));
    }
}
