//! least_squares::finite_diff — finite-difference Jacobians of residual maps.
//!
//! Purpose
//! -------
//! Approximate the `n × p` Jacobian of a vector-valued residual function when
//! the model supplies no analytic derivatives, with validation and a
//! central → forward fallback.
//!
//! Key behaviors
//! -------------
//! - [`forward_jacobian`] reuses the residuals at `θ` and costs `p` extra
//!   residual evaluations.
//! - [`central_jacobian`] costs `2p` evaluations and is second-order
//!   accurate.
//! - [`compute_jacobian`] dispatches on [`DiffScheme`]; a central Jacobian
//!   that fails [`validate_jacobian`] (e.g., a step landed outside the
//!   model's domain) is retried once with forward differences.
//!
//! Invariants & assumptions
//! ------------------------
//! - Step sizes scale with `max(|θ_j|, 1)` so parameters of very different
//!   magnitudes are perturbed proportionally.
//! - Errors raised by the residual function itself (as opposed to
//!   non-finite values) are never retried; they propagate immediately.
//!
//! Testing notes
//! -------------
//! - Unit tests compare both schemes against analytic Jacobians of small
//!   closed-form residual maps and exercise the fallback path.
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        traits::DiffScheme,
        types::{Jacobian, Residuals, Theta},
        validation::validate_jacobian,
    },
};

/// compute_jacobian — finite-difference Jacobian with validation.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which to differentiate; its length sets the column count.
/// - `r0`: `&Residuals`
///   Residuals already evaluated at `theta`; its length sets the row count
///   and it is reused by the forward scheme.
/// - `scheme`: [`DiffScheme`]
///   Preferred scheme.
/// - `func`: `&F`
///   Residual map `θ ↦ r(θ)`.
///
/// Returns
/// -------
/// `OptResult<Jacobian>`
///   A validated `n × p` matrix.
///
/// Errors
/// ------
/// - Any error returned by `func`.
/// - `OptError::InvalidJacobian` when the forward path (or the fallback
///   after a failed central path) still contains non-finite entries.
pub fn compute_jacobian<F>(
    theta: &Theta, r0: &Residuals, scheme: DiffScheme, func: &F,
) -> OptResult<Jacobian>
where
    F: Fn(&Theta) -> OptResult<Residuals>,
{
    let (n_obs, dim) = (r0.len(), theta.len());
    match scheme {
        DiffScheme::Forward => {
            let jac = forward_jacobian(theta, r0, func)?;
            validate_jacobian(&jac, n_obs, dim)?;
            Ok(jac)
        }
        DiffScheme::Central => {
            let jac = central_jacobian(theta, n_obs, func)?;
            match validate_jacobian(&jac, n_obs, dim) {
                Ok(()) => Ok(jac),
                Err(_) => {
                    let jac = forward_jacobian(theta, r0, func)?;
                    validate_jacobian(&jac, n_obs, dim)?;
                    Ok(jac)
                }
            }
        }
    }
}

/// Forward differences: `J[:, j] = (r(θ + h_j e_j) − r(θ)) / h_j`.
pub fn forward_jacobian<F>(theta: &Theta, r0: &Residuals, func: &F) -> OptResult<Jacobian>
where
    F: Fn(&Theta) -> OptResult<Residuals>,
{
    let eps = f64::EPSILON.sqrt();
    let mut jac = Jacobian::zeros((r0.len(), theta.len()));
    let mut stepped = theta.clone();
    for j in 0..theta.len() {
        let base = theta[j];
        stepped[j] = base + eps * base.abs().max(1.0);
        // Use the representable step actually taken.
        let h = stepped[j] - base;
        let r1 = func(&stepped)?;
        stepped[j] = base;
        jac.column_mut(j).assign(&((&r1 - r0) / h));
    }
    Ok(jac)
}

/// Central differences: `J[:, j] = (r(θ + h_j e_j) − r(θ − h_j e_j)) / (2 h_j)`.
pub fn central_jacobian<F>(theta: &Theta, n_obs: usize, func: &F) -> OptResult<Jacobian>
where
    F: Fn(&Theta) -> OptResult<Residuals>,
{
    let eps = f64::EPSILON.cbrt();
    let mut jac = Jacobian::zeros((n_obs, theta.len()));
    let mut stepped = theta.clone();
    for j in 0..theta.len() {
        let base = theta[j];
        let h = eps * base.abs().max(1.0);
        stepped[j] = base + h;
        let r_plus = func(&stepped)?;
        stepped[j] = base - h;
        let r_minus = func(&stepped)?;
        stepped[j] = base;
        jac.column_mut(j).assign(&((&r_plus - &r_minus) / (2.0 * h)));
    }
    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of forward and central Jacobians with analytic values.
    // - The central → forward fallback when a central step is non-finite.
    // - Propagation of residual-function errors.
    // -------------------------------------------------------------------------

    // r(θ) = [θ0 · x_k^θ1] for x = [1, 2, 3].
    fn power_residuals(theta: &Theta) -> OptResult<Residuals> {
        let x = array![1.0_f64, 2.0, 3.0];
        Ok(x.mapv(|v| theta[0] * v.powf(theta[1])))
    }

    fn power_jacobian(theta: &Theta) -> Jacobian {
        let x = array![1.0_f64, 2.0, 3.0];
        let mut jac = Jacobian::zeros((3, 2));
        for (k, &v) in x.iter().enumerate() {
            jac[[k, 0]] = v.powf(theta[1]);
            jac[[k, 1]] = theta[0] * v.powf(theta[1]) * v.ln();
        }
        jac
    }

    #[test]
    // Purpose
    // -------
    // Both schemes approximate the analytic Jacobian of a smooth map.
    //
    // Given
    // -----
    // - `r(θ) = θ0 · x^θ1` at `θ = (2, 0.5)`.
    //
    // Expect
    // ------
    // - Forward agrees to ~1e-6, central to ~1e-8, entrywise.
    fn forward_and_central_match_analytic_jacobian() {
        // Arrange
        let theta = array![2.0, 0.5];
        let r0 = power_residuals(&theta).unwrap();
        let exact = power_jacobian(&theta);

        // Act
        let fwd = compute_jacobian(&theta, &r0, DiffScheme::Forward, &power_residuals).unwrap();
        let ctr = compute_jacobian(&theta, &r0, DiffScheme::Central, &power_residuals).unwrap();

        // Assert
        for ((i, j), &e) in exact.indexed_iter() {
            assert_abs_diff_eq!(fwd[[i, j]], e, epsilon = 1e-6);
            assert_abs_diff_eq!(ctr[[i, j]], e, epsilon = 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // A central step that leaves the domain falls back to forward differences.
    //
    // Given
    // -----
    // - `r(θ) = sqrt(θ)` at `θ = 0`: the backward step yields NaN, the
    //   forward step is finite.
    //
    // Expect
    // ------
    // - `compute_jacobian` with `Central` still returns a finite Jacobian.
    fn central_falls_back_to_forward_on_non_finite_step() {
        // Arrange
        let theta = array![0.0];
        let func = |t: &Theta| -> OptResult<Residuals> { Ok(Array1::from_elem(2, t[0].sqrt())) };
        let r0 = func(&theta).unwrap();

        // Act
        let jac = compute_jacobian(&theta, &r0, DiffScheme::Central, &func).unwrap();

        // Assert
        assert!(jac.iter().all(|v| v.is_finite()));
    }

    #[test]
    // Purpose
    // -------
    // Errors raised by the residual function propagate unchanged.
    fn residual_errors_propagate() {
        let theta = array![1.0];
        let r0 = array![0.0];
        let func = |_: &Theta| -> OptResult<Residuals> {
            Err(OptError::ModelEvaluation { text: "boom".to_string() })
        };

        let err = compute_jacobian(&theta, &r0, DiffScheme::Forward, &func).unwrap_err();

        assert_eq!(err, OptError::ModelEvaluation { text: "boom".to_string() });
    }
}
