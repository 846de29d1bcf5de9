//! least_squares::levenberg_marquardt — budgeted Levenberg–Marquardt solver.
//!
//! Purpose
//! -------
//! Implement damped Gauss–Newton iterations as an `argmin` [`Solver`] over any
//! problem exposing weighted residuals (`Operator`) and their Jacobian. The
//! solver works within a hard budget on model evaluations so a caller can
//! run deliberately *partial* solves.
//!
//! Key behaviors
//! -------------
//! - Steps solve `(JᵀJ + λ·D) δ = −Jᵀr` with `D = diag(JᵀJ)` floored at
//!   machine epsilon, via a Cholesky factorization (`nalgebra`).
//! - Damping follows Nielsen's update: on an accepted step
//!   `λ ← λ · max(1/3, 1 − (2ρ − 1)³)`, `ν ← 2`; on a rejected step
//!   `λ ← λ · ν`, `ν ← 2ν`. ρ is the ratio of actual to predicted reduction
//!   of `½‖r‖²`; non-finite trial costs count as rejections.
//! - Stops with `SolverConverged` on the `gtol`, `xtol`, or `ftol` tests and
//!   with `SolverExit(BUDGET_EXHAUSTED)` when the budget cannot pay for the
//!   next trial step or Jacobian.
//!
//! Invariants & assumptions
//! ------------------------
//! - `state.param` always holds the last *accepted* θ and `state.cost` its
//!   `χ²`, so the executor's best-parameter tracking never sees a rejected
//!   trial point.
//! - The problem meters model calls itself ([`EvaluationBudget`]); the
//!   solver only reads what is left. The cost of one Jacobian is measured
//!   at θ₀ and a fresh Jacobian is requested only when it and one trial step
//!   still fit.
//! - A budget that runs out inside a Jacobian is a soft stop at the last
//!   accepted θ, never an error.
use crate::optimization::{
    errors::OptError,
    least_squares::{
        traits::{EvaluationBudget, Tolerances},
        types::{Cost, Jacobian, LmState, Residuals, Theta},
    },
};
use argmin::core::{
    ArgminError, Error, Jacobian as ArgminJacobian, KV, Operator, Problem, Solver, State,
    TerminationReason,
};
use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::Array1;

/// Exit message used when the evaluation budget runs out.
pub const BUDGET_EXHAUSTED: &str = "evaluation budget exhausted";

/// Levenberg–Marquardt solver with a hard evaluation budget.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    tols: Tolerances,
    max_nfev: usize,
    damping_scale: f64,
    lambda: f64,
    nu: f64,
    jacobian_cost: usize,
    residuals: Option<Residuals>,
    jacobian: Option<Jacobian>,
}

impl LevenbergMarquardt {
    /// Create a solver with the given tolerances, budget, and initial damping
    /// scale `τ`. Inputs are assumed validated (see `LMOptions::new`).
    pub fn new(tols: Tolerances, max_nfev: usize, damping_scale: f64) -> Self {
        Self {
            tols,
            max_nfev,
            damping_scale,
            lambda: 0.0,
            nu: 2.0,
            jacobian_cost: 1,
            residuals: None,
            jacobian: None,
        }
    }

    /// Evaluation budget of this solver.
    pub fn max_nfev(&self) -> usize {
        self.max_nfev
    }

    fn reject(&mut self) {
        self.lambda *= self.nu;
        self.nu *= 2.0;
    }
}

impl<O> Solver<O, LmState> for LevenbergMarquardt
where
    O: Operator<Param = Theta, Output = Residuals>
        + ArgminJacobian<Param = Theta, Jacobian = Jacobian>
        + EvaluationBudget,
{
    const NAME: &'static str = "Levenberg-Marquardt";

    fn init(
        &mut self, problem: &mut Problem<O>, mut state: LmState,
    ) -> Result<(LmState, Option<KV>), Error> {
        let theta = state.take_param().ok_or_else(missing_param)?;
        let r = problem.apply(&theta)?;
        let cost = r.dot(&r);
        if !cost.is_finite() {
            return Err(OptError::NonFiniteCost { value: cost }.into());
        }
        let spent = evaluations(problem);
        let jac = match problem.jacobian(&theta) {
            Ok(jac) => jac,
            Err(err) if is_budget_exhausted(&err) => {
                self.residuals = Some(r);
                return Ok((state.param(theta).cost(cost).terminate_with(budget_exit()), None));
            }
            Err(err) => return Err(err),
        };
        self.jacobian_cost = evaluations(problem).saturating_sub(spent).max(1);

        let max_diag = jac.t().dot(&jac).diag().fold(0.0_f64, |m, &d| m.max(d));
        self.lambda = if max_diag > 0.0 { self.damping_scale * max_diag } else { self.damping_scale };
        self.nu = 2.0;
        self.residuals = Some(r);
        self.jacobian = Some(jac);
        Ok((state.param(theta).cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<O>, mut state: LmState,
    ) -> Result<(LmState, Option<KV>), Error> {
        let theta = state.take_param().ok_or_else(missing_param)?;
        let (Some(r), Some(jac)) = (self.residuals.take(), self.jacobian.take()) else {
            return Err(missing_param());
        };
        let cost = state.get_cost();

        let grad = jac.t().dot(&r);
        let grad_max = grad.fold(0.0_f64, |m, &g| m.max(g.abs()));
        if grad_max <= self.tols.gtol {
            self.residuals = Some(r);
            self.jacobian = Some(jac);
            return Ok((state.param(theta).terminate_with(TerminationReason::SolverConverged), None));
        }
        if remaining(problem) == 0 {
            self.residuals = Some(r);
            self.jacobian = Some(jac);
            return Ok((state.param(theta).terminate_with(budget_exit()), None));
        }

        let jtj = jac.t().dot(&jac);
        let scale = jtj.diag().mapv(|d| d.max(f64::EPSILON));
        let Some(delta) = solve_damped(&jtj, &scale, &grad, self.lambda) else {
            self.reject();
            self.residuals = Some(r);
            self.jacobian = Some(jac);
            return Ok((state.param(theta), None));
        };

        let delta_norm = delta.dot(&delta).sqrt();
        let theta_norm = theta.dot(&theta).sqrt();
        if delta_norm <= self.tols.xtol * (theta_norm + self.tols.xtol) {
            self.residuals = Some(r);
            self.jacobian = Some(jac);
            return Ok((state.param(theta).terminate_with(TerminationReason::SolverConverged), None));
        }

        let trial = &theta + &delta;
        let r_trial = problem.apply(&trial)?;
        let cost_trial: Cost = r_trial.dot(&r_trial);

        // Predicted reduction of ½‖r‖² under the linear model: ½ δᵀ(λDδ − g).
        let predicted = 0.5 * delta.dot(&(&(&scale * &delta) * self.lambda - &grad));
        let actual = 0.5 * (cost - cost_trial);
        let rho = if cost_trial.is_finite() && predicted > 0.0 { actual / predicted } else { -1.0 };

        if rho <= 0.0 {
            self.reject();
            self.residuals = Some(r);
            self.jacobian = Some(jac);
            return Ok((state.param(theta), None));
        }

        self.lambda *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
        self.nu = 2.0;
        let state = state.param(trial.clone()).cost(cost_trial);
        self.residuals = Some(r_trial);

        if cost - cost_trial <= self.tols.ftol * cost {
            self.jacobian = Some(jac);
            return Ok((state.terminate_with(TerminationReason::SolverConverged), None));
        }
        // A fresh Jacobian is only worth paying for if a trial step can follow.
        if remaining(problem) < self.jacobian_cost + 1 {
            self.jacobian = Some(jac);
            return Ok((state.terminate_with(budget_exit()), None));
        }
        match problem.jacobian(&trial) {
            Ok(fresh) => {
                self.jacobian = Some(fresh);
                Ok((state, None))
            }
            Err(err) if is_budget_exhausted(&err) => {
                self.jacobian = Some(jac);
                Ok((state.terminate_with(budget_exit()), None))
            }
            Err(err) => Err(err),
        }
    }
}

fn evaluations<O: EvaluationBudget>(problem: &Problem<O>) -> usize {
    problem.problem.as_ref().map_or(0, |o| o.evaluations())
}

fn remaining<O: EvaluationBudget>(problem: &Problem<O>) -> usize {
    problem.problem.as_ref().and_then(|o| o.remaining()).unwrap_or(usize::MAX)
}

fn is_budget_exhausted(err: &Error) -> bool {
    matches!(err.downcast_ref::<OptError>(), Some(OptError::BudgetExhausted { .. }))
}

fn budget_exit() -> TerminationReason {
    TerminationReason::SolverExit(BUDGET_EXHAUSTED.to_string())
}

/// Solve `(JᵀJ + λ·diag(scale)) δ = −g`, returning `None` if the damped
/// matrix is not numerically positive definite or the step is not finite.
fn solve_damped(
    jtj: &ndarray::Array2<f64>, scale: &Array1<f64>, grad: &Array1<f64>, lambda: f64,
) -> Option<Array1<f64>> {
    let p = grad.len();
    let a = DMatrix::from_fn(p, p, |i, j| {
        if i == j { jtj[[i, j]] + lambda * scale[i] } else { jtj[[i, j]] }
    });
    let b = DVector::from_iterator(p, grad.iter().map(|g| -g));
    let chol = Cholesky::new(a)?;
    let sol = chol.solve(&b);
    if sol.iter().all(|v| v.is_finite()) { Some(Array1::from_iter(sol.iter().copied())) } else { None }
}

fn missing_param() -> Error {
    ArgminError::NotInitialized { text: "Levenberg-Marquardt requires an initial parameter vector".to_string() }
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // With zero damping the step is the Gauss–Newton step.
    //
    // Given
    // -----
    // - `JᵀJ = diag(2, 4)`, `g = (2, −8)`, `λ → 0`.
    //
    // Expect
    // ------
    // - `δ = −(JᵀJ)⁻¹ g = (−1, 2)`.
    fn solve_damped_reduces_to_gauss_newton_without_damping() {
        let jtj = array![[2.0, 0.0], [0.0, 4.0]];
        let scale = array![2.0, 4.0];
        let grad = array![2.0, -8.0];

        let delta = solve_damped(&jtj, &scale, &grad, 0.0).unwrap();

        assert_abs_diff_eq!(delta[0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(delta[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Heavy damping shrinks the step towards scaled steepest descent.
    //
    // Given
    // -----
    // - Same system with `λ = 1e6`.
    //
    // Expect
    // ------
    // - `|δ|` is orders of magnitude smaller than the Gauss–Newton step.
    fn solve_damped_shrinks_step_under_heavy_damping() {
        let jtj = array![[2.0, 0.0], [0.0, 4.0]];
        let scale = array![2.0, 4.0];
        let grad = array![2.0, -8.0];

        let delta = solve_damped(&jtj, &scale, &grad, 1e6).unwrap();

        assert!(delta.iter().all(|d| d.abs() < 1e-5));
    }

    #[test]
    // Purpose
    // -------
    // A singular undamped system is reported as `None`, not as a NaN step.
    fn solve_damped_rejects_singular_system() {
        let jtj = array![[1.0, 1.0], [1.0, 1.0]];
        let scale = array![1.0, 1.0];
        let grad = array![1.0, 1.0];

        assert!(solve_damped(&jtj, &scale, &grad, 0.0).is_none());
    }
}
