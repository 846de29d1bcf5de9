//! Adapter that exposes a weighted curve fit as an `argmin` problem.
//!
//! The solver works on the weighted residual vector `r(θ) = w ⊙ (y − f(θ))`
//! and its Jacobian `J = −diag(w) · ∂f/∂θ`. Analytic model Jacobians (if
//! provided) are scaled accordingly; otherwise the residual map itself is
//! finite-differenced, so no sign flip is needed in that branch.
//!
//! Every call into the model is metered: one unit per residual vector
//! (finite-difference columns included) and one per analytic Jacobian. Once
//! the budget is spent, further evaluations fail with
//! [`OptError::BudgetExhausted`] before the model is touched.
use std::cell::{Cell, RefCell};

use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        finite_diff::compute_jacobian,
        traits::{CurveModel, DiffScheme, EvaluationBudget},
        types::{Jacobian, Residuals, Theta, Weights},
        validation::{validate_jacobian, validate_predictions},
    },
};
use argmin::core::{Error, Jacobian as ArgminJacobian, Operator};
use ndarray::{Array1, Axis};

/// Bridges a user [`CurveModel`] plus data and weights to `argmin`'s
/// `Operator` (residuals) and `Jacobian` traits.
///
/// The most recent residual evaluation is cached so that a forward-difference
/// Jacobian requested at the same `θ` does not re-evaluate the model there.
#[derive(Debug)]
pub struct WeightedResiduals<'a, M: CurveModel> {
    pub model: &'a M,
    pub y: &'a Array1<f64>,
    pub weights: &'a Weights,
    pub scheme: DiffScheme,
    max_nfev: Option<usize>,
    evaluations: Cell<usize>,
    last: RefCell<Option<(Theta, Residuals)>>,
}

impl<'a, M: CurveModel> WeightedResiduals<'a, M> {
    /// Construct a new adapter over a model, its observed responses, and the
    /// per-observation weights for this solve. The adapter is unmetered until
    /// [`with_budget`](Self::with_budget) caps it.
    pub fn new(model: &'a M, y: &'a Array1<f64>, weights: &'a Weights, scheme: DiffScheme) -> Self {
        Self {
            model,
            y,
            weights,
            scheme,
            max_nfev: None,
            evaluations: Cell::new(0),
            last: RefCell::new(None),
        }
    }

    /// Cap the number of model evaluations this adapter will perform.
    pub fn with_budget(mut self, max_nfev: usize) -> Self {
        self.max_nfev = Some(max_nfev);
        self
    }

    /// Number of observations `n`.
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Evaluate the weighted residuals `w ⊙ (y − f(θ))`.
    ///
    /// Non-finite predictions produce non-finite residuals; they are left for
    /// the solver to reject as an unattractive step.
    ///
    /// # Errors
    /// - Any `OptError` raised by the model.
    /// - [`OptError::PredictionLengthMismatch`] if `f(θ)` has the wrong length.
    /// - [`OptError::BudgetExhausted`] if the evaluation budget is spent.
    pub fn residuals(&self, theta: &Theta) -> OptResult<Residuals> {
        self.charge()?;
        let pred = self.model.predict(theta)?;
        validate_predictions(&pred, self.n_obs())?;
        let r = (self.y - &pred) * self.weights;
        self.last.replace(Some((theta.clone(), r.clone())));
        Ok(r)
    }

    /// Evaluate the `n × p` Jacobian of the weighted residuals.
    ///
    /// Behavior:
    /// - If the model implements `jacobian`, validate it and return
    ///   `−diag(w) · ∂f/∂θ`.
    /// - Otherwise finite-difference the residual map with the configured
    ///   [`DiffScheme`], reusing cached residuals at `θ` when available.
    ///
    /// # Errors
    /// - Propagates model errors other than `JacobianNotImplemented`.
    /// - Returns validation errors for wrong shapes or non-finite entries.
    /// - [`OptError::BudgetExhausted`] if the budget runs out, possibly
    ///   part-way through a finite-difference Jacobian.
    pub fn residual_jacobian(&self, theta: &Theta) -> OptResult<Jacobian> {
        let dim = theta.len();
        self.ensure_budget()?;
        match self.model.jacobian(theta) {
            Ok(mut jac) => {
                self.evaluations.set(self.evaluations.get() + 1);
                validate_jacobian(&jac, self.n_obs(), dim)?;
                for (mut row, &w) in jac.axis_iter_mut(Axis(0)).zip(self.weights.iter()) {
                    row *= -w;
                }
                Ok(jac)
            }
            Err(OptError::JacobianNotImplemented) => {
                let r0 = match self.cached_residuals(theta) {
                    Some(r) => r,
                    None => self.residuals(theta)?,
                };
                compute_jacobian(theta, &r0, self.scheme, &|t: &Theta| self.residuals(t))
            }
            Err(e) => Err(e),
        }
    }

    fn ensure_budget(&self) -> OptResult<()> {
        match self.max_nfev {
            Some(max_nfev) if self.evaluations.get() >= max_nfev => {
                Err(OptError::BudgetExhausted { max_nfev })
            }
            _ => Ok(()),
        }
    }

    fn charge(&self) -> OptResult<()> {
        self.ensure_budget()?;
        self.evaluations.set(self.evaluations.get() + 1);
        Ok(())
    }

    fn cached_residuals(&self, theta: &Theta) -> Option<Residuals> {
        match self.last.borrow().as_ref() {
            Some((t, r)) if t == theta => Some(r.clone()),
            _ => None,
        }
    }
}

impl<'a, M: CurveModel> EvaluationBudget for WeightedResiduals<'a, M> {
    fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    fn remaining(&self) -> Option<usize> {
        self.max_nfev.map(|max_nfev| max_nfev.saturating_sub(self.evaluations.get()))
    }
}

impl<'a, M: CurveModel> Operator for WeightedResiduals<'a, M> {
    type Param = Theta;
    type Output = Residuals;

    fn apply(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.residuals(theta)?)
    }
}

impl<'a, M: CurveModel> ArgminJacobian for WeightedResiduals<'a, M> {
    type Param = Theta;
    type Jacobian = Jacobian;

    fn jacobian(&self, theta: &Self::Param) -> Result<Self::Jacobian, Error> {
        Ok(self.residual_jacobian(theta)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    struct Line {
        x: Array1<f64>,
        analytic: bool,
    }

    impl CurveModel for Line {
        fn predict(&self, theta: &Theta) -> OptResult<Array1<f64>> {
            Ok(self.x.mapv(|v| theta[0] + theta[1] * v))
        }

        fn jacobian(&self, _theta: &Theta) -> OptResult<Jacobian> {
            if !self.analytic {
                return Err(OptError::JacobianNotImplemented);
            }
            let mut jac = Jacobian::ones((self.x.len(), 2));
            jac.column_mut(1).assign(&self.x);
            Ok(jac)
        }
    }

    #[test]
    // Purpose
    // -------
    // Residuals are `w ⊙ (y − f(θ))`, with the weight multiplying the residual.
    //
    // Given
    // -----
    // - `f(θ) = θ0 + θ1 x`, `x = [0, 1, 2]`, `y = [1, 3, 7]`, `θ = (1, 2)`,
    //   `w = [1, 2, 0.5]`.
    //
    // Expect
    // ------
    // - `r = [0, 0, 1]`.
    fn residuals_apply_weights_to_differences() {
        // Arrange
        let model = Line { x: array![0.0, 1.0, 2.0], analytic: true };
        let y = array![1.0, 3.0, 7.0];
        let w = array![1.0, 2.0, 0.5];
        let problem = WeightedResiduals::new(&model, &y, &w, DiffScheme::Forward);

        // Act
        let r = problem.residuals(&array![1.0, 2.0]).unwrap();

        // Assert
        assert_eq!(r, array![0.0, 0.0, 1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Analytic and finite-difference residual Jacobians agree, including the
    // `−diag(w)` scaling.
    //
    // Expect
    // ------
    // - Row k equals `−w_k · [1, x_k]` in both branches.
    fn analytic_and_numeric_jacobians_agree() {
        // Arrange
        let y = array![1.0, 3.0, 7.0];
        let w = array![1.0, 2.0, 0.5];
        let theta = array![1.0, 2.0];
        let analytic = Line { x: array![0.0, 1.0, 2.0], analytic: true };
        let numeric = Line { x: array![0.0, 1.0, 2.0], analytic: false };

        // Act
        let ja = WeightedResiduals::new(&analytic, &y, &w, DiffScheme::Forward)
            .residual_jacobian(&theta)
            .unwrap();
        let jn = WeightedResiduals::new(&numeric, &y, &w, DiffScheme::Central)
            .residual_jacobian(&theta)
            .unwrap();

        // Assert
        assert_eq!(ja, array![[-1.0, 0.0], [-2.0, -2.0], [-0.5, -1.0]]);
        for ((i, j), &e) in ja.indexed_iter() {
            assert_abs_diff_eq!(jn[[i, j]], e, epsilon = 1e-7);
        }
    }

    #[test]
    // Purpose
    // -------
    // A model returning the wrong number of predictions is rejected.
    fn wrong_prediction_length_is_rejected() {
        let model = Line { x: array![0.0, 1.0], analytic: true };
        let y = array![1.0, 3.0, 7.0];
        let w = array![1.0, 1.0, 1.0];
        let problem = WeightedResiduals::new(&model, &y, &w, DiffScheme::Forward);

        let err = problem.residuals(&array![1.0, 2.0]).unwrap_err();

        assert_eq!(err, OptError::PredictionLengthMismatch { expected: 3, found: 2 });
    }

    #[test]
    // Purpose
    // -------
    // Finite-difference columns are charged like any other residual
    // evaluation, while the residuals at `θ` are reused from the cache.
    //
    // Given
    // -----
    // - The line model without an analytic Jacobian, `p = 2`, budget 10.
    // - One residual evaluation at `θ`, then a forward Jacobian at `θ`.
    //
    // Expect
    // ------
    // - 1 evaluation after the residuals, 3 after the Jacobian, 7 remaining.
    fn forward_difference_columns_are_charged() {
        // Arrange
        let model = Line { x: array![0.0, 1.0, 2.0], analytic: false };
        let y = array![1.0, 3.0, 7.0];
        let w = array![1.0, 1.0, 1.0];
        let theta = array![1.0, 2.0];
        let problem = WeightedResiduals::new(&model, &y, &w, DiffScheme::Forward).with_budget(10);

        // Act
        problem.residuals(&theta).unwrap();
        let after_residuals = problem.evaluations();
        problem.residual_jacobian(&theta).unwrap();

        // Assert
        assert_eq!(after_residuals, 1);
        assert_eq!(problem.evaluations(), 3);
        assert_eq!(problem.remaining(), Some(7));
    }

    #[test]
    // Purpose
    // -------
    // An analytic Jacobian costs one unit, and a spent budget refuses any
    // further model call.
    //
    // Given
    // -----
    // - The analytic line model with a budget of 2.
    //
    // Expect
    // ------
    // - Residuals and Jacobian both succeed, spending the budget.
    // - The next residual evaluation fails with `BudgetExhausted`.
    fn spent_budget_refuses_further_evaluations() {
        // Arrange
        let model = Line { x: array![0.0, 1.0, 2.0], analytic: true };
        let y = array![1.0, 3.0, 7.0];
        let w = array![1.0, 1.0, 1.0];
        let theta = array![1.0, 2.0];
        let problem = WeightedResiduals::new(&model, &y, &w, DiffScheme::Central).with_budget(2);

        // Act
        problem.residuals(&theta).unwrap();
        problem.residual_jacobian(&theta).unwrap();
        let err = problem.residuals(&theta).unwrap_err();

        // Assert
        assert_eq!(problem.evaluations(), 2);
        assert_eq!(err, OptError::BudgetExhausted { max_nfev: 2 });
    }

    #[test]
    // Purpose
    // -------
    // A central Jacobian that does not fit in the remaining budget stops
    // part-way instead of overrunning it.
    //
    // Given
    // -----
    // - The line model without an analytic Jacobian, central differences
    //   (`2p = 4` evaluations), budget 3.
    //
    // Expect
    // ------
    // - `BudgetExhausted` and exactly 3 evaluations spent.
    fn finite_difference_jacobian_stops_at_the_budget() {
        let model = Line { x: array![0.0, 1.0, 2.0], analytic: false };
        let y = array![1.0, 3.0, 7.0];
        let w = array![1.0, 1.0, 1.0];
        let problem = WeightedResiduals::new(&model, &y, &w, DiffScheme::Central).with_budget(3);

        let err = problem.residual_jacobian(&array![1.0, 2.0]).unwrap_err();

        assert_eq!(err, OptError::BudgetExhausted { max_nfev: 3 });
        assert_eq!(problem.evaluations(), 3);
    }
}
