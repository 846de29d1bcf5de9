//! High-level entry points for weighted nonlinear least squares.
//!
//! [`LmLeastSquares`] is the crate's default implementation of the
//! [`LeastSquaresSolver`] contract; [`least_squares`] is a one-shot
//! convenience wrapper for standalone fits.
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        adapter::WeightedResiduals,
        builders::build_levenberg_marquardt,
        run::run_levenberg_marquardt,
        traits::{CurveModel, FitOutcome, LMOptions, LeastSquaresSolver},
        types::{Theta, Weights},
        validation::validate_problem,
    },
};
use ndarray::Array1;

/// Levenberg–Marquardt implementation of [`LeastSquaresSolver`].
///
/// Holds the solver options; the evaluation budget is supplied per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LmLeastSquares {
    pub opts: LMOptions,
}

impl LmLeastSquares {
    pub fn new(opts: LMOptions) -> Self {
        Self { opts }
    }
}

impl LeastSquaresSolver for LmLeastSquares {
    /// Validate the inputs, build a budgeted solver, and run it.
    ///
    /// # Errors
    /// - `OptError::EmptyData`, `DataLengthMismatch`, `EmptyTheta`,
    ///   `NonFiniteTheta` for malformed inputs.
    /// - `OptError::InvalidMaxNfev` if `max_nfev < 2`.
    /// - Any model error raised during the solve.
    fn solve<M: CurveModel>(
        &self, model: &M, y: &Array1<f64>, theta0: Theta, weights: &Weights, max_nfev: usize,
    ) -> OptResult<FitOutcome> {
        validate_problem(y.len(), weights, &theta0)?;
        let solver = build_levenberg_marquardt(&self.opts, max_nfev)?;
        let problem = WeightedResiduals::new(model, y, weights, self.opts.diff_scheme);
        run_levenberg_marquardt(theta0, &self.opts, problem, solver)
    }
}

/// Fit `model` to `y` by (weighted) nonlinear least squares.
///
/// # Behavior
/// - Uses unit weights when `weights` is `None`.
/// - Makes at most `opts.max_nfev` model evaluations, finite-difference
///   columns included.
///
/// # Example
/// ```
/// use ndarray::{Array1, array};
/// use mupe_regression::optimization::{
///     errors::OptResult,
///     least_squares::{CurveModel, LMOptions, Theta, least_squares},
/// };
///
/// struct Exp { x: Array1<f64> }
/// impl CurveModel for Exp {
///     fn predict(&self, theta: &Theta) -> OptResult<Array1<f64>> {
///         Ok(self.x.mapv(|v| theta[0] * (theta[1] * v).exp()))
///     }
/// }
///
/// let model = Exp { x: array![0.0, 1.0, 2.0, 3.0] };
/// let y = model.predict(&array![1.5, 0.3])?;
/// let out = least_squares(&model, &y, array![1.0, 0.1], None, &LMOptions::default())?;
/// assert!((out.theta_hat[0] - 1.5).abs() < 1e-6);
/// assert!((out.theta_hat[1] - 0.3).abs() < 1e-6);
/// # Ok::<(), mupe_regression::optimization::errors::OptError>(())
/// ```
pub fn least_squares<M: CurveModel>(
    model: &M, y: &Array1<f64>, theta0: Theta, weights: Option<&Weights>, opts: &LMOptions,
) -> OptResult<FitOutcome> {
    let unit;
    let weights = match weights {
        Some(w) => w,
        None => {
            unit = Weights::ones(y.len());
            &unit
        }
    };
    LmLeastSquares::new(opts.clone()).solve(model, y, theta0, weights, opts.max_nfev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        least_squares::{levenberg_marquardt::BUDGET_EXHAUSTED, traits::DiffScheme},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Recovery of known parameters on noiseless nonlinear problems.
    // - The hard evaluation budget and its soft-stop reporting.
    // - Weighting semantics and error propagation from the model.
    //
    // They intentionally DO NOT cover:
    // - IRLS reweighting, which is tested in the `mupe` layer.
    // -------------------------------------------------------------------------

    struct Power {
        x: Array1<f64>,
    }

    impl CurveModel for Power {
        fn predict(&self, theta: &Theta) -> OptResult<Array1<f64>> {
            Ok(self.x.mapv(|v| theta[0] * v.powf(theta[1])))
        }
    }

    struct Failing;

    impl CurveModel for Failing {
        fn predict(&self, _theta: &Theta) -> OptResult<Array1<f64>> {
            Err(OptError::ModelEvaluation { text: "domain error".to_string() })
        }
    }

    #[test]
    // Purpose
    // -------
    // With an ample budget the solver recovers the generating parameters of a
    // noiseless power law.
    //
    // Given
    // -----
    // - `f(x; a, b) = a·x^b`, `x = [1, 4, 9, 16, 25]`, truth `(2, 0.5)`.
    // - Start `(1, 1)`, default options.
    //
    // Expect
    // ------
    // - `θ̂ ≈ (2, 0.5)`, `converged == true`, `χ² ≈ 0`.
    fn recovers_noiseless_power_law() {
        // Arrange
        let model = Power { x: array![1.0, 4.0, 9.0, 16.0, 25.0] };
        let y = model.predict(&array![2.0, 0.5]).unwrap();

        // Act
        let out =
            least_squares(&model, &y, array![1.0, 1.0], None, &LMOptions::default()).unwrap();

        // Assert
        assert!(out.converged, "status: {}", out.status);
        assert_abs_diff_eq!(out.theta_hat[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.theta_hat[1], 0.5, epsilon = 1e-6);
        assert!(out.chisqr < 1e-12);
        assert_eq!(out.best_fit.len(), 5);
    }

    /// Power law that counts every call into the model.
    struct CountingPower {
        x: Array1<f64>,
        calls: Cell<usize>,
    }

    impl CurveModel for CountingPower {
        fn predict(&self, theta: &Theta) -> OptResult<Array1<f64>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.x.mapv(|v| theta[0] * v.powf(theta[1])))
        }
    }

    #[test]
    // Purpose
    // -------
    // The evaluation budget is a hard cap on model calls, finite-difference
    // columns included, and exhausting it is not an error.
    //
    // Given
    // -----
    // - The power-law problem without an analytic Jacobian (`p = 2`, forward
    //   differences) and a budget of 4 evaluations.
    //
    // Expect
    // ------
    // - `nfev ≤ 4`, and the model saw exactly `nfev` calls plus the one
    //   uncharged evaluation behind `best_fit`.
    // - `converged == false`, budget status message, and a cost no worse
    //   than at the start.
    fn budget_caps_evaluations_and_soft_stops() {
        // Arrange
        let x = array![1.0, 4.0, 9.0, 16.0, 25.0];
        let y = x.mapv(|v: f64| 2.0 * v.sqrt());
        let model = CountingPower { x, calls: Cell::new(0) };
        let w = Weights::ones(5);
        let theta0 = array![1.0, 1.0];
        let start_cost = {
            let r = &y - &model.predict(&theta0).unwrap();
            r.dot(&r)
        };
        model.calls.set(0);

        // Act
        let out = LmLeastSquares::default().solve(&model, &y, theta0, &w, 4).unwrap();

        // Assert
        assert!(out.nfev <= 4, "nfev={}", out.nfev);
        assert_eq!(model.calls.get(), out.nfev + 1);
        assert!(!out.converged);
        assert_eq!(out.status, BUDGET_EXHAUSTED);
        assert!(out.chisqr <= start_cost);
    }

    #[test]
    // Purpose
    // -------
    // Central differences cost two model calls per column and still respect
    // the cap, for every budget from the floor upwards.
    //
    // Given
    // -----
    // - The counting power law, `diff_scheme = Central`, budgets 2 through 12.
    //
    // Expect
    // ------
    // - Model calls during the solve never exceed the budget.
    fn central_differences_respect_every_budget() {
        let x = array![1.0, 4.0, 9.0, 16.0, 25.0];
        let y = x.mapv(|v: f64| 2.0 * v.sqrt());
        let w = Weights::ones(5);
        let opts = LMOptions { diff_scheme: DiffScheme::Central, ..LMOptions::default() };

        for budget in 2..=12 {
            let model = CountingPower { x: x.clone(), calls: Cell::new(0) };

            let out = LmLeastSquares::new(opts.clone())
                .solve(&model, &y, array![1.0, 1.0], &w, budget)
                .unwrap();

            assert!(model.calls.get() - 1 <= budget, "budget {budget}: {} calls", model.calls.get());
            assert_eq!(model.calls.get() - 1, out.nfev);
        }
    }

    #[test]
    // Purpose
    // -------
    // Starting exactly at a zero-residual solution terminates immediately
    // without moving θ.
    //
    // Expect
    // ------
    // - `θ̂` equals `θ₀` bit for bit and the solver reports convergence.
    // - Only the starting residuals and the two forward-difference columns
    //   were charged.
    fn zero_residual_start_is_a_fixed_point() {
        let model = Power { x: array![1.0, 2.0, 3.0] };
        let theta0 = array![3.0, 1.5];
        let y = model.predict(&theta0).unwrap();

        let out = LmLeastSquares::default()
            .solve(&model, &y, theta0.clone(), &Weights::ones(3), 10)
            .unwrap();

        assert!(out.converged);
        assert_eq!(out.theta_hat, theta0);
        assert_eq!(out.nfev, 3);
    }

    #[test]
    // Purpose
    // -------
    // Weights multiply residuals: a zero weight removes an observation.
    //
    // Given
    // -----
    // - A straight line through three points plus one outlier with weight 0.
    //
    // Expect
    // ------
    // - The fit ignores the outlier and recovers the line exactly.
    fn zero_weight_excludes_observation() {
        struct Line {
            x: Array1<f64>,
        }
        impl CurveModel for Line {
            fn predict(&self, theta: &Theta) -> OptResult<Array1<f64>> {
                Ok(self.x.mapv(|v| theta[0] + theta[1] * v))
            }
        }
        let model = Line { x: array![0.0, 1.0, 2.0, 3.0] };
        let y = array![1.0, 3.0, 5.0, 100.0];
        let w = array![1.0, 1.0, 1.0, 0.0];

        let out = least_squares(&model, &y, array![0.0, 0.0], Some(&w), &LMOptions::default())
            .unwrap();

        assert_abs_diff_eq!(out.theta_hat[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.theta_hat[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Model failures abort the solve and surface as the model's own error.
    fn model_errors_propagate_unchanged() {
        let y = array![1.0, 2.0];

        let err = least_squares(&Failing, &y, array![1.0], None, &LMOptions::default())
            .unwrap_err();

        assert_eq!(err, OptError::ModelEvaluation { text: "domain error".to_string() });
    }

    #[test]
    // Purpose
    // -------
    // Mismatched weights are rejected before any model evaluation.
    fn mismatched_weights_are_rejected() {
        let y = array![1.0, 2.0];
        let w = array![1.0];

        let err = LmLeastSquares::default().solve(&Failing, &y, array![1.0], &w, 10).unwrap_err();

        assert_eq!(err, OptError::DataLengthMismatch { observations: 2, weights: 1 });
    }
}
