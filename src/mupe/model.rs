//! mupe::model — user model functions and their bridge to the solver.
//!
//! Purpose
//! -------
//! A model maps driver values and named parameters to one prediction per
//! observation: `(X, params) ↦ f(X; params)`. [`ModelFunction`] is the trait
//! callers implement (or obtain from a closure via [`FnModel`]);
//! [`NamedModel`] binds a model to its drivers and parameter names so the
//! positional solver can evaluate it as a [`CurveModel`].
//!
//! Conventions
//! -----------
//! - Models are expected to be pure and callable with any parameter vector
//!   the solver proposes. Failures are reported as [`OptError`] values
//!   (typically [`OptError::ModelEvaluation`]) and abort the fit.
//! - An analytic Jacobian is optional; without one the solver falls back to
//!   finite differences.
use crate::{
    mupe::{data::Drivers, params::ParamView, params::ParameterNames},
    optimization::{
        errors::{OptError, OptResult},
        least_squares::{CurveModel, Jacobian, Predictions, Theta},
    },
};

/// A nonlinear model `f(X; θ)` with named parameters.
pub trait ModelFunction {
    /// Predicted responses for every row of `x`.
    ///
    /// # Errors
    /// Any [`OptError`]; returning one aborts the fit.
    fn evaluate(&self, x: &Drivers, params: &ParamView<'_>) -> OptResult<Predictions>;

    /// Analytic `n × p` Jacobian `∂f/∂θ`, columns in parameter order.
    ///
    /// Defaults to [`OptError::JacobianNotImplemented`], which selects finite
    /// differences.
    fn jacobian(&self, _x: &Drivers, _params: &ParamView<'_>) -> OptResult<Jacobian> {
        Err(OptError::JacobianNotImplemented)
    }
}

/// Adapts a closure `Fn(&Drivers, &ParamView) -> OptResult<Predictions>` into
/// a [`ModelFunction`].
///
/// ```
/// use mupe_regression::mupe::{data::Drivers, model::FnModel, params::ParamView};
///
/// let power = FnModel::new(|x: &Drivers, p: &ParamView<'_>| {
///     let (a, b) = (p.get("a")?, p.get("b")?);
///     Ok(x.column(0).mapv(|v| a * v.powf(b)))
/// });
/// # let _ = &power;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnModel<F> {
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(&Drivers, &ParamView<'_>) -> OptResult<Predictions>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ModelFunction for FnModel<F>
where
    F: Fn(&Drivers, &ParamView<'_>) -> OptResult<Predictions>,
{
    fn evaluate(&self, x: &Drivers, params: &ParamView<'_>) -> OptResult<Predictions> {
        (self.f)(x, params)
    }
}

impl<T: ModelFunction + ?Sized> ModelFunction for &T {
    fn evaluate(&self, x: &Drivers, params: &ParamView<'_>) -> OptResult<Predictions> {
        (**self).evaluate(x, params)
    }

    fn jacobian(&self, x: &Drivers, params: &ParamView<'_>) -> OptResult<Jacobian> {
        (**self).jacobian(x, params)
    }
}

/// A [`ModelFunction`] bound to its drivers and parameter names, evaluated
/// positionally by the solver.
#[derive(Debug)]
pub struct NamedModel<'a, F: ?Sized> {
    model: &'a F,
    x: &'a Drivers,
    names: &'a ParameterNames,
}

impl<'a, F: ModelFunction + ?Sized> NamedModel<'a, F> {
    pub fn new(model: &'a F, x: &'a Drivers, names: &'a ParameterNames) -> Self {
        Self { model, x, names }
    }
}

impl<'a, F: ModelFunction + ?Sized> CurveModel for NamedModel<'a, F> {
    fn predict(&self, theta: &Theta) -> OptResult<Predictions> {
        self.model.evaluate(self.x, &ParamView::new(self.names, theta))
    }

    fn jacobian(&self, theta: &Theta) -> OptResult<Jacobian> {
        self.model.jacobian(self.x, &ParamView::new(self.names, theta))
    }
}
