//! mupe_regression — MUPE estimation of multiplicative-error nonlinear models.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the estimator to Python via the `_mupe_regression` extension module. When
//! the `python-bindings` feature is enabled, this module defines the
//! Python-facing function and result class used by the `mupe_regression`
//! package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: `mupe` (the IRLS driver) and
//!   `optimization` (the budgeted weighted least-squares solver).
//! - Define the `mupe_nonlinear` `#[pyfunction]`, the `MupeFit` `#[pyclass]`,
//!   and the `#[pymodule]` initializer for the `_mupe_regression` extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue, input conversion, and error mapping.
//! - Python model callables are invoked as `func(X, **params)` with the
//!   caller's original `X` object and must return one float per observation.
//!
//! Conventions
//! -----------
//! - Errors from core Rust code are propagated as rich error types internally
//!   and converted to `PyErr` values at the PyO3 boundary: configuration and
//!   weight-domain errors raise `ValueError`, model failures `RuntimeError`.
//!
//! Testing notes
//! -------------
//! - Core numerical behavior is covered by unit tests in the inner modules and
//!   by the integration tests under `tests/`.

pub mod mupe;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    mupe::{
        data::ObservationSet, irls::MupeEstimator, params::ParameterVector, result::MupeResult,
    },
    utils::{PyModel, build_mupe_options, extract_drivers, extract_f64_array, extract_start, to_nested},
};

/// MupeFit — Python-facing view of a finished MUPE fit.
///
/// Purpose
/// -------
/// Hold a [`MupeResult`] and expose its fields as read-only Python
/// properties. The `start` and `mupe_iters` properties keep the names of the
/// classic dictionary result.
///
/// Notes
/// -----
/// - `mupe_iters` is the 0-based index of the final outer iteration; a value
///   of `max_iter - 1` together with `converged == False` signals that the
///   cap was hit.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "mupe_regression.estimators")]
pub struct MupeFit {
    inner: MupeResult,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl MupeFit {
    /// Fitted parameters as `(name, value)` pairs in `start` order.
    #[getter]
    pub fn best_values(&self) -> Vec<(String, f64)> {
        self.inner.fitted.to_pairs()
    }

    /// Starting specification as passed in.
    #[getter]
    pub fn start(&self) -> Vec<(String, f64)> {
        self.inner.start.to_pairs()
    }

    #[getter]
    pub fn mupe_iters(&self) -> usize {
        self.inner.iterations
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    /// Predictions of the final fit, one per observation.
    #[getter]
    pub fn best_fit(&self) -> Vec<f64> {
        self.inner.outcome.best_fit.to_vec()
    }

    /// Weights used in the final solve.
    #[getter]
    pub fn weights(&self) -> Vec<f64> {
        self.inner.weights.to_vec()
    }

    #[getter]
    pub fn residual(&self) -> Vec<f64> {
        self.inner.outcome.residuals.to_vec()
    }

    #[getter]
    pub fn chisqr(&self) -> f64 {
        self.inner.statistics.chisqr
    }

    #[getter]
    pub fn redchi(&self) -> f64 {
        self.inner.statistics.redchi
    }

    #[getter]
    pub fn aic(&self) -> f64 {
        self.inner.statistics.aic
    }

    #[getter]
    pub fn bic(&self) -> f64 {
        self.inner.statistics.bic
    }

    #[getter]
    pub fn nfree(&self) -> usize {
        self.inner.statistics.nfree
    }

    /// Standard errors in `start` order, or `None` if the covariance could not
    /// be estimated.
    #[getter]
    pub fn stderr(&self) -> Option<Vec<f64>> {
        self.inner.statistics.stderr.as_ref().map(|se| se.to_vec())
    }

    #[getter]
    pub fn covar(&self) -> Option<Vec<Vec<f64>>> {
        self.inner.statistics.covariance.as_ref().map(to_nested)
    }

    /// Termination message of the final inner solve.
    #[getter]
    pub fn status(&self) -> String {
        self.inner.outcome.status.clone()
    }

    #[getter]
    pub fn nfev(&self) -> usize {
        self.inner.outcome.nfev
    }

    fn __repr__(&self) -> String {
        let values = self
            .inner
            .fitted
            .iter()
            .map(|(name, value)| format!("{name}={value:.6}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "MupeFit({values}, mupe_iters={}, converged={})",
            self.inner.iterations,
            if self.inner.converged { "True" } else { "False" }
        )
    }
}

/// mupe_nonlinear — fit a nonlinear multiplicative-error model by MUPE.
///
/// Parameters
/// ----------
/// - `func`: callable
///   Model form, invoked as `func(X, **params)`; must return a sequence of
///   floats of length `len(y)`.
/// - `y`: 1-D array-like
///   Response values.
/// - `X`: 1-D or 2-D array-like
///   Driver values, one row per observation.
/// - `start`: sequence of `(name, value)` pairs or dict
///   Initial guess. Parameter names must match the keyword arguments of
///   `func`; their order fixes the parameter order of the fit.
/// - `max_iter`, `max_nfev`, `atol`, `rtol`:
///   Outer-loop cap, per-solve evaluation budget, and convergence tolerances.
/// - `ftol`, `xtol`, `gtol`, `diff_scheme`, `verbose`:
///   Inner Levenberg–Marquardt settings.
///
/// Returns
/// -------
/// `MupeFit`
///
/// Errors
/// ------
/// - `ValueError` for malformed inputs or a non-positive prediction.
/// - `RuntimeError` if `func` raises or returns something unusable.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    name = "mupe_nonlinear",
    text_signature = "(func, y, X, start, /, max_iter=200, max_nfev=10, atol=1e-8, rtol=1e-5, \
                      ftol=None, xtol=None, gtol=None, diff_scheme=None, verbose=False)",
    signature = (
        func, y, X, start, max_iter = 200, max_nfev = 10, atol = 1e-8, rtol = 1e-5,
        ftol = None, xtol = None, gtol = None, diff_scheme = None, verbose = false
    )
)]
#[allow(non_snake_case, clippy::too_many_arguments)]
fn py_mupe_nonlinear<'py>(
    py: Python<'py>, func: &Bound<'py, PyAny>, y: &Bound<'py, PyAny>, X: &Bound<'py, PyAny>,
    start: &Bound<'py, PyAny>, max_iter: usize, max_nfev: usize, atol: f64, rtol: f64,
    ftol: Option<f64>, xtol: Option<f64>, gtol: Option<f64>, diff_scheme: Option<&str>,
    verbose: bool,
) -> PyResult<MupeFit> {
    if !func.is_callable() {
        return Err(pyo3::exceptions::PyTypeError::new_err("func must be callable"));
    }
    let start = ParameterVector::from_pairs(extract_start(start)?)?;
    let y_arr = extract_f64_array(py, y)?.as_array().to_owned();
    let data = ObservationSet::new(y_arr, extract_drivers(py, X)?)?;
    let opts = build_mupe_options(
        max_iter, max_nfev, atol, rtol, ftol, xtol, gtol, diff_scheme, verbose,
    )?;
    #[cfg(feature = "obs_slog")]
    let opts = if verbose { opts.with_logger(crate::mupe::options::terminal_logger()) } else { opts };

    let model = PyModel::new(func.clone().unbind(), X.clone().unbind());
    let inner = MupeEstimator::new(opts).fit(&model, &data, &start)?;
    Ok(MupeFit { inner })
}

/// _mupe_regression — PyO3 module initializer for the Python extension.
///
/// Purpose
/// -------
/// Define the `_mupe_regression` Python module and register its `estimators`
/// submodule used by the public `mupe_regression` package.
///
/// Notes
/// -----
/// - This function is invoked automatically by Python when importing the
///   compiled extension; it is not called directly by user code.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _mupe_regression<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let estimators_mod = PyModule::new(_py, "estimators")?;
    estimators(_py, m, &estimators_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("mupe_regression.estimators", estimators_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn estimators<'py>(
    _py: Python, mupe_regression: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_mupe_nonlinear, m)?)?;
    m.add_class::<MupeFit>()?;
    mupe_regression.add_submodule(m)?;
    Ok(())
}
