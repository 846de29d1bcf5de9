#[cfg(feature = "python-bindings")]
use ndarray::{Array2, Axis};

#[cfg(feature = "python-bindings")]
use pyo3::{
    prelude::*,
    types::{PyAny, PyDict},
};

#[cfg(feature = "python-bindings")]
use crate::{
    mupe::{
        data::Drivers,
        model::ModelFunction,
        options::MupeOptions,
        params::ParamView,
    },
    optimization::{
        errors::{OptError, OptResult},
        least_squares::{DiffScheme, LMOptions, Predictions, Tolerances},
    },
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy driver values into an `n × k` matrix.
///
/// Accepts 2-D arrays (and DataFrames via `to_numpy`) as-is; any 1-D input
/// accepted by [`extract_f64_array`] becomes a single column.
#[cfg(feature = "python-bindings")]
pub fn extract_drivers<'py>(py: Python<'py>, raw_x: &Bound<'py, PyAny>) -> PyResult<Drivers> {
    if let Ok(arr) = raw_x.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }
    if let Ok(obj) = raw_x.call_method("to_numpy", (false,), None) {
        if let Ok(arr) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(arr.as_array().to_owned());
        }
    }
    let column = extract_f64_array(py, raw_x)?;
    Ok(column.as_array().to_owned().insert_axis(Axis(1)))
}

/// Parse the starting specification: a sequence of `(name, value)` pairs or a
/// mapping `{name: value}` (in iteration order).
#[cfg(feature = "python-bindings")]
pub fn extract_start<'py>(raw_start: &Bound<'py, PyAny>) -> PyResult<Vec<(String, f64)>> {
    if let Ok(dict) = raw_start.downcast::<PyDict>() {
        return dict
            .iter()
            .map(|(k, v)| Ok((k.extract::<String>()?, v.extract::<f64>()?)))
            .collect();
    }
    raw_start.extract::<Vec<(String, f64)>>().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "start must be a sequence of (name, value) pairs or a dict of floats",
        )
    })
}

#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_mupe_options(
    max_iter: usize, max_nfev: usize, atol: f64, rtol: f64, ftol: Option<f64>,
    xtol: Option<f64>, gtol: Option<f64>, diff_scheme: Option<&str>, verbose: bool,
) -> PyResult<MupeOptions> {
    let defaults = Tolerances::default();
    let tols = Tolerances::new(
        ftol.unwrap_or(defaults.ftol),
        xtol.unwrap_or(defaults.xtol),
        gtol.unwrap_or(defaults.gtol),
    )?;
    let scheme = match diff_scheme {
        Some(name) => name.parse::<DiffScheme>()?,
        None => DiffScheme::Forward,
    };
    let lm_defaults = LMOptions::default();
    let lm = LMOptions::new(tols, scheme, lm_defaults.max_nfev, lm_defaults.damping_scale, verbose)?;
    Ok(MupeOptions::new(max_iter, max_nfev, atol, rtol, lm)?)
}

/// A Python callable used as a [`ModelFunction`], invoked as
/// `func(X, **params)` with the caller's original `X` object.
#[cfg(feature = "python-bindings")]
pub struct PyModel {
    func: Py<PyAny>,
    x: Py<PyAny>,
}

#[cfg(feature = "python-bindings")]
impl PyModel {
    pub fn new(func: Py<PyAny>, x: Py<PyAny>) -> Self {
        Self { func, x }
    }
}

#[cfg(feature = "python-bindings")]
impl ModelFunction for PyModel {
    fn evaluate(&self, _x: &Drivers, params: &ParamView<'_>) -> OptResult<Predictions> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new(py);
            for (name, value) in params.iter() {
                kwargs.set_item(name, value).map_err(model_error)?;
            }
            let out = self.func.bind(py).call((self.x.bind(py),), Some(&kwargs)).map_err(model_error)?;
            let pred = extract_f64_array(py, &out).map_err(model_error)?;
            Ok(pred.as_array().to_owned())
        })
    }
}

#[cfg(feature = "python-bindings")]
fn model_error(err: PyErr) -> OptError {
    OptError::ModelEvaluation { text: err.to_string() }
}

#[cfg(feature = "python-bindings")]
pub fn to_nested(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}
