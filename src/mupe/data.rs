//! Observed responses and driver values for one MUPE fit.
use crate::mupe::errors::{IrlsResult, MupeError};
use ndarray::{Array1, Array2, Axis};

/// Driver matrix `X`: one row per observation, one column per driver.
pub type Drivers = Array2<f64>;

/// Parallel response (`y`, length n) and driver (`X`, n × k) values.
///
/// Invariants
/// ----------
/// - `n ≥ 1` and `X.nrows() == n`.
/// - Every entry of `y` and `X` is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    y: Array1<f64>,
    x: Drivers,
}

impl ObservationSet {
    /// Validate and bundle `y` and `X`.
    ///
    /// # Errors
    /// - [`MupeError::EmptyObservations`] if `y` is empty.
    /// - [`MupeError::LengthMismatch`] if `X` does not have one row per
    ///   observation.
    /// - [`MupeError::NonFiniteData`] for a NaN/±inf in `y` or `X`.
    pub fn new(y: Array1<f64>, x: Drivers) -> IrlsResult<Self> {
        if y.is_empty() {
            return Err(MupeError::EmptyObservations);
        }
        if x.nrows() != y.len() {
            return Err(MupeError::LengthMismatch { observations: y.len(), drivers: x.nrows() });
        }
        if let Some((index, &value)) = y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(MupeError::NonFiniteData { series: "y", index, value });
        }
        if let Some(((row, _), &value)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MupeError::NonFiniteData { series: "X", index: row, value });
        }
        Ok(Self { y, x })
    }

    /// Single-driver convenience: `x` becomes an `n × 1` matrix.
    pub fn from_columns(y: Array1<f64>, x: Array1<f64>) -> IrlsResult<Self> {
        Self::new(y, x.insert_axis(Axis(1)))
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn x(&self) -> &Drivers {
        &self.x
    }

    pub fn n_obs(&self) -> usize {
        self.y.len()
    }
}
