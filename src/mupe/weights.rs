//! Observation weights for the IRLS outer loop.
//!
//! The first solve uses unit weights. Every later solve weights observation
//! `k` by `1 / f_k`, the reciprocal of the previous fit's prediction, which
//! turns percent-error minimization into a weighted least-squares problem.
//! A prediction that is zero, negative, or non-finite leaves the weight
//! undefined and is reported instead of being clamped.
use crate::{
    mupe::errors::{IrlsResult, MupeError},
    optimization::least_squares::{Predictions, Weights},
};

/// Unit weights for `n` observations.
pub fn uniform_weights(n: usize) -> Weights {
    Weights::ones(n)
}

/// Reciprocal-prediction weights `w_k = 1 / f_k`.
///
/// # Errors
/// - [`MupeError::NonPositivePrediction`] at the first `f_k` that is not
///   strictly positive and finite, tagged with `iteration`.
pub fn reciprocal_weights(predictions: &Predictions, iteration: usize) -> IrlsResult<Weights> {
    if let Some((index, &value)) =
        predictions.iter().enumerate().find(|(_, p)| !(p.is_finite() && **p > 0.0))
    {
        return Err(MupeError::NonPositivePrediction { iteration, index, value });
    }
    Ok(predictions.mapv(f64::recip))
}
