//! Elementwise closeness test between successive coefficient vectors.
use crate::optimization::least_squares::Theta;

/// `true` iff every component satisfies `|prior − new| ≤ atol + rtol·|new|`.
///
/// NaN never passes; equal infinities do. Vectors of different length are
/// never close.
pub fn all_close(prior: &Theta, new: &Theta, atol: f64, rtol: f64) -> bool {
    prior.len() == new.len()
        && prior.iter().zip(new.iter()).all(|(&a, &b)| {
            if a.is_infinite() || b.is_infinite() {
                a == b
            } else {
                (a - b).abs() <= atol + rtol * b.abs()
            }
        })
}

/// Largest componentwise change `max_k |prior_k − new_k|` (NaN-propagating).
pub fn max_abs_change(prior: &Theta, new: &Theta) -> f64 {
    prior.iter().zip(new.iter()).fold(0.0_f64, |m, (&a, &b)| {
        let d = (a - b).abs();
        if d.is_nan() || m.is_nan() { f64::NAN } else { m.max(d) }
    })
}
