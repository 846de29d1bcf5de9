//! mupe::params — ordered, named parameter vectors.
//!
//! Purpose
//! -------
//! Represent the caller's `start` specification as an explicit ordered list
//! of `(name, value)` records. The order fixed at construction is the
//! positional order of every `Theta` the solver sees, so successive fits can
//! be compared component by component without name lookups.
//!
//! Key behaviors
//! -------------
//! - [`ParameterVector`] validates non-empty, non-blank, unique names and
//!   finite values, and is never mutated in place: [`ParameterVector::with_values`]
//!   builds a fresh vector with the same names in the same order.
//! - [`ParameterNames`] carries the derived name → position map used only
//!   where a lookup by name is needed (model evaluation, result access).
//! - [`ParamView`] lends a model function named access to a positional
//!   `Theta` without copying it.
//!
//! Invariants & assumptions
//! ------------------------
//! - `names()[k]` always labels `values()[k]`.
//! - Names are unique and non-empty.
use std::{collections::HashMap, sync::Arc};

use crate::{
    mupe::errors::{IrlsResult, MupeError},
    optimization::{
        errors::{OptError, OptResult},
        least_squares::Theta,
    },
};

/// A single named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value }
    }
}

/// Ordered parameter names plus the derived name → position map.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNames {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ParameterNames {
    /// Position of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// An ordered sequence of uniquely named parameters.
///
/// Construct via [`ParameterVector::new`] or [`ParameterVector::from_pairs`];
/// both reject empty specifications, blank or duplicate names, and
/// non-finite values with a configuration error.
///
/// Names are shared between the vectors of successive iterations, so
/// re-seeding with new values never re-validates or re-hashes them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    names: Arc<ParameterNames>,
    values: Theta,
}

impl ParameterVector {
    /// Build a validated vector from explicit records, keeping their order.
    ///
    /// # Errors
    /// - [`MupeError::EmptyStart`] if `params` is empty.
    /// - [`MupeError::EmptyName`] for a blank name.
    /// - [`MupeError::DuplicateName`] for a repeated name.
    /// - [`MupeError::NonFiniteStart`] for a NaN/±inf value.
    pub fn new(params: Vec<Parameter>) -> IrlsResult<Self> {
        if params.is_empty() {
            return Err(MupeError::EmptyStart);
        }
        let mut names = Vec::with_capacity(params.len());
        let mut index = HashMap::with_capacity(params.len());
        let mut values = Theta::zeros(params.len());
        for (k, Parameter { name, value }) in params.into_iter().enumerate() {
            if name.trim().is_empty() {
                return Err(MupeError::EmptyName { index: k });
            }
            if index.contains_key(&name) {
                return Err(MupeError::DuplicateName { name });
            }
            if !value.is_finite() {
                return Err(MupeError::NonFiniteStart { name, value });
            }
            index.insert(name.clone(), k);
            names.push(name);
            values[k] = value;
        }
        Ok(Self { names: Arc::new(ParameterNames { names, index }), values })
    }

    /// Build a validated vector from `(name, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> IrlsResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(name, value)| Parameter::new(name, value)).collect())
    }

    /// A fresh vector with the same names, in the same order, holding
    /// `values`.
    ///
    /// # Errors
    /// - [`MupeError::SolverOutputMismatch`] if `values` has the wrong length.
    pub fn with_values(&self, values: Theta) -> IrlsResult<Self> {
        if values.len() != self.len() {
            return Err(MupeError::SolverOutputMismatch {
                output: "parameter values",
                expected: self.len(),
                found: values.len(),
            });
        }
        Ok(Self { names: Arc::clone(&self.names), values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> &ParameterNames {
        &self.names
    }

    /// Positional values, in name order.
    pub fn values(&self) -> &Theta {
        &self.values
    }

    /// Value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.position(name).map(|k| self.values[k])
    }

    /// Iterate over `(name, value)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Owned `(name, value)` records in order.
    pub fn to_pairs(&self) -> Vec<(String, f64)> {
        self.iter().map(|(n, v)| (n.to_string(), v)).collect()
    }

    /// Named view over an arbitrary positional vector using these names.
    pub fn view<'a>(&'a self, values: &'a Theta) -> ParamView<'a> {
        ParamView::new(&self.names, values)
    }
}

/// Borrowed named view over a positional parameter vector.
///
/// Handed to model functions so they can read parameters by name while the
/// solver works on plain vectors.
#[derive(Debug, Clone, Copy)]
pub struct ParamView<'a> {
    names: &'a ParameterNames,
    values: &'a Theta,
}

impl<'a> ParamView<'a> {
    pub fn new(names: &'a ParameterNames, values: &'a Theta) -> Self {
        Self { names, values }
    }

    /// Value of `name`.
    ///
    /// # Errors
    /// - [`OptError::UnknownParameter`] if `name` is not one of the fitted
    ///   parameters.
    pub fn get(&self, name: &str) -> OptResult<f64> {
        self.names
            .position(name)
            .map(|k| self.values[k])
            .ok_or_else(|| OptError::UnknownParameter { name: name.to_string() })
    }

    pub fn values(&self) -> &'a Theta {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let (names, values) = (self.names, self.values);
        names.names.iter().map(String::as_str).zip(values.iter().copied())
    }
}
