//! Parameter values
//!
//! A [`Mu`] binds parameter names to fixed-length vectors of numbers. Values are
//! immutable once built: perturbing a component produces a new value.

use crate::parameters::parameters::{ParameterError, Parameters};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Conversion of user input into the component vector of a parameter
///
/// Scalars become vectors of length one.
pub trait IntoComponents {
    /// Convert into a component vector
    fn into_components(self) -> Array1<f64>;
}

impl IntoComponents for f64 {
    fn into_components(self) -> Array1<f64> {
        Array1::from_elem(1, self)
    }
}

impl IntoComponents for Vec<f64> {
    fn into_components(self) -> Array1<f64> {
        Array1::from_vec(self)
    }
}

impl IntoComponents for &[f64] {
    fn into_components(self) -> Array1<f64> {
        Array1::from_vec(self.to_vec())
    }
}

impl<const N: usize> IntoComponents for [f64; N] {
    fn into_components(self) -> Array1<f64> {
        Array1::from_vec(self.to_vec())
    }
}

impl IntoComponents for Array1<f64> {
    fn into_components(self) -> Array1<f64> {
        self
    }
}

/// A parameter value: a mapping from parameter names to component vectors
///
/// # Examples
///
/// ```
/// use mordiff_rs::parameters::Mu;
///
/// let mu = Mu::new().with("mu", [10.0, 2.0]).with("nu", 0.0);
/// assert_eq!(mu.component("mu", 0).unwrap(), 10.0);
/// assert_eq!(mu.get("nu").unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mu {
    values: BTreeMap<String, Array1<f64>>,
}

impl Mu {
    /// Create an empty parameter value
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Return this value extended by (or with a replaced) entry for `name`
    pub fn with(mut self, name: impl Into<String>, value: impl IntoComponents) -> Self {
        self.values.insert(name.into(), value.into_components());
        self
    }

    /// Get the component vector of a parameter
    pub fn get(&self, name: &str) -> Option<&Array1<f64>> {
        self.values.get(name)
    }

    /// Get a single component of a parameter
    pub fn component(&self, name: &str, index: usize) -> Result<f64, ParameterError> {
        let value = self
            .get(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;
        value
            .get(index)
            .copied()
            .ok_or_else(|| ParameterError::IndexOutOfRange {
                name: name.to_string(),
                index,
                dim: value.len(),
            })
    }

    /// Return a copy of this value with one component replaced
    pub fn with_component(&self, name: &str, index: usize, value: f64) -> Result<Self, ParameterError> {
        // Validates the component exists
        self.component(name, index)?;
        let mut values = self.values.clone();
        if let Some(entry) = values.get_mut(name) {
            entry[index] = value;
        }
        Ok(Self { values })
    }

    /// Check whether a parameter is bound
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameter is bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the bound parameter names in order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(name, components)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array1<f64>)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// The parameter space this value is an element of
    pub fn parameters(&self) -> Result<Parameters, ParameterError> {
        Parameters::from_dims(self.iter().map(|(name, value)| (name, value.len())))
    }
}

impl<S, V> FromIterator<(S, V)> for Mu
where
    S: Into<String>,
    V: IntoComponents,
{
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |mu, (name, value)| mu.with(name, value))
    }
}

/// Bit pattern consistent with numeric equality: `-0.0` hashes as `0.0` and all
/// NaNs hash alike
fn canonical_bits(x: f64) -> u64 {
    if x.is_nan() {
        f64::NAN.to_bits()
    } else {
        (x + 0.0).to_bits()
    }
}

impl Hash for Mu {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (name, value) in self.iter() {
            name.hash(state);
            value.len().hash(state);
            for &x in value.iter() {
                canonical_bits(x).hash(state);
            }
        }
    }
}

impl fmt::Display for Mu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}
