//! Parameter space definition
//!
//! This module provides the Parameters struct, an ordered set of named parameters
//! each with a fixed number of components. Functionals declare the parameters they
//! depend on through a `Parameters` value, and parameter values ([`Mu`]) are checked
//! against it before evaluation.

use crate::parameters::mu::{IntoComponents, Mu};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with parameter spaces and values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' has dimension {expected}, got {actual} components")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Index {index} out of range for parameter '{name}' of dimension {dim}")]
    IndexOutOfRange {
        name: String,
        index: usize,
        dim: usize,
    },

    #[error("Parameter '{name}' must have at least one component")]
    ZeroDimension { name: String },

    #[error("Parameter '{name}' declared with conflicting dimensions {first} and {second}")]
    ConflictingDimension {
        name: String,
        first: usize,
        second: usize,
    },
}

/// An ordered set of parameter names with their component counts
///
/// Names are kept sorted, so iteration order (and therefore the ordering of
/// gradients and Hessians built over the space) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, usize>", into = "BTreeMap<String, usize>")]
pub struct Parameters {
    dims: BTreeMap<String, usize>,
}

impl Parameters {
    /// Create an empty parameter space
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::parameters::Parameters;
    ///
    /// let params = Parameters::new();
    /// assert!(params.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            dims: BTreeMap::new(),
        }
    }

    /// Create a parameter space from `(name, dimension)` pairs
    ///
    /// # Returns
    ///
    /// An error if a dimension is zero or a name is given twice with different
    /// dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::parameters::Parameters;
    ///
    /// let params = Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap();
    /// assert_eq!(params.dim("mu"), Some(2));
    /// assert_eq!(params.total_dim(), 3);
    /// ```
    pub fn from_dims<I, S>(dims: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        dims.into_iter()
            .try_fold(Self::new(), |params, (name, dim)| params.with(name, dim))
    }

    /// Return a copy of this space with one more parameter
    pub fn with(mut self, name: impl Into<String>, dim: usize) -> Result<Self, ParameterError> {
        let name = name.into();
        if dim == 0 {
            return Err(ParameterError::ZeroDimension { name });
        }
        if let Some(&first) = self.dims.get(&name) {
            if first != dim {
                return Err(ParameterError::ConflictingDimension {
                    name,
                    first,
                    second: dim,
                });
            }
        }
        self.dims.insert(name, dim);
        Ok(self)
    }

    /// Get the dimension of a parameter, or `None` if it is not declared
    pub fn dim(&self, name: &str) -> Option<usize> {
        self.dims.get(name).copied()
    }

    /// Check whether a parameter is declared
    pub fn contains(&self, name: &str) -> bool {
        self.dims.contains_key(name)
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    /// Whether no parameter is declared
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Sum of all parameter dimensions
    pub fn total_dim(&self) -> usize {
        self.dims.values().sum()
    }

    /// Iterate over `(name, dimension)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.dims.iter().map(|(name, &dim)| (name.as_str(), dim))
    }

    /// Iterate over the parameter names in order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.dims.keys().map(String::as_str)
    }

    /// All `(name, index)` components, ordered by name and then index
    pub fn components(&self) -> Vec<(String, usize)> {
        self.dims
            .iter()
            .flat_map(|(name, &dim)| (0..dim).map(move |index| (name.clone(), index)))
            .collect()
    }

    /// Check a derivative direction against the space
    ///
    /// Names that are not declared are accepted, since differentiating with respect
    /// to them yields zero. For a declared name, `index` must be below its dimension.
    pub fn check_index(&self, name: &str, index: usize) -> Result<(), ParameterError> {
        match self.dim(name) {
            Some(dim) if index >= dim => Err(ParameterError::IndexOutOfRange {
                name: name.to_string(),
                index,
                dim,
            }),
            _ => Ok(()),
        }
    }

    /// Merge two spaces, failing if they disagree on the dimension of a name
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::parameters::Parameters;
    ///
    /// let a = Parameters::from_dims([("mu", 2)]).unwrap();
    /// let b = Parameters::from_dims([("nu", 1)]).unwrap();
    /// let merged = a.merge(&b).unwrap();
    /// assert_eq!(merged.len(), 2);
    ///
    /// let c = Parameters::from_dims([("mu", 3)]).unwrap();
    /// assert!(a.merge(&c).is_err());
    /// ```
    pub fn merge(&self, other: &Parameters) -> Result<Self, ParameterError> {
        other
            .iter()
            .try_fold(self.clone(), |params, (name, dim)| params.with(name, dim))
    }

    /// Merge two spaces, keeping the first dimension seen for conflicting names
    ///
    /// Used by composite functionals whose operands are only checked against a
    /// parameter value at evaluation time.
    pub(crate) fn union(&self, other: &Parameters) -> Self {
        let mut dims = self.dims.clone();
        for (name, dim) in other.iter() {
            match dims.get(name) {
                Some(&first) if first != dim => {
                    log::warn!(
                        "parameter '{}' declared with dimensions {} and {}; keeping {}",
                        name,
                        first,
                        dim,
                        first
                    );
                }
                Some(_) => {}
                None => {
                    dims.insert(name.to_string(), dim);
                }
            }
        }
        Self { dims }
    }

    /// Check that a parameter value provides every declared parameter with the
    /// declared number of components
    ///
    /// Extra names in `mu` are ignored.
    pub fn validate(&self, mu: &Mu) -> Result<(), ParameterError> {
        for (name, dim) in self.iter() {
            let value = mu.get(name).ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;
            if value.len() != dim {
                return Err(ParameterError::DimensionMismatch {
                    name: name.to_string(),
                    expected: dim,
                    actual: value.len(),
                });
            }
        }
        Ok(())
    }

    /// Build a parameter value for this space
    ///
    /// Every supplied name must be declared with a matching dimension, and every
    /// declared name must be supplied. Scalars are accepted for one-dimensional
    /// parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::parameters::Parameters;
    ///
    /// let params = Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap();
    /// let mu = params.parse([("mu", vec![10.0, 2.0]), ("nu", vec![0.0])]).unwrap();
    /// assert_eq!(mu.component("mu", 1).unwrap(), 2.0);
    ///
    /// assert!(params.parse([("mu", vec![10.0]), ("nu", vec![0.0])]).is_err());
    /// ```
    pub fn parse<I, S, V>(&self, values: I) -> Result<Mu, ParameterError>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: IntoComponents,
    {
        let mut mu = Mu::new();
        for (name, value) in values {
            let name = name.into();
            let value = value.into_components();
            let expected = self
                .dim(&name)
                .ok_or_else(|| ParameterError::ParameterNotFound { name: name.clone() })?;
            if value.len() != expected {
                return Err(ParameterError::DimensionMismatch {
                    name,
                    expected,
                    actual: value.len(),
                });
            }
            mu = mu.with(name, value);
        }
        self.validate(&mu)?;
        Ok(mu)
    }
}

impl TryFrom<BTreeMap<String, usize>> for Parameters {
    type Error = ParameterError;

    fn try_from(dims: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        Self::from_dims(dims)
    }
}

impl From<Parameters> for BTreeMap<String, usize> {
    fn from(params: Parameters) -> Self {
        params.dims
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, dim)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, dim)?;
        }
        write!(f, "}}")
    }
}
