//! # Operators
//!
//! Linear operators and parametric linear combinations of them. Operators are
//! treated as opaque here: only the coefficients of a [`LincombOperator`] depend on
//! the parameter, so differentiating a combination differentiates its coefficients
//! and keeps the operators.

pub mod coefficient;
pub mod lincomb;

pub use coefficient::Coefficient;
pub use lincomb::LincombOperator;

use crate::error::{MorDiffError, Result};
use crate::parameters::Mu;
use ndarray::{Array1, Array2};
use std::fmt;

/// A linear operator acting on vectors
pub trait Operator: fmt::Debug + Send + Sync {
    /// Dimension of the vectors the operator acts on
    fn source_dim(&self) -> usize;

    /// Dimension of the vectors the operator produces
    fn range_dim(&self) -> usize;

    /// Apply the operator to `u` for the parameter value `mu`
    fn apply(&self, u: &Array1<f64>, mu: &Mu) -> Result<Array1<f64>>;
}

fn check_source(operator: &dyn Operator, u: &Array1<f64>) -> Result<()> {
    if u.len() != operator.source_dim() {
        return Err(MorDiffError::DimensionMismatch(format!(
            "operator expects vectors of length {}, got {}",
            operator.source_dim(),
            u.len()
        )));
    }
    Ok(())
}

/// The operator mapping every vector to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroOperator {
    source_dim: usize,
    range_dim: usize,
}

impl ZeroOperator {
    pub fn new(source_dim: usize, range_dim: usize) -> Self {
        Self {
            source_dim,
            range_dim,
        }
    }
}

impl Operator for ZeroOperator {
    fn source_dim(&self) -> usize {
        self.source_dim
    }

    fn range_dim(&self) -> usize {
        self.range_dim
    }

    fn apply(&self, u: &Array1<f64>, _mu: &Mu) -> Result<Array1<f64>> {
        check_source(self, u)?;
        Ok(Array1::zeros(self.range_dim))
    }
}

/// A parameter-independent operator given by a dense matrix
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOperator {
    matrix: Array2<f64>,
}

impl MatrixOperator {
    pub fn new(matrix: Array2<f64>) -> Self {
        Self { matrix }
    }

    /// The wrapped matrix
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl Operator for MatrixOperator {
    fn source_dim(&self) -> usize {
        self.matrix.ncols()
    }

    fn range_dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, u: &Array1<f64>, _mu: &Mu) -> Result<Array1<f64>> {
        check_source(self, u)?;
        Ok(self.matrix.dot(u))
    }
}
