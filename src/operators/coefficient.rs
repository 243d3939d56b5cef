//! Coefficients of linear combinations

use crate::error::Result;
use crate::functionals::Functional;
use crate::parameters::Mu;

/// A coefficient: either a plain scalar or a parameter functional
#[derive(Debug, Clone)]
pub enum Coefficient {
    Constant(f64),
    Functional(Functional),
}

impl Coefficient {
    /// Evaluate the coefficient; constants pass through unchanged
    pub fn evaluate(&self, mu: &Mu) -> Result<f64> {
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Functional(functional) => functional.evaluate(mu),
        }
    }

    /// Differentiate the coefficient; constants become `0.0`
    pub fn d_mu(&self, parameter: &str, index: usize) -> Result<Coefficient> {
        match self {
            Self::Constant(_) => Ok(Self::Constant(0.0)),
            Self::Functional(functional) => {
                Ok(Self::Functional(functional.d_mu(parameter, index)?))
            }
        }
    }

    /// Whether the coefficient depends on the parameter value
    pub fn is_parametric(&self) -> bool {
        matches!(self, Self::Functional(_))
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<Functional> for Coefficient {
    fn from(functional: Functional) -> Self {
        Self::Functional(functional)
    }
}

impl From<&Functional> for Coefficient {
    fn from(functional: &Functional) -> Self {
        Self::Functional(functional.clone())
    }
}
