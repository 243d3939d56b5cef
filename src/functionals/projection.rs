//! Projection functionals
//!
//! A projection functional selects a single component of a parameter.

use crate::error::Result;
use crate::functionals::{DerivativeCache, Functional, ParameterFunctional};
use crate::parameters::{Mu, ParameterError, Parameters};

/// The functional `mu -> mu[parameter][index]`
///
/// Its derivative with respect to the selected component is one, with respect to
/// every other component zero.
#[derive(Debug)]
pub struct ProjectionFunctional {
    parameter: String,
    index: usize,
    name: String,
    parameters: Parameters,
    cache: DerivativeCache,
}

impl ProjectionFunctional {
    /// Create a projection onto component `index` of a `dim`-dimensional parameter
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::functionals::{ParameterFunctional, ProjectionFunctional};
    /// use mordiff_rs::parameters::Mu;
    ///
    /// let pf = ProjectionFunctional::new("mu", 2, 0).unwrap();
    /// let mu = Mu::new().with("mu", [10.0, 2.0]);
    /// assert_eq!(pf.evaluate(&mu).unwrap(), 10.0);
    ///
    /// assert!(ProjectionFunctional::new("mu", 2, 2).is_err());
    /// ```
    pub fn new(parameter: &str, dim: usize, index: usize) -> Result<Self> {
        let parameters = Parameters::from_dims([(parameter, dim)])?;
        if index >= dim {
            return Err(ParameterError::IndexOutOfRange {
                name: parameter.to_string(),
                index,
                dim,
            }
            .into());
        }
        Ok(Self {
            parameter: parameter.to_string(),
            index,
            name: format!("{}[{}]", parameter, index),
            parameters,
            cache: DerivativeCache::new(),
        })
    }

    /// Name of the projected parameter
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Index of the projected component
    pub fn index(&self) -> usize {
        self.index
    }
}

impl ParameterFunctional for ProjectionFunctional {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn evaluate(&self, mu: &Mu) -> Result<f64> {
        self.parameters.validate(mu)?;
        Ok(mu.component(&self.parameter, self.index)?)
    }

    fn derivative_cache(&self) -> &DerivativeCache {
        &self.cache
    }

    fn compute_d_mu(&self, parameter: &str, index: usize) -> Result<Functional> {
        if parameter == self.parameter && index == self.index {
            Ok(Functional::one())
        } else {
            Ok(Functional::zero())
        }
    }
}
