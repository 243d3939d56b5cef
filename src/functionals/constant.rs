//! Constant functionals

use crate::error::Result;
use crate::functionals::{DerivativeCache, Functional, ParameterFunctional};
use crate::parameters::{Mu, Parameters};

/// A functional with a fixed value, independent of the parameter value
///
/// All of its derivatives are the shared constant zero, returned without
/// touching the derivative cache.
#[derive(Debug)]
pub struct ConstantFunctional {
    value: f64,
    name: String,
    parameters: Parameters,
    cache: DerivativeCache,
}

impl ConstantFunctional {
    /// Create a constant functional
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::functionals::{ConstantFunctional, ParameterFunctional};
    /// use mordiff_rs::parameters::Mu;
    ///
    /// let c = ConstantFunctional::new(2.5);
    /// assert_eq!(c.evaluate(&Mu::new()).unwrap(), 2.5);
    /// ```
    pub fn new(value: f64) -> Self {
        Self {
            value,
            name: format!("{}", value),
            parameters: Parameters::new(),
            cache: DerivativeCache::new(),
        }
    }

    /// The constant value
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl ParameterFunctional for ConstantFunctional {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn evaluate(&self, _mu: &Mu) -> Result<f64> {
        Ok(self.value)
    }

    fn derivative_cache(&self) -> &DerivativeCache {
        &self.cache
    }

    fn compute_d_mu(&self, _parameter: &str, _index: usize) -> Result<Functional> {
        Ok(Functional::zero())
    }

    fn d_mu(&self, parameter: &str, index: usize) -> Result<Functional> {
        self.compute_d_mu(parameter, index)
    }

    fn constant_value(&self) -> Option<f64> {
        Some(self.value)
    }
}
