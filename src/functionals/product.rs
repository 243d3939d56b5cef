//! Product functionals
//!
//! Products are differentiated with the generalized product rule:
//!
//! ```text
//! d(f_1 * ... * f_n) = sum_i  f_1 * ... * d(f_i) * ... * f_n
//! ```
//!
//! Terms whose differentiated factor is the constant zero are dropped, and factors
//! that differentiate to the constant one are left out of their term.

use crate::error::Result;
use crate::functionals::{DerivativeCache, Functional, LincombFunctional, ParameterFunctional};
use crate::parameters::{Mu, Parameters};

/// Product of a list of functionals
///
/// An empty product is the constant one.
#[derive(Debug)]
pub struct ProductFunctional {
    factors: Vec<Functional>,
    name: String,
    parameters: Parameters,
    cache: DerivativeCache,
}

impl ProductFunctional {
    /// Create the product of `factors`
    ///
    /// The parameter space is the union of the factors' spaces. Factors that
    /// disagree on a parameter's dimension are reported when evaluated.
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::functionals::{Functional, ParameterFunctional, ProductFunctional};
    /// use mordiff_rs::parameters::Mu;
    ///
    /// let pf = Functional::projection("mu", 2, 0).unwrap();
    /// let product = ProductFunctional::new(vec![pf.clone(), pf, Functional::constant(2.0)]);
    /// let mu = Mu::new().with("mu", [3.0, 1.0]);
    /// assert_eq!(product.evaluate(&mu).unwrap(), 18.0);
    /// assert_eq!(product.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 12.0);
    /// ```
    pub fn new(factors: Vec<Functional>) -> Self {
        let parameters = factors
            .iter()
            .fold(Parameters::new(), |params, factor| params.union(factor.parameters()));
        let name = if factors.is_empty() {
            "1".to_string()
        } else {
            let names: Vec<&str> = factors.iter().map(|factor| factor.name()).collect();
            format!("({})", names.join(" * "))
        };
        Self {
            factors,
            name,
            parameters,
            cache: DerivativeCache::new(),
        }
    }

    /// Create the product of `factors`, failing if they disagree on a parameter's dimension
    pub fn checked(factors: Vec<Functional>) -> Result<Self> {
        factors
            .iter()
            .try_fold(Parameters::new(), |params, factor| params.merge(factor.parameters()))?;
        Ok(Self::new(factors))
    }

    /// The factors of the product
    pub fn factors(&self) -> &[Functional] {
        &self.factors
    }
}

impl ParameterFunctional for ProductFunctional {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn evaluate(&self, mu: &Mu) -> Result<f64> {
        self.factors
            .iter()
            .try_fold(1.0, |product, factor| Ok(product * factor.evaluate(mu)?))
    }

    fn derivative_cache(&self) -> &DerivativeCache {
        &self.cache
    }

    fn compute_d_mu(&self, parameter: &str, index: usize) -> Result<Functional> {
        match self.factors.as_slice() {
            [] => return Ok(Functional::zero()),
            [factor] => return factor.d_mu(parameter, index),
            _ => {}
        }

        let mut terms = Vec::with_capacity(self.factors.len());
        for (i, factor) in self.factors.iter().enumerate() {
            let derivative = factor.d_mu(parameter, index)?;
            if derivative.is_zero() {
                log::trace!(
                    "dropping term {} of d({})/d({}, {})",
                    i,
                    self.name,
                    parameter,
                    index
                );
                continue;
            }

            let mut term_factors = Vec::with_capacity(self.factors.len());
            for (j, other) in self.factors.iter().enumerate() {
                if j != i {
                    term_factors.push(other.clone());
                } else if !derivative.is_one() {
                    term_factors.push(derivative.clone());
                }
            }

            let term = if term_factors.len() == 1 {
                term_factors.remove(0)
            } else {
                Functional::new(ProductFunctional::new(term_factors))
            };
            terms.push(term);
        }

        Ok(LincombFunctional::sum(terms))
    }

    fn constant_value(&self) -> Option<f64> {
        if self.factors.iter().any(Functional::is_zero) {
            return Some(0.0);
        }
        self.factors
            .iter()
            .map(|factor| factor.constant_value())
            .product()
    }
}
