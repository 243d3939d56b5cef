//! Linear combinations of functionals

use crate::error::{MorDiffError, Result};
use crate::functionals::{DerivativeCache, Functional, ParameterFunctional};
use crate::parameters::{Mu, Parameters};

/// The functional `sum_i coefficients[i] * functionals[i]`
///
/// Differentiation is linear: the derivative is the combination of the
/// derivatives with the same coefficients.
#[derive(Debug)]
pub struct LincombFunctional {
    functionals: Vec<Functional>,
    coefficients: Vec<f64>,
    name: String,
    parameters: Parameters,
    cache: DerivativeCache,
}

impl LincombFunctional {
    /// Create a linear combination
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::functionals::{Functional, LincombFunctional, ParameterFunctional};
    /// use mordiff_rs::parameters::Mu;
    ///
    /// let p0 = Functional::projection("mu", 2, 0).unwrap();
    /// let p1 = Functional::projection("mu", 2, 1).unwrap();
    /// let f = LincombFunctional::new(vec![p0, p1], vec![2.0, -1.0]).unwrap();
    /// let mu = Mu::new().with("mu", [10.0, 2.0]);
    /// assert_eq!(f.evaluate(&mu).unwrap(), 18.0);
    /// assert_eq!(f.d_mu("mu", 1).unwrap().evaluate(&mu).unwrap(), -1.0);
    /// ```
    pub fn new(functionals: Vec<Functional>, coefficients: Vec<f64>) -> Result<Self> {
        if functionals.len() != coefficients.len() {
            return Err(MorDiffError::DimensionMismatch(format!(
                "{} functionals but {} coefficients",
                functionals.len(),
                coefficients.len()
            )));
        }
        Ok(Self::from_terms(functionals.into_iter().zip(coefficients).collect()))
    }

    /// Create a linear combination from `(functional, coefficient)` pairs
    pub fn from_terms(terms: Vec<(Functional, f64)>) -> Self {
        let parameters = terms
            .iter()
            .fold(Parameters::new(), |params, (functional, _)| {
                params.union(functional.parameters())
            });
        let name = if terms.is_empty() {
            "0".to_string()
        } else {
            let parts: Vec<String> = terms
                .iter()
                .map(|(functional, coefficient)| format!("{} * {}", coefficient, functional.name()))
                .collect();
            format!("({})", parts.join(" + "))
        };
        let (functionals, coefficients) = terms.into_iter().unzip();
        Self {
            functionals,
            coefficients,
            name,
            parameters,
            cache: DerivativeCache::new(),
        }
    }

    /// The sum of `terms`, collapsing empty and single-term sums
    pub fn sum(mut terms: Vec<Functional>) -> Functional {
        match terms.len() {
            0 => Functional::zero(),
            1 => terms.remove(0),
            _ => Functional::new(Self::from_terms(
                terms.into_iter().map(|term| (term, 1.0)).collect(),
            )),
        }
    }

    /// The combined functionals
    pub fn functionals(&self) -> &[Functional] {
        &self.functionals
    }

    /// The coefficients of the combination
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl ParameterFunctional for LincombFunctional {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn evaluate(&self, mu: &Mu) -> Result<f64> {
        self.functionals
            .iter()
            .zip(&self.coefficients)
            .try_fold(0.0, |sum, (functional, &coefficient)| {
                Ok(sum + coefficient * functional.evaluate(mu)?)
            })
    }

    fn derivative_cache(&self) -> &DerivativeCache {
        &self.cache
    }

    fn compute_d_mu(&self, parameter: &str, index: usize) -> Result<Functional> {
        let mut terms = Vec::with_capacity(self.functionals.len());
        for (functional, &coefficient) in self.functionals.iter().zip(&self.coefficients) {
            let derivative = functional.d_mu(parameter, index)?;
            if coefficient != 0.0 && !derivative.is_zero() {
                terms.push((derivative, coefficient));
            }
        }

        match terms.len() {
            0 => Ok(Functional::zero()),
            1 if terms[0].1 == 1.0 => Ok(terms.remove(0).0),
            _ => Ok(Functional::new(Self::from_terms(terms))),
        }
    }

    fn constant_value(&self) -> Option<f64> {
        self.functionals
            .iter()
            .zip(&self.coefficients)
            .map(|(functional, coefficient)| functional.constant_value().map(|c| c * coefficient))
            .sum()
    }
}
