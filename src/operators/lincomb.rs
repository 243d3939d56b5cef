//! Parametric linear combinations of operators

use crate::error::{MorDiffError, Result};
use crate::operators::{Coefficient, Operator};
use crate::parameters::{Mu, Parameters};
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

/// The operator `sum_i coefficients[i](mu) * operators[i]`
///
/// Operators and coefficients always have the same length and are kept in the
/// order given; [`evaluate_coefficients`](LincombOperator::evaluate_coefficients)
/// returns values aligned with [`operators`](LincombOperator::operators).
///
/// # Examples
///
/// ```
/// use mordiff_rs::functionals::Functional;
/// use mordiff_rs::operators::{Coefficient, LincombOperator, Operator, ZeroOperator};
/// use mordiff_rs::parameters::Mu;
/// use std::sync::Arc;
///
/// let zero: Arc<dyn Operator> = Arc::new(ZeroOperator::new(1, 1));
/// let pf = Functional::projection("mu", 2, 0).unwrap();
/// let op = LincombOperator::new(vec![zero.clone(), zero], vec![Coefficient::from(1.0), pf.into()]).unwrap();
///
/// let mu = Mu::new().with("mu", [10.0, 2.0]);
/// assert_eq!(op.evaluate_coefficients(&mu).unwrap(), vec![1.0, 10.0]);
/// assert_eq!(op.d_mu("mu", 0).unwrap().evaluate_coefficients(&mu).unwrap(), vec![0.0, 1.0]);
/// ```
pub struct LincombOperator<O: ?Sized = dyn Operator> {
    operators: Vec<Arc<O>>,
    coefficients: Vec<Coefficient>,
}

impl<O: ?Sized> LincombOperator<O> {
    /// Create a linear combination, failing if the list lengths differ
    pub fn new(operators: Vec<Arc<O>>, coefficients: Vec<Coefficient>) -> Result<Self> {
        if operators.len() != coefficients.len() {
            return Err(MorDiffError::LengthMismatch {
                operators: operators.len(),
                coefficients: coefficients.len(),
            });
        }
        Ok(Self {
            operators,
            coefficients,
        })
    }

    /// The combined operators
    pub fn operators(&self) -> &[Arc<O>] {
        &self.operators
    }

    /// The coefficients, aligned with [`operators`](LincombOperator::operators)
    pub fn coefficients(&self) -> &[Coefficient] {
        &self.coefficients
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Whether the combination has no terms
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// The union of the parameter spaces of the functional coefficients
    pub fn parameters(&self) -> Parameters {
        self.coefficients
            .iter()
            .fold(Parameters::new(), |params, coefficient| match coefficient {
                Coefficient::Functional(functional) => params.union(functional.parameters()),
                Coefficient::Constant(_) => params,
            })
    }

    /// Evaluate every coefficient at `mu`, in operator order
    pub fn evaluate_coefficients(&self, mu: &Mu) -> Result<Vec<f64>> {
        self.coefficients
            .iter()
            .map(|coefficient| coefficient.evaluate(mu))
            .collect()
    }

    /// Differentiate the combination with respect to component `index` of `parameter`
    ///
    /// The result shares the operators of `self`; constant coefficients become
    /// zero and functional coefficients are replaced by their derivatives.
    pub fn d_mu(&self, parameter: &str, index: usize) -> Result<Self> {
        let coefficients = self
            .coefficients
            .iter()
            .map(|coefficient| coefficient.d_mu(parameter, index))
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "differentiated linear combination of {} operators with respect to ({}, {})",
            self.operators.len(),
            parameter,
            index
        );
        Ok(Self {
            operators: self.operators.clone(),
            coefficients,
        })
    }
}

impl<O: Operator + ?Sized> LincombOperator<O> {
    /// Apply the combination to `u` at the parameter value `mu`
    pub fn apply(&self, u: &Array1<f64>, mu: &Mu) -> Result<Array1<f64>> {
        let range_dim = match self.operators.first() {
            Some(operator) => operator.range_dim(),
            None => {
                return Err(MorDiffError::DimensionMismatch(
                    "cannot apply an empty linear combination".to_string(),
                ))
            }
        };

        let coefficients = self.evaluate_coefficients(mu)?;
        let mut result = Array1::zeros(range_dim);
        for (operator, coefficient) in self.operators.iter().zip(coefficients) {
            let applied = operator.apply(u, mu)?;
            if applied.len() != range_dim {
                return Err(MorDiffError::DimensionMismatch(format!(
                    "operators have range dimensions {} and {}",
                    range_dim,
                    applied.len()
                )));
            }
            result.scaled_add(coefficient, &applied);
        }
        Ok(result)
    }
}

impl<O: ?Sized> Clone for LincombOperator<O> {
    fn clone(&self) -> Self {
        Self {
            operators: self.operators.clone(),
            coefficients: self.coefficients.clone(),
        }
    }
}

impl<O: fmt::Debug + ?Sized> fmt::Debug for LincombOperator<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LincombOperator")
            .field("operators", &self.operators)
            .field("coefficients", &self.coefficients)
            .finish()
    }
}
