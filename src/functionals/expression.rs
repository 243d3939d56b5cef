//! Expression functionals
//!
//! An [`ExpressionFunctional`] evaluates a formula string over its declared
//! parameters. Its derivatives are not derived symbolically: first- and
//! second-order derivative formulas are supplied by the caller in two tables, and
//! differentiation only looks them up.
//!
//! For a functional depending on `mu` (dimension 2) and `nu` (dimension 1):
//!
//! ```text
//! derivative_expressions        = { mu: [d/dmu0, d/dmu1], nu: [d/dnu0] }
//! second_derivative_expressions = { mu: [{ mu: [..], nu: [..] },   // row for d/dmu0
//!                                        { mu: [..], nu: [..] }],  // row for d/dmu1
//!                                   nu: [{ mu: [..], nu: [..] }] } // row for d/dnu0
//! ```
//!
//! The derivative with respect to `(mu, 0)` is again an expression functional whose
//! formula is `derivative_expressions[mu][0]` and whose first-derivative table is
//! `second_derivative_expressions[mu][0]`. A non-empty table must cover every
//! declared parameter. An empty table, and all derivatives beyond the supplied
//! depth, are the constant zero.

use crate::error::{MorDiffError, Result};
use crate::functionals::{DerivativeCache, Functional, ParameterFunctional};
use crate::parameters::expression::{EvaluationContext, Expression, ExpressionError, Value};
use crate::parameters::{Mu, Parameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

/// Derivative formulas per parameter name, one per component
pub type DerivativeTable = BTreeMap<String, Vec<String>>;

/// Second derivative formulas: per parameter name and component, a [`DerivativeTable`]
pub type SecondDerivativeTable = BTreeMap<String, Vec<DerivativeTable>>;

/// Serializable description of an expression functional
///
/// # Examples
///
/// ```
/// use mordiff_rs::functionals::{ExpressionFunctional, ParameterFunctional};
/// use mordiff_rs::parameters::Mu;
///
/// let json = r#"{
///     "expression": "mu**2",
///     "parameters": {"mu": 1},
///     "name": "square",
///     "derivative_expressions": {"mu": ["2*mu"]},
///     "second_derivative_expressions": {"mu": [{"mu": ["2"]}]}
/// }"#;
/// let f = ExpressionFunctional::from_json(json).unwrap();
/// let mu = Mu::new().with("mu", 3.0);
/// assert_eq!(f.evaluate(&mu).unwrap(), 9.0);
/// assert_eq!(f.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 6.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDefinition {
    /// Formula of the functional
    pub expression: String,

    /// Parameters the formula may reference, with their dimensions
    pub parameters: Parameters,

    /// Identifier; defaults to the formula
    #[serde(default)]
    pub name: Option<String>,

    /// First derivative formulas
    #[serde(default)]
    pub derivative_expressions: DerivativeTable,

    /// Second derivative formulas
    #[serde(default)]
    pub second_derivative_expressions: SecondDerivativeTable,
}

/// A functional given by a formula with explicitly supplied derivative formulas
#[derive(Debug)]
pub struct ExpressionFunctional {
    name: String,
    expression: String,
    parameters: Parameters,
    derivative_expressions: DerivativeTable,
    second_derivative_expressions: SecondDerivativeTable,
    parsed: OnceLock<std::result::Result<Expression, ExpressionError>>,
    cache: DerivativeCache,
}

impl ExpressionFunctional {
    /// Create an expression functional
    ///
    /// # Arguments
    ///
    /// * `expression` - Formula over the declared parameters, e.g. `100 * mu[0]**2 + sin(nu[0])`
    /// * `parameters` - The parameters the formula references, with their dimensions
    /// * `name` - Identifier used in diagnostics
    /// * `derivative_expressions` - First derivative formulas
    /// * `second_derivative_expressions` - Second derivative formulas
    ///
    /// # Returns
    ///
    /// An error if a table references an undeclared parameter, does not have one
    /// entry per component, or is non-empty but leaves out a declared parameter.
    /// An empty table (or an empty row of the second derivative table) means all of
    /// those derivatives are zero. Formulas are not parsed here; syntax errors
    /// surface on evaluation or differentiation.
    ///
    /// # Examples
    ///
    /// ```
    /// use mordiff_rs::functionals::{ExpressionFunctional, ParameterFunctional};
    /// use mordiff_rs::parameters::{Mu, Parameters};
    /// use std::collections::BTreeMap;
    ///
    /// let parameters = Parameters::from_dims([("mu", 2)]).unwrap();
    /// let first = BTreeMap::from([(
    ///     "mu".to_string(),
    ///     vec!["mu[1]".to_string(), "mu[0]".to_string()],
    /// )]);
    /// let f = ExpressionFunctional::new("mu[0] * mu[1]", parameters, "bilinear", first, BTreeMap::new())
    ///     .unwrap();
    ///
    /// let mu = Mu::new().with("mu", [3.0, 4.0]);
    /// assert_eq!(f.evaluate(&mu).unwrap(), 12.0);
    /// assert_eq!(f.d_mu("mu", 1).unwrap().evaluate(&mu).unwrap(), 3.0);
    /// ```
    pub fn new(
        expression: &str,
        parameters: Parameters,
        name: &str,
        derivative_expressions: DerivativeTable,
        second_derivative_expressions: SecondDerivativeTable,
    ) -> Result<Self> {
        validate_table(&parameters, &derivative_expressions, "derivative_expressions")?;
        check_complete(
            &parameters,
            &second_derivative_expressions,
            "second_derivative_expressions",
        )?;
        for (parameter, rows) in &second_derivative_expressions {
            let dim = declared_dim(&parameters, parameter, "second_derivative_expressions")?;
            if rows.len() != dim {
                return Err(MorDiffError::DerivativeTableShape(format!(
                    "second_derivative_expressions['{}'] has {} rows, expected {}",
                    parameter,
                    rows.len(),
                    dim
                )));
            }
            for (index, row) in rows.iter().enumerate() {
                let context = format!("second_derivative_expressions['{}'][{}]", parameter, index);
                validate_table(&parameters, row, &context)?;
            }
        }

        Ok(Self::from_parts(
            name.to_string(),
            expression.to_string(),
            parameters,
            derivative_expressions,
            second_derivative_expressions,
        ))
    }

    /// Create an expression functional without derivative formulas
    ///
    /// All of its derivatives are the constant zero.
    pub fn without_derivatives(expression: &str, parameters: Parameters, name: &str) -> Self {
        Self::from_parts(
            name.to_string(),
            expression.to_string(),
            parameters,
            DerivativeTable::new(),
            SecondDerivativeTable::new(),
        )
    }

    /// Create an expression functional from a definition
    pub fn from_definition(definition: ExpressionDefinition) -> Result<Self> {
        let name = definition
            .name
            .unwrap_or_else(|| definition.expression.clone());
        Self::new(
            &definition.expression,
            definition.parameters,
            &name,
            definition.derivative_expressions,
            definition.second_derivative_expressions,
        )
    }

    /// Create an expression functional from a JSON definition
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: ExpressionDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition)
    }

    /// Load an expression functional from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// The definition this functional was built from
    pub fn definition(&self) -> ExpressionDefinition {
        ExpressionDefinition {
            expression: self.expression.clone(),
            parameters: self.parameters.clone(),
            name: Some(self.name.clone()),
            derivative_expressions: self.derivative_expressions.clone(),
            second_derivative_expressions: self.second_derivative_expressions.clone(),
        }
    }

    /// Serialize the definition to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.definition())?)
    }

    /// The formula of this functional
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first derivative formulas
    pub fn derivative_expressions(&self) -> &DerivativeTable {
        &self.derivative_expressions
    }

    /// The second derivative formulas
    pub fn second_derivative_expressions(&self) -> &SecondDerivativeTable {
        &self.second_derivative_expressions
    }

    fn from_parts(
        name: String,
        expression: String,
        parameters: Parameters,
        derivative_expressions: DerivativeTable,
        second_derivative_expressions: SecondDerivativeTable,
    ) -> Self {
        Self {
            name,
            expression,
            parameters,
            derivative_expressions,
            second_derivative_expressions,
            parsed: OnceLock::new(),
            cache: DerivativeCache::new(),
        }
    }

    /// The parsed formula, parsed on first use
    fn parsed(&self) -> Result<&Expression> {
        self.parsed
            .get_or_init(|| Expression::parse(&self.expression))
            .as_ref()
            .map_err(|source| MorDiffError::Evaluation {
                name: self.name.clone(),
                source: source.clone(),
            })
    }
}

impl ParameterFunctional for ExpressionFunctional {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn evaluate(&self, mu: &Mu) -> Result<f64> {
        self.parameters.validate(mu)?;
        let expression = self.parsed()?;
        let context = ParameterContext {
            mu,
            parameters: &self.parameters,
        };
        expression
            .evaluate_scalar(&context)
            .map_err(|source| MorDiffError::Evaluation {
                name: self.name.clone(),
                source,
            })
    }

    fn derivative_cache(&self) -> &DerivativeCache {
        &self.cache
    }

    fn compute_d_mu(&self, parameter: &str, index: usize) -> Result<Functional> {
        let formula = match self
            .derivative_expressions
            .get(parameter)
            .and_then(|formulas| formulas.get(index))
        {
            Some(formula) => formula.clone(),
            None => {
                log::trace!(
                    "'{}' has no derivative formula for ({}, {}); using zero",
                    self.name,
                    parameter,
                    index
                );
                return Ok(Functional::zero());
            }
        };

        let derivative_expressions = self
            .second_derivative_expressions
            .get(parameter)
            .and_then(|rows| rows.get(index))
            .cloned()
            .unwrap_or_default();

        let derivative = Self::from_parts(
            format!("{}_d_{}_{}", self.name, parameter, index),
            formula,
            self.parameters.clone(),
            derivative_expressions,
            SecondDerivativeTable::new(),
        );
        // Malformed derivative formulas are reported when the derivative is requested
        derivative.parsed()?;
        log::debug!(
            "built derivative '{}' = {}",
            derivative.name,
            derivative.expression
        );

        Ok(Functional::new(derivative))
    }

    fn constant_value(&self) -> Option<f64> {
        self.parsed().ok().and_then(Expression::constant_value)
    }
}

/// Binding of the declared parameters of a functional to the components in `mu`
struct ParameterContext<'a> {
    mu: &'a Mu,
    parameters: &'a Parameters,
}

impl EvaluationContext for ParameterContext<'_> {
    fn get_variable(&self, name: &str) -> std::result::Result<Value, ExpressionError> {
        if self.parameters.contains(name) {
            self.mu.get_variable(name)
        } else {
            Err(ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
        }
    }

    fn has_variable(&self, name: &str) -> bool {
        self.parameters.contains(name) && self.mu.contains(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.parameters.names().map(str::to_string).collect()
    }
}

fn declared_dim(parameters: &Parameters, parameter: &str, table: &str) -> Result<usize> {
    parameters.dim(parameter).ok_or_else(|| {
        MorDiffError::DerivativeTableShape(format!(
            "{} references undeclared parameter '{}'",
            table, parameter
        ))
    })
}

/// Check that a non-empty table names every declared parameter
fn check_complete<V>(
    parameters: &Parameters,
    table: &BTreeMap<String, V>,
    context: &str,
) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }
    match parameters.names().find(|name| !table.contains_key(*name)) {
        Some(missing) => Err(MorDiffError::DerivativeTableShape(format!(
            "{} has no entry for declared parameter '{}'",
            context, missing
        ))),
        None => Ok(()),
    }
}

fn validate_table(parameters: &Parameters, table: &DerivativeTable, context: &str) -> Result<()> {
    check_complete(parameters, table, context)?;
    for (parameter, formulas) in table {
        let dim = declared_dim(parameters, parameter, context)?;
        if formulas.len() != dim {
            return Err(MorDiffError::DerivativeTableShape(format!(
                "{}['{}'] has {} entries, expected {}",
                context,
                parameter,
                formulas.len(),
                dim
            )));
        }
    }
    Ok(())
}
