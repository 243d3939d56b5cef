//! Gradients, Hessians and finite-difference checks of parameter functionals.
//!
//! Components are ordered as in [`Parameters::components`]: by parameter name, then
//! by index. Hessians are assembled from the functional's own derivatives, so every
//! mixed partial goes through the derivative caches of the functionals involved.

use crate::error::{MorDiffError, Result};
use crate::functionals::Functional;
use crate::parameters::{Mu, Parameters};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default step size for finite differences.
const DEFAULT_EPSILON: f64 = 1e-6;

/// Options for sensitivity computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Assemble Hessian entries in parallel. Default: true when the `parallel`
    /// feature is enabled. Ignored without it.
    pub parallel: bool,

    /// Relative step size for finite differences. Default: 1e-6
    pub epsilon: f64,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Compute the gradient of a functional at `mu`.
///
/// # Arguments
///
/// * `functional` - The functional to differentiate
/// * `mu` - The parameter value at which to evaluate the gradient
///
/// # Returns
///
/// * `Result<Array1<f64>>` - One partial derivative per component of
///   `functional.parameters()`
pub fn gradient(functional: &Functional, mu: &Mu) -> Result<Array1<f64>> {
    let components = functional.parameters().components();
    let values = components
        .iter()
        .map(|(parameter, index)| functional.d_mu(parameter, *index)?.evaluate(mu))
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from_vec(values))
}

/// Compute the Hessian of a functional at `mu`.
///
/// Entry `[a, b]` is `functional.d_mu(a).d_mu(b)` evaluated at `mu`, with `a` and
/// `b` ranging over the components of `functional.parameters()`.
///
/// # Arguments
///
/// * `functional` - The functional to differentiate twice
/// * `mu` - The parameter value at which to evaluate the Hessian
/// * `config` - Whether to assemble entries in parallel
pub fn hessian(functional: &Functional, mu: &Mu, config: &SensitivityConfig) -> Result<Array2<f64>> {
    let components = functional.parameters().components();
    let n = components.len();

    let first_derivatives = components
        .iter()
        .map(|(parameter, index)| functional.d_mu(parameter, *index))
        .collect::<Result<Vec<Functional>>>()?;

    let entry = |k: usize| -> Result<f64> {
        let (a, b) = (k / n, k % n);
        let (parameter, index) = &components[b];
        first_derivatives[a].d_mu(parameter, *index)?.evaluate(mu)
    };

    let values = if config.parallel {
        assemble_parallel(n * n, entry)?
    } else {
        (0..n * n).map(entry).collect::<Result<Vec<f64>>>()?
    };

    Array2::from_shape_vec((n, n), values)
        .map_err(|e| MorDiffError::DimensionMismatch(format!("Hessian assembly failed: {}", e)))
}

#[cfg(feature = "parallel")]
fn assemble_parallel<F>(len: usize, entry: F) -> Result<Vec<f64>>
where
    F: Fn(usize) -> Result<f64> + Sync + Send,
{
    (0..len).into_par_iter().map(entry).collect()
}

#[cfg(not(feature = "parallel"))]
fn assemble_parallel<F>(len: usize, entry: F) -> Result<Vec<f64>>
where
    F: Fn(usize) -> Result<f64>,
{
    (0..len).map(entry).collect()
}

/// Approximate a partial derivative with central finite differences.
///
/// The step is scaled with the magnitude of the perturbed component.
///
/// # Arguments
///
/// * `functional` - The functional to differentiate
/// * `mu` - The parameter value at which to differentiate
/// * `parameter` - Name of the parameter
/// * `index` - Component of the parameter
/// * `epsilon` - The step size for finite differences (optional)
pub fn finite_difference(
    functional: &Functional,
    mu: &Mu,
    parameter: &str,
    index: usize,
    epsilon: Option<f64>,
) -> Result<f64> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let value = mu.component(parameter, index)?;

    // Adapt epsilon to parameter scale
    let step = if value.abs() > 1.0 { value.abs() * eps } else { eps };

    let forward = mu.with_component(parameter, index, value + step)?;
    let backward = mu.with_component(parameter, index, value - step)?;

    let f_forward = functional.evaluate(&forward)?;
    let f_backward = functional.evaluate(&backward)?;

    Ok((f_forward - f_backward) / (2.0 * step))
}

/// Largest absolute difference between the analytic gradient and a central
/// finite-difference approximation at `mu`.
///
/// Useful for checking that the derivative formulas supplied to an expression
/// functional match its formula.
pub fn check_gradient(functional: &Functional, mu: &Mu, config: &SensitivityConfig) -> Result<f64> {
    let parameters: &Parameters = functional.parameters();
    let analytic = gradient(functional, mu)?;
    let mut max_error: f64 = 0.0;
    for ((parameter, index), exact) in parameters.components().iter().zip(analytic.iter()) {
        let approx = finite_difference(functional, mu, parameter, *index, Some(config.epsilon))?;
        max_error = max_error.max((approx - exact).abs());
    }
    Ok(max_error)
}
