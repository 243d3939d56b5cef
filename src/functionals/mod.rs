//! # Parameter Functionals
//!
//! Scalar quantities that depend on a parameter value and know their own partial
//! derivatives. Every functional implements [`ParameterFunctional`]: it can be
//! evaluated at a [`Mu`] and differentiated with respect to one component of a named
//! parameter, producing another functional.
//!
//! ## Core Components
//!
//! - [`Functional`]: shared handle to any functional, with `*`, `+`, `-` operators
//! - [`ConstantFunctional`]: a fixed scalar
//! - [`ProjectionFunctional`]: one component of one parameter
//! - [`ExpressionFunctional`]: a formula with explicitly supplied derivative formulas
//! - [`ProductFunctional`]: product of factors, differentiated by the product rule
//! - [`LincombFunctional`]: weighted sum of functionals
//! - [`DerivativeCache`]: per-instance memoization of derivatives
//!
//! ## Example Usage
//!
//! ```rust
//! use mordiff_rs::functionals::Functional;
//! use mordiff_rs::parameters::Mu;
//!
//! let pf = Functional::projection("mu", 2, 0).unwrap();
//! let f = &pf * &pf * 3.0;
//! let mu = Mu::new().with("mu", [10.0, 2.0]);
//!
//! assert_eq!(f.evaluate(&mu).unwrap(), 300.0);
//! assert_eq!(f.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 60.0);
//! assert_eq!(f.d_mu("mu", 1).unwrap().evaluate(&mu).unwrap(), 0.0);
//! ```

pub mod cache;
pub mod constant;
pub mod expression;
pub mod lincomb;
pub mod product;
pub mod projection;

pub use cache::DerivativeCache;
pub use constant::ConstantFunctional;
pub use expression::{
    DerivativeTable, ExpressionDefinition, ExpressionFunctional, SecondDerivativeTable,
};
pub use lincomb::LincombFunctional;
pub use product::ProductFunctional;
pub use projection::ProjectionFunctional;

use crate::error::Result;
use crate::parameters::{Mu, Parameters};
use std::fmt;
use std::ops::{Add, Deref, Mul, Neg, Sub};
use std::sync::{Arc, OnceLock};

/// A scalar function of a parameter value that can produce its own partial derivatives
///
/// Implementors provide evaluation and the uncached derivative computation; the
/// provided [`d_mu`](ParameterFunctional::d_mu) checks the requested direction and
/// memoizes results in the instance's [`DerivativeCache`].
pub trait ParameterFunctional: fmt::Debug + Send + Sync {
    /// Identifier used in diagnostics
    fn name(&self) -> &str;

    /// The parameters this functional depends on
    fn parameters(&self) -> &Parameters;

    /// Evaluate the functional at a parameter value
    fn evaluate(&self, mu: &Mu) -> Result<f64>;

    /// The cache owned by this instance
    fn derivative_cache(&self) -> &DerivativeCache;

    /// Compute the derivative with respect to component `index` of `parameter`
    ///
    /// Called at most once per direction by [`d_mu`](ParameterFunctional::d_mu);
    /// `index` has already been checked against [`parameters`](ParameterFunctional::parameters).
    fn compute_d_mu(&self, parameter: &str, index: usize) -> Result<Functional>;

    /// The derivative with respect to component `index` of `parameter`
    ///
    /// Differentiating with respect to a parameter the functional does not depend on
    /// yields the constant zero. An index beyond the declared dimension is an error.
    fn d_mu(&self, parameter: &str, index: usize) -> Result<Functional> {
        self.parameters().check_index(parameter, index)?;
        self.derivative_cache()
            .get_or_try_insert_with(parameter, index, || self.compute_d_mu(parameter, index))
    }

    /// The derivative with respect to a one-dimensional parameter
    ///
    /// Shorthand for `d_mu(parameter, 0)`; every other direction takes an explicit
    /// component index.
    fn d_mu_scalar(&self, parameter: &str) -> Result<Functional> {
        self.d_mu(parameter, 0)
    }

    /// The value of the functional if it does not depend on the parameter value
    fn constant_value(&self) -> Option<f64> {
        None
    }
}

/// Shared handle to a parameter functional
///
/// Cloning is cheap and preserves identity, which [`Functional::ptr_eq`] exposes.
#[derive(Clone)]
pub struct Functional(Arc<dyn ParameterFunctional>);

impl Functional {
    /// Wrap a functional in a shared handle
    pub fn new<F: ParameterFunctional + 'static>(functional: F) -> Self {
        Self(Arc::new(functional))
    }

    /// A constant functional
    pub fn constant(value: f64) -> Self {
        Self::new(ConstantFunctional::new(value))
    }

    /// The shared constant zero
    pub fn zero() -> Self {
        static ZERO: OnceLock<Functional> = OnceLock::new();
        ZERO.get_or_init(|| Functional::constant(0.0)).clone()
    }

    /// The shared constant one
    pub fn one() -> Self {
        static ONE: OnceLock<Functional> = OnceLock::new();
        ONE.get_or_init(|| Functional::constant(1.0)).clone()
    }

    /// Component `index` of the `dim`-dimensional parameter `parameter`
    pub fn projection(parameter: &str, dim: usize, index: usize) -> Result<Self> {
        Ok(Self::new(ProjectionFunctional::new(parameter, dim, index)?))
    }

    /// Whether two handles refer to the same functional instance
    pub fn ptr_eq(a: &Functional, b: &Functional) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Whether this functional is the constant zero
    pub fn is_zero(&self) -> bool {
        self.constant_value() == Some(0.0)
    }

    /// Whether this functional is the constant one
    pub fn is_one(&self) -> bool {
        self.constant_value() == Some(1.0)
    }
}

impl Deref for Functional {
    type Target = dyn ParameterFunctional;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for Functional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Functional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<f64> for Functional {
    fn from(value: f64) -> Self {
        Functional::constant(value)
    }
}

// Arithmetic between functionals and scalars. Scalars become constant functionals.

impl Mul<&Functional> for &Functional {
    type Output = Functional;

    fn mul(self, rhs: &Functional) -> Functional {
        Functional::new(ProductFunctional::new(vec![self.clone(), rhs.clone()]))
    }
}

impl Mul<Functional> for Functional {
    type Output = Functional;

    fn mul(self, rhs: Functional) -> Functional {
        &self * &rhs
    }
}

impl Mul<f64> for &Functional {
    type Output = Functional;

    fn mul(self, rhs: f64) -> Functional {
        self * &Functional::constant(rhs)
    }
}

impl Mul<f64> for Functional {
    type Output = Functional;

    fn mul(self, rhs: f64) -> Functional {
        &self * rhs
    }
}

impl Mul<&Functional> for f64 {
    type Output = Functional;

    fn mul(self, rhs: &Functional) -> Functional {
        &Functional::constant(self) * rhs
    }
}

impl Mul<Functional> for f64 {
    type Output = Functional;

    fn mul(self, rhs: Functional) -> Functional {
        self * &rhs
    }
}

impl Add<&Functional> for &Functional {
    type Output = Functional;

    fn add(self, rhs: &Functional) -> Functional {
        Functional::new(LincombFunctional::from_terms(vec![
            (self.clone(), 1.0),
            (rhs.clone(), 1.0),
        ]))
    }
}

impl Add<Functional> for Functional {
    type Output = Functional;

    fn add(self, rhs: Functional) -> Functional {
        &self + &rhs
    }
}

impl Add<f64> for &Functional {
    type Output = Functional;

    fn add(self, rhs: f64) -> Functional {
        self + &Functional::constant(rhs)
    }
}

impl Add<f64> for Functional {
    type Output = Functional;

    fn add(self, rhs: f64) -> Functional {
        &self + rhs
    }
}

impl Add<&Functional> for f64 {
    type Output = Functional;

    fn add(self, rhs: &Functional) -> Functional {
        &Functional::constant(self) + rhs
    }
}

impl Add<Functional> for f64 {
    type Output = Functional;

    fn add(self, rhs: Functional) -> Functional {
        self + &rhs
    }
}

impl Sub<&Functional> for &Functional {
    type Output = Functional;

    fn sub(self, rhs: &Functional) -> Functional {
        Functional::new(LincombFunctional::from_terms(vec![
            (self.clone(), 1.0),
            (rhs.clone(), -1.0),
        ]))
    }
}

impl Sub<Functional> for Functional {
    type Output = Functional;

    fn sub(self, rhs: Functional) -> Functional {
        &self - &rhs
    }
}

impl Sub<f64> for &Functional {
    type Output = Functional;

    fn sub(self, rhs: f64) -> Functional {
        self - &Functional::constant(rhs)
    }
}

impl Sub<f64> for Functional {
    type Output = Functional;

    fn sub(self, rhs: f64) -> Functional {
        &self - rhs
    }
}

impl Sub<&Functional> for f64 {
    type Output = Functional;

    fn sub(self, rhs: &Functional) -> Functional {
        &Functional::constant(self) - rhs
    }
}

impl Sub<Functional> for f64 {
    type Output = Functional;

    fn sub(self, rhs: Functional) -> Functional {
        self - &rhs
    }
}

impl Neg for &Functional {
    type Output = Functional;

    fn neg(self) -> Functional {
        Functional::new(LincombFunctional::from_terms(vec![(self.clone(), -1.0)]))
    }
}

impl Neg for Functional {
    type Output = Functional;

    fn neg(self) -> Functional {
        -&self
    }
}
