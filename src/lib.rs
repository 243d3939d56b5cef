//! # mordiff-rs
//!
//! `mordiff-rs` provides parameter functionals for model order reduction: scalar
//! quantities that depend on a named, vector-valued parameter and can produce their
//! own partial derivatives, to any order, as further functionals.
//!
//! The library provides:
//! - A parameter space and parameter values ([`parameters`])
//! - Constant, projection, expression, product and linear-combination functionals
//!   with per-instance derivative caching ([`functionals`])
//! - Parametric linear combinations of operators whose coefficients are functionals
//!   ([`operators`])
//! - Gradient and Hessian assembly and finite-difference checks ([`sensitivity`])
//!
//! ## Basic Usage
//!
//! ```
//! use mordiff_rs::functionals::Functional;
//! use mordiff_rs::parameters::Mu;
//!
//! let pf = Functional::projection("mu", 2, 0).unwrap();
//! let mu = Mu::new().with("mu", [10.0, 2.0]);
//!
//! assert_eq!(pf.evaluate(&mu).unwrap(), 10.0);
//! assert_eq!(pf.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 1.0);
//! assert_eq!(pf.d_mu("mu", 1).unwrap().evaluate(&mu).unwrap(), 0.0);
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

// Functional algebra
pub mod functionals;

pub mod operators;

pub mod sensitivity;

// Re-exports for convenience
pub use error::{MorDiffError, Result};
pub use functionals::{Functional, ParameterFunctional};
pub use operators::{Coefficient, LincombOperator, Operator};
pub use parameters::{Mu, Parameters};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
