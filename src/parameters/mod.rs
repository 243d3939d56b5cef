//! # Parameter System
//!
//! This module defines the parameter space that functionals depend on and the values
//! they are evaluated at.
//!
//! ## Core Components
//!
//! - [`Parameters`]: An ordered set of named parameters with fixed component counts
//! - [`Mu`]: A parameter value binding names to component vectors
//! - [`Expression`]: Parse and evaluate the formulas used by expression functionals
//!
//! ## Example Usage
//!
//! ```rust
//! use mordiff_rs::parameters::{Mu, Parameters};
//!
//! // Declare a parameter space
//! let params = Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap();
//!
//! // Build a value for it; lengths are checked against the declared dimensions
//! let mu = params.parse([("mu", vec![10.0, 2.0]), ("nu", vec![0.0])]).unwrap();
//! assert_eq!(mu.component("mu", 0).unwrap(), 10.0);
//!
//! // Values can also be built directly; scalars become one-component vectors
//! let other = Mu::new().with("mu", [10.0, 2.0]).with("nu", 0.0);
//! assert_eq!(mu, other);
//! ```

pub mod expression;
pub mod mu;
pub mod parameters;


// Re-export key types
pub use expression::{EvaluationContext, Expression, ExpressionError, SimpleContext, Value};
pub use mu::{IntoComponents, Mu};
pub use parameters::{ParameterError, Parameters};
