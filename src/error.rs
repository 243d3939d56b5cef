use thiserror::Error;

use crate::parameters::expression::ExpressionError;
use crate::parameters::ParameterError;

/// Error types for the mordiff-rs library.
#[derive(Error, Debug)]
pub enum MorDiffError {
    /// Error raised by the parameter space or a parameter value.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Error raised by the expression parser or evaluator outside of a functional.
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// A formula of a named functional could not be parsed or evaluated.
    #[error("Cannot evaluate functional '{name}': {source}")]
    Evaluation {
        name: String,
        #[source]
        source: ExpressionError,
    },

    /// Derivative tables disagree with the declared parameter dimensions.
    #[error("Derivative table shape error: {0}")]
    DerivativeTableShape(String),

    /// Operators and coefficients of a linear combination differ in length.
    #[error("Length mismatch: {operators} operators but {coefficients} coefficients")]
    LengthMismatch {
        operators: usize,
        coefficients: usize,
    },

    /// Vector or matrix shapes do not fit together.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for mordiff-rs operations.
pub type Result<T> = std::result::Result<T, MorDiffError>;
