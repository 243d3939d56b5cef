//! Expression parsing and evaluation for parameter functionals
//!
//! This module parses formula strings such as `100 * mu[0]**2 + sin(nu[0])` into an
//! AST and evaluates them against a binding of names to scalars or vectors. All
//! arithmetic and functions act elementwise, broadcasting length-one operands.

use crate::parameters::mu::Mu;
use ndarray::Array1;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::recognize_float,
    sequence::{delimited, pair},
    IResult, Parser,
};
use std::collections::HashMap;
use std::f64::consts;
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },

    #[error("Shape mismatch: cannot combine vectors of length {left} and {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("Index {index} out of bounds for vector of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Result type for expression evaluation
type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Component access (`mu[0]`)
    Index(Box<Expression>, Box<Expression>),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    ///
    /// A divisor with a zero in any component fails the whole evaluation with
    /// [`ExpressionError::DivisionByZero`] instead of yielding infinities or NaN
    /// in those components.
    Div,

    /// Power (** or ^)
    Pow,
}

/// Value produced while evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector(Array1<f64>),
}

impl Value {
    /// Reduce to a scalar; vectors of length one are accepted
    pub fn as_scalar(&self) -> ExprResult<f64> {
        match self {
            Self::Scalar(x) => Ok(*x),
            Self::Vector(v) if v.len() == 1 => Ok(v[0]),
            Self::Vector(v) => Err(ExpressionError::InvalidOperation {
                message: format!("expected a scalar, got a vector of length {}", v.len()),
            }),
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Self::Scalar(x) => Self::Scalar(f(x)),
            Self::Vector(v) => Self::Vector(v.mapv(f)),
        }
    }

    fn zip_with(self, other: Self, f: impl Fn(f64, f64) -> f64) -> ExprResult<Self> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Ok(Self::Scalar(f(a, b))),
            (Self::Scalar(a), Self::Vector(v)) => Ok(Self::Vector(v.mapv(|b| f(a, b)))),
            (Self::Vector(v), Self::Scalar(b)) => Ok(Self::Vector(v.mapv(|a| f(a, b)))),
            (Self::Vector(u), Self::Vector(v)) => {
                if u.len() == v.len() {
                    Ok(Self::Vector(
                        u.iter().zip(v.iter()).map(|(&a, &b)| f(a, b)).collect(),
                    ))
                } else if u.len() == 1 {
                    Ok(Self::Vector(v.mapv(|b| f(u[0], b))))
                } else if v.len() == 1 {
                    Ok(Self::Vector(u.mapv(|a| f(a, v[0]))))
                } else {
                    Err(ExpressionError::ShapeMismatch {
                        left: u.len(),
                        right: v.len(),
                    })
                }
            }
        }
    }

    fn contains_zero(&self) -> bool {
        match self {
            Self::Scalar(x) => *x == 0.0,
            Self::Vector(v) => v.iter().any(|&x| x == 0.0),
        }
    }

    fn values(&self) -> Vec<f64> {
        match self {
            Self::Scalar(x) => vec![*x],
            Self::Vector(v) => v.to_vec(),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Scalar(x)
    }
}

impl From<Array1<f64>> for Value {
    fn from(v: Array1<f64>) -> Self {
        Self::Vector(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(Array1::from_vec(v))
    }
}

/// Context for expression evaluation, providing variable values
pub trait EvaluationContext {
    /// Get the value of a variable
    fn get_variable(&self, name: &str) -> ExprResult<Value>;

    /// Check if a variable exists
    fn has_variable(&self, name: &str) -> bool;

    /// Get the names of all variables
    fn variable_names(&self) -> Vec<String>;
}

/// Simple implementation of EvaluationContext using a HashMap
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    /// Map of variable names to values
    variables: HashMap<String, Value>,
}

impl SimpleContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Set a variable value
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }

    /// Remove a variable
    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }
}

impl EvaluationContext for SimpleContext {
    fn get_variable(&self, name: &str) -> ExprResult<Value> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }
}

impl EvaluationContext for Mu {
    fn get_variable(&self, name: &str) -> ExprResult<Value> {
        self.get(name)
            .map(|v| Value::Vector(v.clone()))
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }
}

/// Named constants available to every expression unless shadowed by the context
fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(consts::PI),
        "e" => Some(consts::E),
        _ => None,
    }
}

/// Elementwise functions of one argument
fn builtin_unary(name: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "arcsin" | "asin" => f64::asin,
        "arccos" | "acos" => f64::acos,
        "arctan" | "atan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "exp" => f64::exp,
        "log" | "ln" => f64::ln,
        "log10" => f64::log10,
        "sqrt" => f64::sqrt,
        "abs" => f64::abs,
        "sign" => |x: f64| if x == 0.0 { 0.0 } else { x.signum() },
        _ => return None,
    };
    Some(f)
}

fn expect_args(name: &str, args: &[Value], expected: usize) -> ExprResult<()> {
    if args.len() != expected {
        return Err(ExpressionError::InvalidOperation {
            message: format!("{}() requires {} argument, got {}", name, expected, args.len()),
        });
    }
    Ok(())
}

fn call_function(name: &str, args: Vec<Value>) -> ExprResult<Value> {
    if let Some(f) = builtin_unary(name) {
        return match <[Value; 1]>::try_from(args) {
            Ok([arg]) => Ok(arg.map(f)),
            Err(args) => Err(ExpressionError::InvalidOperation {
                message: format!("{}() requires 1 argument, got {}", name, args.len()),
            }),
        };
    }

    match name {
        "min" | "max" => {
            let pick: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
            match args.len() {
                0 => Err(ExpressionError::InvalidOperation {
                    message: format!("{}() requires at least 1 argument, got 0", name),
                }),
                // A single argument is reduced over its components
                1 => {
                    let values = args[0].values();
                    let init = if name == "min" {
                        f64::INFINITY
                    } else {
                        f64::NEG_INFINITY
                    };
                    Ok(Value::Scalar(values.into_iter().fold(init, pick)))
                }
                _ => {
                    let mut iter = args.into_iter();
                    match iter.next() {
                        Some(first) => iter.try_fold(first, |acc, v| acc.zip_with(v, pick)),
                        None => Ok(Value::Scalar(f64::NAN)),
                    }
                }
            }
        }
        "sum" => {
            expect_args(name, &args, 1)?;
            Ok(Value::Scalar(args[0].values().iter().sum()))
        }
        "prod" => {
            expect_args(name, &args, 1)?;
            Ok(Value::Scalar(args[0].values().iter().product()))
        }
        _ => Err(ExpressionError::UndefinedFunction {
            name: name.to_string(),
        }),
    }
}

impl Expression {
    /// Parse an expression from a string
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expr_parser(input.trim()) {
            Ok((remainder, expr)) => {
                // Make sure the entire input was consumed
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<Value> {
        match self {
            Self::Number(n) => Ok(Value::Scalar(*n)),

            Self::Variable(name) => {
                if context.has_variable(name) {
                    context.get_variable(name)
                } else {
                    builtin_constant(name).map(Value::Scalar).ok_or_else(|| {
                        ExpressionError::UndefinedVariable {
                            name: name.to_string(),
                        }
                    })
                }
            }

            Self::Index(target, index) => {
                let target = target.evaluate(context)?;
                let index = index.evaluate(context)?.as_scalar()?;
                if index < 0.0 || index.fract() != 0.0 {
                    return Err(ExpressionError::InvalidOperation {
                        message: format!("index must be a non-negative integer, got {}", index),
                    });
                }
                let index = index as usize;
                match target {
                    Value::Vector(v) => v
                        .get(index)
                        .copied()
                        .map(Value::Scalar)
                        .ok_or(ExpressionError::IndexOutOfBounds {
                            index,
                            len: v.len(),
                        }),
                    Value::Scalar(_) => Err(ExpressionError::InvalidOperation {
                        message: "cannot index a scalar".to_string(),
                    }),
                }
            }

            Self::Unary(op, expr) => {
                let value = expr.evaluate(context)?;
                match op {
                    UnaryOp::Neg => Ok(value.map(|x| -x)),
                }
            }

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;

                match op {
                    BinaryOp::Add => lhs.zip_with(rhs, |a, b| a + b),
                    BinaryOp::Sub => lhs.zip_with(rhs, |a, b| a - b),
                    BinaryOp::Mul => lhs.zip_with(rhs, |a, b| a * b),
                    BinaryOp::Div => {
                        if rhs.contains_zero() {
                            Err(ExpressionError::DivisionByZero)
                        } else {
                            lhs.zip_with(rhs, |a, b| a / b)
                        }
                    }
                    BinaryOp::Pow => lhs.zip_with(rhs, f64::powf),
                }
            }

            Self::Function(name, args) => {
                let evaluated_args = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<ExprResult<Vec<_>>>()?;
                call_function(name, evaluated_args)
            }
        }
    }

    /// Evaluate the expression and reduce the result to a scalar
    pub fn evaluate_scalar<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        self.evaluate(context)?.as_scalar()
    }

    /// The value of the expression if it does not reference any variable
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Unary(UnaryOp::Neg, inner) => inner.constant_value().map(|x| -x),
            _ => None,
        }
    }

    /// Find all variable names used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    /// Recursively collect all variable names used in the expression
    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}

            Self::Variable(name) => {
                vars.push(name.clone());
            }

            Self::Index(target, index) => {
                target.collect_variables(vars);
                index.collect_variables(vars);
            }

            Self::Unary(_, expr) => {
                expr.collect_variables(vars);
            }

            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }

            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

// Parser functions using nom

type ParseError<'a> = nom::error::Error<&'a str>;

/// Skip optional whitespace
fn ws(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

/// Match a single character
fn symbol<'a>(c: char) -> impl Parser<&'a str, Output = char, Error = ParseError<'a>> {
    char(c)
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    let mut parser = recognize(pair(
        alt((alpha1::<&str, ParseError>, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));

    let (input, matched) = parser.parse(input)?;
    Ok((input, matched.to_string()))
}

/// Parse a comma-separated list of expressions (for function arguments)
fn args_list(input: &str) -> IResult<&str, Vec<Expression>> {
    let (mut remainder, first) = expr_parser(input)?;
    let mut res = vec![first];

    loop {
        let mut comma_parser = delimited(ws, symbol(','), ws);

        match comma_parser.parse(remainder) {
            Ok((after_comma, _)) => {
                let (after_expr, expr) = expr_parser(after_comma)?;
                res.push(expr);
                remainder = after_expr;
            }
            Err(_) => break,
        }
    }

    Ok((remainder, res))
}

/// Parse a function call
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = symbol('(').parse(input)?;
    let (input, _) = ws(input)?;

    // Handle empty arguments case
    if let Ok((input, _)) = symbol(')').parse(input) {
        return Ok((input, Expression::Function(name, vec![])));
    }

    let (input, args) = args_list(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = symbol(')').parse(input)?;

    Ok((input, Expression::Function(name, args)))
}

/// Parse an unsigned decimal number with optional fraction and exponent
///
/// Signs are handled by the unary and additive rules, never by the literal.
fn number(input: &str) -> IResult<&str, Expression> {
    if input.starts_with(['+', '-']) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        )));
    }
    let (remaining, text) = recognize_float::<&str, ParseError>(input)?;
    match text.parse::<f64>() {
        Ok(value) => Ok((remaining, Expression::Number(value))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Parse a variable reference
fn variable(input: &str) -> IResult<&str, Expression> {
    let (input, var_name) = identifier(input)?;
    Ok((input, Expression::Variable(var_name)))
}

/// Parse a parenthesized expression
fn parens(input: &str) -> IResult<&str, Expression> {
    let (input, _) = symbol('(').parse(input)?;
    let (input, expr) = expr_parser(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = symbol(')').parse(input)?;
    Ok((input, expr))
}

/// Parse a primary expression (number, function call, variable, or parenthesized expression)
fn primary(input: &str) -> IResult<&str, Expression> {
    if let Ok(result) = number(input) {
        return Ok(result);
    }

    if let Ok(result) = function_call(input) {
        return Ok(result);
    }

    if let Ok(result) = variable(input) {
        return Ok(result);
    }

    parens(input)
}

/// Parse a primary expression followed by any number of `[index]` suffixes
fn postfix(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut expr) = primary(input)?;

    loop {
        let (rest, _) = ws(input)?;
        match symbol('[').parse(rest) {
            Ok((rest, _)) => {
                let (rest, index) = expr_parser(rest)?;
                let (rest, _) = ws(rest)?;
                let (rest, _) = symbol(']').parse(rest)?;
                expr = Expression::Index(Box::new(expr), Box::new(index));
                input = rest;
            }
            Err(_) => return Ok((input, expr)),
        }
    }
}

/// Parse a power expression (expr ** expr), right-associative
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = postfix(input)?;
    let (after_space, _) = ws(input)?;

    let mut op_parser = alt((tag::<&str, &str, ParseError>("**"), tag("^")));
    match op_parser.parse(after_space) {
        Ok((after_op, _)) => {
            // The exponent may itself be signed: 2 ** -1
            let (after_exponent, exponent) = unary(after_op)?;
            Ok((
                after_exponent,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        Err(_) => Ok((input, base)),
    }
}

/// Parse a unary expression (-expr, +expr); binds looser than power
fn unary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = ws(input)?;

    if let Some(rest) = input.strip_prefix('-') {
        let (rest, expr) = unary(rest)?;
        return Ok((rest, Expression::Unary(UnaryOp::Neg, Box::new(expr))));
    }
    if let Some(rest) = input.strip_prefix('+') {
        return unary(rest);
    }

    power(input)
}

/// Parse a multiplicative expression (expr * expr, expr / expr), left-associative
fn term(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = unary(input)?;

    loop {
        let (rest, _) = ws(input)?;
        let op = match rest.chars().next() {
            Some('*') => BinaryOp::Mul,
            Some('/') => BinaryOp::Div,
            _ => return Ok((input, left)),
        };
        let (rest, right) = unary(&rest[1..])?;
        left = Expression::Binary(op, Box::new(left), Box::new(right));
        input = rest;
    }
}

/// Parse an additive expression (expr + expr, expr - expr), left-associative
fn expr_parser(input: &str) -> IResult<&str, Expression> {
    let (input, _) = ws(input)?;
    let (mut input, mut left) = term(input)?;

    loop {
        let (rest, _) = ws(input)?;
        let op = match rest.chars().next() {
            Some('+') => BinaryOp::Add,
            Some('-') => BinaryOp::Sub,
            _ => return Ok((input, left)),
        };
        let (rest, right) = term(&rest[1..])?;
        left = Expression::Binary(op, Box::new(left), Box::new(right));
        input = rest;
    }
}
