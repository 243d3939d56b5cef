//! Tests for expression functionals

use crate::test_helpers::{quadratic_with_sine, reference_mu, table};
use approx::assert_relative_eq;
use mordiff_rs::error::MorDiffError;
use mordiff_rs::functionals::{
    DerivativeTable, ExpressionDefinition, ExpressionFunctional, Functional, ParameterFunctional,
    SecondDerivativeTable,
};
use mordiff_rs::parameters::{Mu, Parameters};
use std::collections::BTreeMap;

#[test]
fn test_first_derivatives() {
    let epf = quadratic_with_sine();
    let mu = reference_mu();

    assert_eq!(epf.evaluate(&mu).unwrap(), 100.0 * 100.0 + 2.0 * 2.0 * 10.0);
    assert_eq!(epf.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 2000.0);
    assert_eq!(epf.d_mu("mu", 1).unwrap().evaluate(&mu).unwrap(), 20.0);
    assert_eq!(epf.d_mu("nu", 0).unwrap().evaluate(&mu).unwrap(), 1.0);
}

#[test]
fn test_second_derivatives() {
    let epf = quadratic_with_sine();
    let mu = reference_mu();

    let second = |a: (&str, usize), b: (&str, usize)| {
        epf.d_mu(a.0, a.1)
            .unwrap()
            .d_mu(b.0, b.1)
            .unwrap()
            .evaluate(&mu)
            .unwrap()
    };

    assert_eq!(second(("mu", 0), ("mu", 0)), 200.0);
    assert_eq!(second(("mu", 0), ("mu", 1)), 2.0);
    assert_eq!(second(("mu", 0), ("nu", 0)), 0.0);
    assert_eq!(second(("mu", 1), ("mu", 0)), 2.0);
    assert_eq!(second(("mu", 1), ("mu", 1)), 0.0);
    assert_eq!(second(("mu", 1), ("nu", 0)), 0.0);
    assert_eq!(second(("nu", 0), ("mu", 0)), 0.0);
    assert_eq!(second(("nu", 0), ("mu", 1)), 0.0);
    // -sin(0) is negative zero
    assert_eq!(second(("nu", 0), ("nu", 0)), 0.0);
}

#[test]
fn test_third_derivatives_are_zero() {
    let epf = quadratic_with_sine();
    let d3 = epf
        .d_mu("nu", 0)
        .unwrap()
        .d_mu("nu", 0)
        .unwrap()
        .d_mu("nu", 0)
        .unwrap();
    assert!(d3.is_zero());
    assert_eq!(d3.evaluate(&reference_mu()).unwrap(), 0.0);
}

#[test]
fn test_derivative_names() {
    let epf = quadratic_with_sine();
    let d = epf.d_mu("mu", 1).unwrap();
    assert_eq!(
        d.name(),
        "functional_with_derivative_and_second_derivative_d_mu_1"
    );
    assert_eq!(
        d.d_mu("mu", 0).unwrap().name(),
        "functional_with_derivative_and_second_derivative_d_mu_1_d_mu_0"
    );
}

#[test]
fn test_scalar_parameter_formula() {
    // A one-dimensional parameter may be referenced without an index
    let f = ExpressionFunctional::new(
        "mu**2",
        Parameters::from_dims([("mu", 1)]).unwrap(),
        "square",
        table(&[("mu", &["2*mu"])]),
        SecondDerivativeTable::from([("mu".to_string(), vec![table(&[("mu", &["2"])])])]),
    )
    .unwrap();
    let mu = Mu::new().with("mu", 3.0);

    assert_eq!(f.evaluate(&mu).unwrap(), 9.0);
    assert_eq!(f.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 6.0);
    assert_eq!(
        f.d_mu("mu", 0)
            .unwrap()
            .d_mu("mu", 0)
            .unwrap()
            .evaluate(&mu)
            .unwrap(),
        2.0
    );
}

#[test]
fn test_vector_formula_reduces_to_scalar() {
    let f = ExpressionFunctional::new(
        "sum(mu**2)",
        Parameters::from_dims([("mu", 3)]).unwrap(),
        "norm_squared",
        table(&[("mu", &["2*mu[0]", "2*mu[1]", "2*mu[2]"])]),
        BTreeMap::new(),
    )
    .unwrap();
    let mu = Mu::new().with("mu", [1.0, 2.0, 3.0]);
    assert_eq!(f.evaluate(&mu).unwrap(), 14.0);
    assert_eq!(f.d_mu("mu", 2).unwrap().evaluate(&mu).unwrap(), 6.0);
}

#[test]
fn test_vector_valued_formula_is_an_error() {
    let f = ExpressionFunctional::without_derivatives(
        "mu * 2",
        Parameters::from_dims([("mu", 2)]).unwrap(),
        "vector",
    );
    let mu = Mu::new().with("mu", [1.0, 2.0]);
    assert!(matches!(
        f.evaluate(&mu),
        Err(MorDiffError::Evaluation { .. })
    ));
}

#[test]
fn test_decimal_constants_in_formulas() {
    let f = ExpressionFunctional::without_derivatives(
        "mu[0] * 0.5",
        Parameters::from_dims([("mu", 1)]).unwrap(),
        "half",
    );
    assert_eq!(f.evaluate(&Mu::new().with("mu", 4.0)).unwrap(), 2.0);

    // Trailing decimals in derivative formulas feed gradients
    let g = ExpressionFunctional::new(
        "0.25 * mu[0]**2",
        Parameters::from_dims([("mu", 1)]).unwrap(),
        "quarter_square",
        table(&[("mu", &["mu[0] * 0.5"])]),
        BTreeMap::new(),
    )
    .unwrap();
    let mu = Mu::new().with("mu", 3.0);
    assert_eq!(g.evaluate(&mu).unwrap(), 2.25);
    assert_eq!(g.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 1.5);
}

#[test]
fn test_table_shape_errors() {
    let parameters = Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap();

    // Too few formulas for mu
    let result = ExpressionFunctional::new(
        "mu[0]",
        parameters.clone(),
        "f",
        table(&[("mu", &["1"]), ("nu", &["0"])]),
        BTreeMap::new(),
    );
    assert!(matches!(result, Err(MorDiffError::DerivativeTableShape(_))));

    // Undeclared parameter
    let result = ExpressionFunctional::new(
        "mu[0]",
        parameters.clone(),
        "f",
        table(&[("xi", &["1"])]),
        BTreeMap::new(),
    );
    assert!(matches!(result, Err(MorDiffError::DerivativeTableShape(_))));

    // Missing second derivative row
    let result = ExpressionFunctional::new(
        "mu[0]",
        parameters,
        "f",
        table(&[("mu", &["1", "0"]), ("nu", &["0"])]),
        SecondDerivativeTable::from([
            (
                "mu".to_string(),
                vec![table(&[("mu", &["0", "0"]), ("nu", &["0"])])],
            ),
            ("nu".to_string(), vec![DerivativeTable::new()]),
        ]),
    );
    assert!(matches!(result, Err(MorDiffError::DerivativeTableShape(_))));
}

#[test]
fn test_partial_tables() {
    let parameters = Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap();

    // A table naming nu but not mu would silently zero d/dmu
    let result = ExpressionFunctional::new(
        "mu[0] + 3 * nu[0]",
        parameters.clone(),
        "partial",
        table(&[("nu", &["3"])]),
        BTreeMap::new(),
    );
    assert!(matches!(result, Err(MorDiffError::DerivativeTableShape(_))));

    // Explicit zeros for mu are accepted
    let f = ExpressionFunctional::new(
        "mu[0] + 3 * nu[0]",
        parameters.clone(),
        "partial",
        table(&[("mu", &["1", "0"]), ("nu", &["3"])]),
        BTreeMap::new(),
    )
    .unwrap();
    let mu = reference_mu();

    assert_eq!(f.evaluate(&mu).unwrap(), 10.0);
    assert_eq!(f.d_mu("nu", 0).unwrap().evaluate(&mu).unwrap(), 3.0);
    assert_eq!(f.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 1.0);
    assert!(f.d_mu("mu", 1).unwrap().is_zero());

    // No table at all: every derivative is zero
    let g = ExpressionFunctional::new(
        "mu[0] + 3 * nu[0]",
        parameters,
        "untabulated",
        BTreeMap::new(),
        BTreeMap::new(),
    )
    .unwrap();
    assert!(g.d_mu("mu", 0).unwrap().is_zero());
    assert!(g.d_mu("nu", 0).unwrap().is_zero());
}

#[test]
fn test_malformed_formulas() {
    let parameters = Parameters::from_dims([("mu", 1)]).unwrap();

    // Malformed main formula fails on evaluation
    let f = ExpressionFunctional::without_derivatives("mu +* 2", parameters.clone(), "broken");
    assert!(f.evaluate(&Mu::new().with("mu", 1.0)).is_err());

    // Malformed derivative formula fails when the derivative is requested
    let g = ExpressionFunctional::new(
        "mu",
        parameters,
        "g",
        table(&[("mu", &["(1"])]),
        BTreeMap::new(),
    )
    .unwrap();
    assert_eq!(g.evaluate(&Mu::new().with("mu", 4.0)).unwrap(), 4.0);
    assert!(matches!(
        g.d_mu("mu", 0),
        Err(MorDiffError::Evaluation { .. })
    ));
    // Failed derivatives are not cached
    assert!(g.derivative_cache().is_empty());
}

#[test]
fn test_json_definition() {
    let json = r#"{
        "expression": "100 * mu[0] + 2 * mu[1] * mu[0] + sin(nu[0])",
        "parameters": {"mu": 2, "nu": 1},
        "name": "functional_with_derivative",
        "derivative_expressions": {"mu": ["100", "2 * mu[0]"], "nu": ["cos(nu[0])"]},
        "second_derivative_expressions": {
            "mu": [{"mu": ["0", "2"], "nu": ["0"]}, {"mu": ["2", "0"], "nu": ["0"]}],
            "nu": [{"mu": ["0", "0"], "nu": ["-sin(nu[0])"]}]
        }
    }"#;

    let f = ExpressionFunctional::from_json(json).unwrap();
    let mu = reference_mu();
    assert_eq!(f.evaluate(&mu).unwrap(), 1040.0);
    assert_eq!(
        f.d_mu("mu", 1)
            .unwrap()
            .d_mu("mu", 0)
            .unwrap()
            .evaluate(&mu)
            .unwrap(),
        2.0
    );

    // Round trip through the definition
    let reloaded = ExpressionFunctional::from_json(&f.to_json().unwrap()).unwrap();
    assert_eq!(reloaded.definition(), f.definition());

    // Name defaults to the formula
    let unnamed: ExpressionDefinition =
        serde_json::from_str(r#"{"expression": "mu[0]", "parameters": {"mu": 2}}"#).unwrap();
    let g = ExpressionFunctional::from_definition(unnamed).unwrap();
    assert_eq!(g.name(), "mu[0]");
    assert!(g.derivative_expressions().is_empty());
}

#[test]
fn test_load_json_file() {
    let path = std::env::temp_dir().join(format!("mordiff_rs_load_json_{}.json", std::process::id()));
    let f = ExpressionFunctional::new(
        "mu[0] * mu[1]",
        Parameters::from_dims([("mu", 2)]).unwrap(),
        "bilinear",
        table(&[("mu", &["mu[1]", "mu[0]"])]),
        BTreeMap::new(),
    )
    .unwrap();
    std::fs::write(&path, f.to_json().unwrap()).unwrap();

    let loaded = ExpressionFunctional::load_json(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mu = Mu::new().with("mu", [3.0, 4.0]);
    assert_eq!(loaded.evaluate(&mu).unwrap(), 12.0);
    assert_eq!(loaded.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 4.0);

    assert!(matches!(
        ExpressionFunctional::load_json(std::env::temp_dir().join("mordiff_rs_missing.json")),
        Err(MorDiffError::IoError(_))
    ));
}

#[test]
fn test_expression_in_arithmetic() {
    let epf = quadratic_with_sine();
    let pf = Functional::projection("nu", 1, 0).unwrap();
    let f = &epf - &(2.0 * &pf);
    let mu = reference_mu().with("nu", 0.5);

    assert_relative_eq!(
        f.evaluate(&mu).unwrap(),
        10040.0 + 0.5_f64.sin() - 1.0,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        f.d_mu("nu", 0).unwrap().evaluate(&mu).unwrap(),
        0.5_f64.cos() - 2.0,
        epsilon = 1e-12
    );
}
