//! Tests for derivatives of linear combinations of operators

use crate::test_helpers::{reference_mu, table};
use mordiff_rs::error::MorDiffError;
use mordiff_rs::functionals::{ExpressionFunctional, Functional, SecondDerivativeTable};
use mordiff_rs::operators::{Coefficient, LincombOperator, MatrixOperator, Operator, ZeroOperator};
use mordiff_rs::parameters::Parameters;
use ndarray::array;
use std::sync::Arc;

fn reference_operator() -> LincombOperator {
    let first = table(&[("mu", &["100", "2 * mu[0]"]), ("nu", &["cos(nu[0])"])]);
    let second = SecondDerivativeTable::from([
        (
            "mu".to_string(),
            vec![
                table(&[("mu", &["0", "2"]), ("nu", &["0"])]),
                table(&[("mu", &["2", "0"]), ("nu", &["0"])]),
            ],
        ),
        (
            "nu".to_string(),
            vec![table(&[("mu", &["0", "0"]), ("nu", &["-sin(nu[0])"])])],
        ),
    ]);

    let pf = Functional::projection("mu", 2, 0).unwrap();
    let epf = Functional::new(
        ExpressionFunctional::new(
            "100 * mu[0] + 2 * mu[1] * mu[0] + sin(nu[0])",
            Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap(),
            "functional_with_derivative",
            first,
            second,
        )
        .unwrap(),
    );

    let zero_op: Arc<dyn Operator> = Arc::new(ZeroOperator::new(1, 1));
    LincombOperator::new(
        vec![zero_op.clone(), zero_op.clone(), zero_op],
        vec![Coefficient::from(1.0), pf.into(), epf.into()],
    )
    .unwrap()
}

#[test]
fn test_coefficients_and_first_derivatives() {
    let operator = reference_operator();
    let mu = reference_mu();

    assert_eq!(
        operator.evaluate_coefficients(&mu).unwrap(),
        vec![1.0, 10.0, 1040.0]
    );
    assert_eq!(
        operator.d_mu("mu", 0).unwrap().evaluate_coefficients(&mu).unwrap(),
        vec![0.0, 1.0, 100.0]
    );
    assert_eq!(
        operator.d_mu("mu", 1).unwrap().evaluate_coefficients(&mu).unwrap(),
        vec![0.0, 0.0, 20.0]
    );
    assert_eq!(
        operator.d_mu("nu", 0).unwrap().evaluate_coefficients(&mu).unwrap(),
        vec![0.0, 0.0, 1.0]
    );
}

#[test]
fn test_second_derivatives() {
    let operator = reference_operator();
    let mu = reference_mu();

    let hessian_coefficients = |a: (&str, usize), b: (&str, usize)| {
        operator
            .d_mu(a.0, a.1)
            .unwrap()
            .d_mu(b.0, b.1)
            .unwrap()
            .evaluate_coefficients(&mu)
            .unwrap()
    };

    assert_eq!(hessian_coefficients(("mu", 0), ("mu", 0)), vec![0.0, 0.0, 0.0]);
    assert_eq!(hessian_coefficients(("mu", 0), ("mu", 1)), vec![0.0, 0.0, 2.0]);
    assert_eq!(hessian_coefficients(("mu", 0), ("nu", 0)), vec![0.0, 0.0, 0.0]);
    assert_eq!(hessian_coefficients(("mu", 1), ("mu", 0)), vec![0.0, 0.0, 2.0]);
    assert_eq!(hessian_coefficients(("mu", 1), ("mu", 1)), vec![0.0, 0.0, 0.0]);
    assert_eq!(hessian_coefficients(("mu", 1), ("nu", 0)), vec![0.0, 0.0, 0.0]);
    assert_eq!(hessian_coefficients(("nu", 0), ("mu", 0)), vec![0.0, 0.0, 0.0]);
    assert_eq!(hessian_coefficients(("nu", 0), ("mu", 1)), vec![0.0, 0.0, 0.0]);
    assert_eq!(hessian_coefficients(("nu", 0), ("nu", 0)), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_derivatives_keep_operator_order() {
    let operator = reference_operator();
    let derivative = operator.d_mu("mu", 0).unwrap().d_mu("nu", 0).unwrap();

    assert_eq!(derivative.len(), 3);
    for (a, b) in operator.operators().iter().zip(derivative.operators()) {
        assert!(Arc::ptr_eq(a, b));
    }
    assert!(!derivative.coefficients()[0].is_parametric());
    assert!(derivative.coefficients()[1].is_parametric());
}

#[test]
fn test_derivative_index_out_of_range() {
    let operator = reference_operator();
    assert!(matches!(
        operator.d_mu("mu", 2),
        Err(MorDiffError::Parameter(_))
    ));
    assert!(operator.d_mu("nu", 1).is_err());
}

#[test]
fn test_parameters_of_combination() {
    let params = reference_operator().parameters();
    assert_eq!(params, Parameters::from_dims([("mu", 2), ("nu", 1)]).unwrap());
}

#[test]
fn test_apply_sensitivity() {
    // A(mu) = mu[0] * M0 + mu[0] * mu[1] * M1
    let m0: Arc<dyn Operator> = Arc::new(MatrixOperator::new(array![[2.0, 0.0], [0.0, 1.0]]));
    let m1: Arc<dyn Operator> = Arc::new(MatrixOperator::new(array![[0.0, 1.0], [1.0, 0.0]]));
    let p0 = Functional::projection("mu", 2, 0).unwrap();
    let p1 = Functional::projection("mu", 2, 1).unwrap();
    let operator = LincombOperator::new(
        vec![m0, m1],
        vec![p0.clone().into(), (&p0 * &p1).into()],
    )
    .unwrap();

    let mu = reference_mu();
    let u = array![1.0, 3.0];

    // 10 * [2, 3] + 20 * [3, 1]
    assert_eq!(operator.apply(&u, &mu).unwrap(), array![80.0, 50.0]);
    // d/dmu1: 0 * [2, 3] + 10 * [3, 1]
    assert_eq!(
        operator.d_mu("mu", 1).unwrap().apply(&u, &mu).unwrap(),
        array![30.0, 10.0]
    );
    // Wrong source dimension
    assert!(matches!(
        operator.apply(&array![1.0], &mu),
        Err(MorDiffError::DimensionMismatch(_))
    ));
}
