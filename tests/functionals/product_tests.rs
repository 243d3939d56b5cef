//! Tests for products of functionals

use crate::test_helpers::table;
use mordiff_rs::error::MorDiffError;
use mordiff_rs::functionals::{
    ExpressionFunctional, Functional, ProductFunctional, SecondDerivativeTable,
};
use mordiff_rs::parameters::{Mu, ParameterError, Parameters};

fn square() -> Functional {
    Functional::new(
        ExpressionFunctional::new(
            "mu**2",
            Parameters::from_dims([("mu", 1)]).unwrap(),
            "functional_with_derivative_and_second_derivative",
            table(&[("mu", &["2*mu"])]),
            SecondDerivativeTable::from([("mu".to_string(), vec![table(&[("mu", &["2"])])])]),
        )
        .unwrap(),
    )
}

#[test]
fn test_projection_times_scalars() {
    let pf = Functional::projection("mu", 2, 0).unwrap();
    let productf = &pf * 2.0 * 3.0;
    let mu = Mu::new().with("mu", [10.0, 2.0]);

    assert_eq!(productf.evaluate(&mu).unwrap(), 60.0);
    assert_eq!(productf.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 6.0);
    assert_eq!(productf.d_mu("mu", 1).unwrap().evaluate(&mu).unwrap(), 0.0);

    for i in 0..2 {
        for j in 0..2 {
            let d = productf.d_mu("mu", i).unwrap().d_mu("mu", j).unwrap();
            assert_eq!(d.evaluate(&mu).unwrap(), 0.0);
        }
    }
}

#[test]
fn test_expression_times_scalar() {
    let productf = square() * 2.0;
    let mu = Mu::new().with("mu", 3.0);

    assert_eq!(productf.evaluate(&mu).unwrap(), 18.0);
    assert_eq!(productf.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 12.0);
    assert_eq!(
        productf
            .d_mu("mu", 0)
            .unwrap()
            .d_mu("mu", 0)
            .unwrap()
            .evaluate(&mu)
            .unwrap(),
        4.0
    );
}

#[test]
fn test_product_of_products() {
    let productf = square() * 2.0;
    let pp = &productf * &productf;
    let mu = Mu::new().with("mu", 3.0);

    // pp = 4 mu^4
    assert_eq!(pp.evaluate(&mu).unwrap(), 324.0);
    assert_eq!(pp.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 432.0);
    assert_eq!(
        pp.d_mu("mu", 0)
            .unwrap()
            .d_mu("mu", 0)
            .unwrap()
            .evaluate(&mu)
            .unwrap(),
        432.0
    );
}

#[test]
fn test_product_with_undeclared_parameter() {
    let pf = Functional::projection("mu", 2, 0).unwrap();
    let qf = Functional::projection("nu", 1, 0).unwrap();
    let product = &pf * &qf;
    let mu = Mu::new().with("mu", [10.0, 2.0]).with("nu", 4.0);

    assert_eq!(product.parameters().dim("mu"), Some(2));
    assert_eq!(product.parameters().dim("nu"), Some(1));
    assert_eq!(product.evaluate(&mu).unwrap(), 40.0);
    assert_eq!(product.d_mu("mu", 0).unwrap().evaluate(&mu).unwrap(), 4.0);
    assert_eq!(product.d_mu("nu", 0).unwrap().evaluate(&mu).unwrap(), 10.0);
    assert!(product.d_mu("xi", 0).unwrap().is_zero());
}

#[test]
fn test_checked_product() {
    let a = Functional::projection("mu", 2, 0).unwrap();
    let b = Functional::projection("mu", 3, 0).unwrap();

    assert!(matches!(
        ProductFunctional::checked(vec![a.clone(), b.clone()]),
        Err(MorDiffError::Parameter(ParameterError::ConflictingDimension { .. }))
    ));

    // The unchecked product keeps the first dimension and fails on evaluation
    let product = &a * &b;
    assert_eq!(product.parameters().dim("mu"), Some(2));
    assert!(product.evaluate(&Mu::new().with("mu", [1.0, 2.0])).is_err());

    assert!(ProductFunctional::checked(vec![a.clone(), a]).is_ok());
}
