use globe_sem::quadrature::GllOperator;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::SVector;

#[test]
fn gll_operator_tables_are_consistent() {
    let op = GllOperator::<f64, 5>::new();
    let w = op.weights();
    let h = op.hprime();

    for a in 0..5 {
        assert_scalar_eq!(h.row(a).sum(), 0.0, comp = abs, tol = 1e-12);
    }
    for i in 0..5 {
        for a in 0..5 {
            assert_scalar_eq!(op.hprime_wgll()[(i, a)], w[a] * h[(a, i)], comp = abs, tol = 1e-15);
            assert_scalar_eq!(op.weight_products()[(i, a)], w[i] * w[a], comp = abs, tol = 1e-15);
        }
    }
    assert_scalar_eq!(w.sum(), 2.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(op.weight_products().sum(), 4.0, comp = abs, tol = 1e-13);

    // Corner entries of the GLL derivative matrix are -+ N (N + 1) / 4, with N = 4
    assert_scalar_eq!(h[(0, 0)], -5.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(h[(4, 4)], 5.0, comp = abs, tol = 1e-12);
}

#[test]
fn hprime_differentiates_polynomials_exactly() {
    let op = GllOperator::<f64, 6>::new();
    let x = op.points();
    let p = x.map(|x| x.powi(5) - 2.0 * x.powi(3) + x);
    let dp = x.map(|x| 5.0 * x.powi(4) - 6.0 * x.powi(2) + 1.0);
    assert_matrix_eq!(op.hprime() * p, dp, comp = abs, tol = 1e-12);
}

#[test]
fn weak_derivative_integrates_by_parts() {
    // sum_a w_a l_i'(x_a) f(x_a) = int f l_i' for polynomial f of low degree. With f = 1 the
    // result is l_i(1) - l_i(-1)
    let op = GllOperator::<f64, 5>::new();
    let ones = SVector::<f64, 5>::repeat(1.0);
    let mut expected = SVector::<f64, 5>::zeros();
    expected[0] = -1.0;
    expected[4] = 1.0;
    assert_matrix_eq!(op.hprime_wgll() * ones, expected, comp = abs, tol = 1e-13);
}

#[test]
fn interpolation_weights_are_cardinal_and_partition_unity() {
    let op = GllOperator::<f64, 5>::new();
    let at_node = op.interpolation_weights(op.points()[2]);
    let mut expected = SVector::<f64, 5>::zeros();
    expected[2] = 1.0;
    assert_eq!(at_node, expected);

    let weights = op.interpolation_weights(0.37);
    assert_scalar_eq!(weights.sum(), 1.0, comp = abs, tol = 1e-14);
    // Linear functions are reproduced
    assert_scalar_eq!(weights.dot(op.points()), 0.37, comp = abs, tol = 1e-14);
}

#[test]
fn single_precision_operator_matches_double_precision() {
    let op32 = GllOperator::<f32, 5>::new();
    let op64 = GllOperator::<f64, 5>::new();
    let h64 = op64.hprime().map(|x| x as f32);
    assert_matrix_eq!(*op32.hprime(), h64, comp = abs, tol = 1e-5);
}
