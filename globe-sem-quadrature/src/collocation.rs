//! Lagrange interpolation on a set of collocation points.
//!
//! All routines use the barycentric form of the Lagrange polynomials, which is stable for the
//! clustered point sets produced by Gauss-Lobatto-Legendre rules.

/// Barycentric weights $\lambda_b = 1 / \prod_{m \neq b} (x_b - x_m)$.
fn barycentric_weights(points: &[f64]) -> Vec<f64> {
    points
        .iter()
        .enumerate()
        .map(|(b, x_b)| {
            let product: f64 = points
                .iter()
                .enumerate()
                .filter(|(m, _)| *m != b)
                .map(|(_, x_m)| x_b - x_m)
                .product();
            1.0 / product
        })
        .collect()
}

/// Derivative matrix of the Lagrange polynomials through the given points.
///
/// The entry `d[a][b]` is $\ell_b'(x_a)$, the derivative of the Lagrange polynomial associated
/// with point `b`, evaluated at point `a`. Hence the derivative at `x_a` of the interpolant of
/// nodal values `u` is `sum_b d[a][b] * u[b]`.
///
/// # Panics
///
/// Panics if the points are not distinct.
pub fn lagrange_derivative_matrix(points: &[f64]) -> Vec<Vec<f64>> {
    let n = points.len();
    let lambda = barycentric_weights(points);
    let mut d = vec![vec![0.0; n]; n];

    for a in 0..n {
        let mut diagonal = 0.0;
        for b in 0..n {
            if a != b {
                let dx = points[a] - points[b];
                assert!(dx != 0.0, "collocation points must be distinct");
                d[a][b] = (lambda[b] / lambda[a]) / dx;
                diagonal -= d[a][b];
            }
        }
        // Rows sum to zero since the derivative of a constant vanishes
        d[a][a] = diagonal;
    }

    d
}

/// Values $\ell_b(x)$ of all Lagrange polynomials through the given points at `x`.
///
/// These are the interpolation weights used to spread a point quantity located at reference
/// coordinate `x` onto the collocation points.
pub fn lagrange_basis(points: &[f64], x: f64) -> Vec<f64> {
    if let Some(idx) = points.iter().position(|&x_b| x_b == x) {
        let mut values = vec![0.0; points.len()];
        values[idx] = 1.0;
        return values;
    }

    let lambda = barycentric_weights(points);
    let terms: Vec<f64> = points
        .iter()
        .zip(&lambda)
        .map(|(x_b, lambda_b)| lambda_b / (x - x_b))
        .collect();
    let denominator: f64 = terms.iter().sum();
    terms.into_iter().map(|t| t / denominator).collect()
}
