//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::{Error, Rule};
use std::f64::consts::PI;

/// Newton iterations stop once the update falls below this threshold.
const NEWTON_TOLERANCE: f64 = 1e-15;
const MAX_NEWTON_ITERATIONS: usize = 100;

/// Recurrence relation for Legendre polynomials.
///
/// Note: we use a formula for which derivatives are *not* defined at |x| == 1, so it is only
/// suitable for evaluation in the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // The current value, i.e. p_n(x)
    p1: f64,
    // The previous value in the recurrence, i.e. p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    pub fn evaluate(n: usize, x: f64) -> Self {
        // Use recurrence relation
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        let mut p3;
        for m in 1..=n {
            let m = m as f64;
            p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn derivative(&self) -> f64 {
        let Self { n, x, p1, p2 } = &self;
        let n = *n as f64;
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n * (x * p1 - p2) / (x * x - 1.0)
    }

    fn second_derivative(&self) -> f64 {
        // Follows from the Legendre differential equation
        //  (1 - x^2) p_n'' - 2x p_n' + n (n + 1) p_n = 0
        let n = self.n as f64;
        let x = self.x;
        (2.0 * x * self.derivative() - n * (n + 1.0) * self.value()) / (1.0 - x * x)
    }
}

/// Gauss-Lobatto-Legendre quadrature for the reference interval [-1, 1].
///
/// The rule contains both endpoints of the interval. The `n - 2` interior points are the roots
/// of $P'_{n-1}$, the derivative of the Legendre polynomial of degree $n - 1$, and the weights are
/// given by
/// $$
/// w_i = \frac{2}{n (n - 1) P_{n-1}(x_i)^2}.
/// $$
/// With `n` points, polynomials of degree up to `2 n - 3` are integrated exactly.
/// Points are returned in ascending order.
///
/// Returns `None` if fewer than two points are requested.
pub fn try_gauss_lobatto(num_points: usize) -> Option<Rule<1>> {
    let n = num_points;
    if n < 2 {
        return None;
    }

    // Polynomial degree of the underlying Legendre polynomial
    let degree = n - 1;
    let degree_f = degree as f64;

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    let endpoint_weight = 2.0 / (degree_f * (degree_f + 1.0));
    points[0] = [-1.0];
    points[n - 1] = [1.0];
    weights[0] = endpoint_weight;
    weights[n - 1] = endpoint_weight;

    // Interior points are symmetric about zero, so we only compute the lower half
    let num_interior = n - 2;
    for i in 1..=(num_interior + 1) / 2 {
        // Chebyshev-Gauss-Lobatto points are good initial guesses
        let mut x = -(PI * i as f64 / degree_f).cos();
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let recurrence = LegendreRecurrence::evaluate(degree, x);
            let dx = -recurrence.derivative() / recurrence.second_derivative();
            x += dx;
            if dx.abs() <= NEWTON_TOLERANCE {
                break;
            }
        }

        let p = LegendreRecurrence::evaluate(degree, x).value();
        let w = endpoint_weight / (p * p);

        let mirror_idx = n - 1 - i;
        points[i] = [x];
        weights[i] = w;
        points[mirror_idx] = [-x];
        weights[mirror_idx] = w;
    }

    // The middle point is exactly zero for an odd number of points
    if n % 2 == 1 {
        let mid = n / 2;
        let p = LegendreRecurrence::evaluate(degree, 0.0).value();
        points[mid] = [0.0];
        weights[mid] = endpoint_weight / (p * p);
    }

    Some((weights, points))
}

/// Same as [`try_gauss_lobatto`], but returns an error instead of `None`.
pub fn gauss_lobatto(num_points: usize) -> Result<Rule<1>, Error> {
    try_gauss_lobatto(num_points).ok_or(Error::NoRuleAvailable)
}
