//! Collocation operators on the tensor-product Gauss-Lobatto-Legendre grid of an element.
use crate::nalgebra::{convert, SMatrix, SVector};
use crate::Real;
use globe_sem_quadrature::collocation::{lagrange_basis, lagrange_derivative_matrix};
use globe_sem_quadrature::tensor::weight_products;
use globe_sem_quadrature::univariate::gauss_lobatto;

/// Derivative and integration operators for a spectral element with `NGLL` points per axis.
///
/// The same 1D rule is used along all three reference axes, so a single derivative matrix
/// and a single table of pairwise weight products serve all axes and all three coordinate
/// planes.
///
/// With $\ell_b$ the Lagrange polynomial through GLL point $\xi_b$ and $w_a$ the GLL weights:
///
/// - `hprime[(a, b)]` $= \ell_b'(\xi_a)$ differentiates nodal values at the GLL points,
/// - `hprime_wgll[(i, a)]` $= w_a \ell_i'(\xi_a)$ is the weighted transpose used by the weak form,
/// - `weight_products[(i, j)]` $= w_i w_j$.
#[derive(Debug, Clone, PartialEq)]
pub struct GllOperator<T: Real, const NGLL: usize> {
    reference_points: [f64; NGLL],
    points: SVector<T, NGLL>,
    weights: SVector<T, NGLL>,
    hprime: SMatrix<T, NGLL, NGLL>,
    hprime_wgll: SMatrix<T, NGLL, NGLL>,
    weight_products: SMatrix<T, NGLL, NGLL>,
}

impl<T: Real, const NGLL: usize> GllOperator<T, NGLL> {
    /// Total number of GLL points in one element.
    pub const NGLL3: usize = NGLL * NGLL * NGLL;

    /// Construct the operators for the GLL rule with `NGLL` points.
    ///
    /// # Panics
    ///
    /// Panics if `NGLL < 2`, for which no Gauss-Lobatto-Legendre rule exists.
    pub fn new() -> Self {
        let (weights, points) = gauss_lobatto(NGLL).expect("GLL rules require at least two points per axis");
        let points: Vec<f64> = points.into_iter().map(|[x]| x).collect();
        let derivatives = lagrange_derivative_matrix(&points);
        let products = weight_products(&weights);

        let hprime = SMatrix::from_fn(|a, b| convert(derivatives[a][b]));
        let hprime_wgll = SMatrix::from_fn(|i, a| convert(weights[a] * derivatives[a][i]));
        let weight_products = SMatrix::from_fn(|i, j| convert(products[i][j]));

        let mut reference_points = [0.0; NGLL];
        reference_points.copy_from_slice(&points);

        Self {
            reference_points,
            points: SVector::from_fn(|i, _| convert(points[i])),
            weights: SVector::from_fn(|i, _| convert(weights[i])),
            hprime,
            hprime_wgll,
            weight_products,
        }
    }

    pub fn points(&self) -> &SVector<T, NGLL> {
        &self.points
    }

    pub fn weights(&self) -> &SVector<T, NGLL> {
        &self.weights
    }

    pub fn hprime(&self) -> &SMatrix<T, NGLL, NGLL> {
        &self.hprime
    }

    pub fn hprime_wgll(&self) -> &SMatrix<T, NGLL, NGLL> {
        &self.hprime_wgll
    }

    pub fn weight_products(&self) -> &SMatrix<T, NGLL, NGLL> {
        &self.weight_products
    }

    /// Lagrange interpolation weights $\ell_b(\xi)$ for a point at reference coordinate `xi`.
    ///
    /// Used to spread point sources onto the GLL grid along one axis.
    pub fn interpolation_weights(&self, xi: f64) -> SVector<T, NGLL> {
        let values = lagrange_basis(&self.reference_points, xi);
        SVector::from_fn(|i, _| convert(values[i]))
    }
}

impl<T: Real, const NGLL: usize> Default for GllOperator<T, NGLL> {
    fn default() -> Self {
        Self::new()
    }
}
