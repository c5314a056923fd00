//! 2D and 3D rules formed by tensor products of 1D rules.
//!
//! Spectral elements integrate over faces and volumes with tensor products of the 1D
//! Gauss-Lobatto-Legendre rule. This module provides the products in the layouts needed by the
//! force kernel.

use crate::univariate::try_gauss_lobatto;
use crate::{Error, Rule};

/// Pairwise products of the given weights, `table[i][j] = w_i w_j`.
pub fn weight_products(weights: &[f64]) -> Vec<Vec<f64>> {
    weights
        .iter()
        .map(|w_i| weights.iter().map(|w_j| w_i * w_j).collect())
        .collect()
}

/// A Gauss-Lobatto-Legendre rule for the reference hexahedron.
///
/// Points are ordered with the first coordinate running fastest, matching the local node
/// numbering `i + n (j + n k)` of spectral elements.
pub fn hexahedron_gauss_lobatto(num_points_per_dim: usize) -> Result<Rule<3>, Error> {
    let n = num_points_per_dim;
    let (weights1d, points1d) = try_gauss_lobatto(n).ok_or(Error::NoRuleAvailable)?;
    let mut weights3d = Vec::with_capacity(n * n * n);
    let mut points3d = Vec::with_capacity(n * n * n);

    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                weights3d.push(weights1d[i] * weights1d[j] * weights1d[k]);
                points3d.push([points1d[i][0], points1d[j][0], points1d[k][0]]);
            }
        }
    }

    Ok((weights3d, points3d))
}
