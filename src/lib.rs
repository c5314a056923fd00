//! Elastic internal-force kernel for spectral-element wave propagation in a spherical earth.
//!
//! Each call to [`ForceComputation::compute_forces`](forces::ForceComputation::compute_forces)
//! evaluates, element by element, the displacement gradient at the Gauss-Lobatto-Legendre
//! points, the stress under the element's constitutive policy, the attenuation correction and
//! the weak-form divergence, and accumulates the result into a global acceleration field.
//! The [`device`] module contains the companion source-injection kernel.

pub mod assembly;
pub mod attenuation;
pub mod config;
pub mod constitutive;
pub mod device;
pub mod element;
pub mod error;
pub mod forces;
pub mod material;
pub mod mesh;
pub mod quadrature;
pub mod region;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;

pub use error::Error;
pub use globe_sem_traits::atomic::AtomicScalar;
pub use globe_sem_traits::Real;

/// Number of independent components stored for symmetric deviatoric quantities
/// (xx, yy, xy, xz, yz; zz is implied by the zero trace).
pub const DEVIATORIC_COMPONENTS: usize = 5;
