//! Proptest strategies for kernel inputs.
use crate::material::{IsotropicModuli, TransverseIsotropicModuli};
use crate::nalgebra::Matrix3;
use ::proptest::array::uniform9;
use ::proptest::prelude::*;
use std::f64::consts::PI;

/// Displacement gradients of the magnitude seen in small-strain wave propagation.
pub fn displacement_gradient() -> impl Strategy<Value = Matrix3<f64>> {
    uniform9(-1e-3..1e-3).prop_map(|entries| Matrix3::from_row_slice(&entries))
}

/// Physically admissible isotropic moduli, with positive Lamé parameters.
pub fn isotropic_moduli() -> impl Strategy<Value = IsotropicModuli<f64>> {
    (0.5..5.0, 1.0..2.0).prop_map(|(muv, ratio)| IsotropicModuli {
        kappav: ratio * muv,
        muv,
    })
}

/// Transversely isotropic moduli with up to a few percent of anisotropy.
pub fn transverse_isotropic_moduli() -> impl Strategy<Value = TransverseIsotropicModuli<f64>> {
    (isotropic_moduli(), 0.95..1.05, 0.95..1.05, 0.9..1.0).prop_map(|(iso, kappa_ratio, mu_ratio, eta_aniso)| {
        TransverseIsotropicModuli {
            kappav: iso.kappav,
            kappah: kappa_ratio * iso.kappav,
            muv: iso.muv,
            muh: mu_ratio * iso.muv,
            eta_aniso,
        }
    })
}

/// Co-latitude and longitude of a point on the sphere.
pub fn spherical_angles() -> impl Strategy<Value = (f64, f64)> {
    (0.0..=PI, -PI..PI)
}
