//! Stress evaluation for the constitutive policies of the elastic kernel.
//!
//! All functions take the symmetric infinitesimal strain $\varepsilon$ as a `Matrix3` and return
//! the symmetric Cauchy stress. Stiffness tensors use Voigt notation with the component order
//! xx, yy, zz, yz, xz, xy and engineering shear strains (see [`AnisotropicStiffness`]).
use crate::material::{AnisotropicStiffness, IsotropicModuli, TransverseIsotropicModuli};
use crate::nalgebra::{Matrix3, Matrix6, Vector6};
use crate::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Index pairs of the Voigt components, in Voigt order.
const VOIGT_PAIRS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];

/// How stress is computed from strain in an element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstitutivePolicy {
    Isotropic,
    /// Transverse isotropy about the local radial direction.
    TransverselyIsotropic,
    Anisotropic,
}

/// Symmetric part of a displacement gradient.
pub fn strain_from_gradient<T: Real>(gradient: &Matrix3<T>) -> Matrix3<T> {
    (gradient + gradient.transpose()) * T::from_f64(0.5).expect("Literal must fit in T")
}

/// Voigt strain vector with engineering shear components.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn strain_to_voigt<T: Real>(strain: &Matrix3<T>) -> Vector6<T> {
    Vector6::from_fn(|i, _| {
        let (a, b) = VOIGT_PAIRS[i];
        if a == b {
            strain[(a, b)]
        } else {
            2.0 * strain[(a, b)]
        }
    })
}

/// Symmetric stress tensor from its Voigt vector.
pub fn stress_from_voigt<T: Real>(stress: &Vector6<T>) -> Matrix3<T> {
    let mut sigma = Matrix3::zeros();
    for (idx, &(a, b)) in VOIGT_PAIRS.iter().enumerate() {
        sigma[(a, b)] = stress[idx];
        sigma[(b, a)] = stress[idx];
    }
    sigma
}

/// Isotropic Hooke's law.
///
/// With attenuation, the shear modulus is first scaled to its unrelaxed value by the fraction
/// `unrelaxed_fraction`. The stress is then
/// $\sigma = \lambda \operatorname{tr}(\varepsilon) I + 2 \mu \varepsilon$
/// with $\lambda = \kappa - \frac{2}{3} \mu$.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn isotropic_stress<T: Real>(
    strain: &Matrix3<T>,
    moduli: &IsotropicModuli<T>,
    unrelaxed_fraction: Option<T>,
) -> Matrix3<T> {
    let mu = unrelaxed_fraction.map_or(moduli.muv, |f| moduli.muv * f);
    let lambda = moduli.kappav - 2.0 / 3.0 * mu;
    Matrix3::from_diagonal_element(lambda * strain.trace()) + strain * (2.0 * mu)
}

/// General anisotropic Hooke's law $\sigma = C \varepsilon$.
pub fn anisotropic_stress<T: Real>(strain: &Matrix3<T>, stiffness: &AnisotropicStiffness<T>) -> Matrix3<T> {
    stress_from_voigt(&(stiffness.to_voigt_matrix() * strain_to_voigt(strain)))
}

/// Voigt stiffness of a transversely isotropic material whose symmetry axis is the third
/// coordinate axis.
///
/// The shear moduli are scaled by `unrelaxed_fraction` if given. The Love parameters are
/// $A = \kappa_h + \frac{4}{3} \mu_h$, $C = \kappa_v + \frac{4}{3} \mu_v$, $L = \mu_v$,
/// $N = \mu_h$ and $F = \eta (A - 2L)$.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn radial_axis_stiffness<T: Real>(
    moduli: &TransverseIsotropicModuli<T>,
    unrelaxed_fraction: Option<T>,
) -> Matrix6<T> {
    let scale = unrelaxed_fraction.unwrap_or(1.0);
    let muv = moduli.muv * scale;
    let muh = moduli.muh * scale;

    let a = moduli.kappah + 4.0 / 3.0 * muh;
    let c = moduli.kappav + 4.0 / 3.0 * muv;
    let l = muv;
    let n = muh;
    let f = moduli.eta_aniso * (a - 2.0 * l);

    let mut stiffness = Matrix6::zeros();
    stiffness[(0, 0)] = a;
    stiffness[(1, 1)] = a;
    stiffness[(2, 2)] = c;
    stiffness[(0, 1)] = a - 2.0 * n;
    stiffness[(0, 2)] = f;
    stiffness[(1, 2)] = f;
    stiffness[(3, 3)] = l;
    stiffness[(4, 4)] = l;
    stiffness[(5, 5)] = n;
    stiffness[(1, 0)] = stiffness[(0, 1)];
    stiffness[(2, 0)] = f;
    stiffness[(2, 1)] = f;
    stiffness
}

/// Orthonormal basis $[e_\theta \; e_\phi \; e_r]$ at co-latitude `theta` and longitude `phi`.
///
/// The columns are the local axes, so the matrix maps local components to global Cartesian
/// components. The basis is right-handed.
pub fn spherical_basis<T: Real>(theta: T, phi: T) -> Matrix3<T> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Matrix3::new(
        cos_theta * cos_phi,
        -sin_phi,
        sin_theta * cos_phi,
        cos_theta * sin_phi,
        cos_phi,
        sin_theta * sin_phi,
        -sin_theta,
        T::zero(),
        cos_theta,
    )
}

/// The 6x6 transformation of Voigt stress vectors under the rotation `rotation`.
///
/// If $M$ is the returned matrix, a stiffness $C$ in the local frame becomes $M C M^T$ in
/// the global frame, where `rotation` maps local to global components.
pub fn bond_matrix<T: Real>(rotation: &Matrix3<T>) -> Matrix6<T> {
    let a = rotation;
    Matrix6::from_fn(|row, col| {
        let (i, j) = VOIGT_PAIRS[row];
        let (k, l) = VOIGT_PAIRS[col];
        if k == l {
            a[(i, k)] * a[(j, k)]
        } else {
            a[(i, k)] * a[(j, l)] + a[(i, l)] * a[(j, k)]
        }
    })
}

/// Full stiffness of a transversely isotropic material with radial symmetry axis, expressed in
/// the global Cartesian frame at the point with co-latitude `theta` and longitude `phi`.
pub fn transverse_isotropic_stiffness<T: Real>(
    moduli: &TransverseIsotropicModuli<T>,
    theta: T,
    phi: T,
    unrelaxed_fraction: Option<T>,
) -> AnisotropicStiffness<T> {
    let local = radial_axis_stiffness(moduli, unrelaxed_fraction);
    let bond = bond_matrix(&spherical_basis(theta, phi));
    AnisotropicStiffness::from_voigt_matrix(&(bond * local * bond.transpose()))
}
