use globe_sem::constitutive::{
    anisotropic_stress, isotropic_stress, radial_axis_stiffness, spherical_basis, strain_from_gradient,
    transverse_isotropic_stiffness,
};
use globe_sem::material::{AnisotropicStiffness, TransverseIsotropicModuli};
use globe_sem::proptest::{displacement_gradient, isotropic_moduli, spherical_angles, transverse_isotropic_moduli};
use matrixcompare::{assert_matrix_eq, prop_assert_matrix_eq};
use nalgebra::{Matrix3, Matrix6, Vector3};
use proptest::prelude::*;

const VOIGT_PAIRS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];

fn voigt_index(i: usize, j: usize) -> usize {
    VOIGT_PAIRS
        .iter()
        .position(|&(a, b)| (a, b) == (i, j) || (b, a) == (i, j))
        .unwrap()
}

/// Rotate the stiffness as a fourth-order tensor, C'_ijkl = Q_ip Q_jq Q_kr Q_ls C_pqrs.
fn rotate_stiffness_tensor(c: &Matrix6<f64>, q: &Matrix3<f64>) -> Matrix6<f64> {
    let tensor = |i, j, k, l| c[(voigt_index(i, j), voigt_index(k, l))];
    Matrix6::from_fn(|row, col| {
        let (i, j) = VOIGT_PAIRS[row];
        let (k, l) = VOIGT_PAIRS[col];
        let mut sum = 0.0;
        for p in 0..3 {
            for q_ in 0..3 {
                for r in 0..3 {
                    for s in 0..3 {
                        sum += q[(i, p)] * q[(j, q_)] * q[(k, r)] * q[(l, s)] * tensor(p, q_, r, s);
                    }
                }
            }
        }
        sum
    })
}

#[test]
fn isotropic_stress_for_uniaxial_strain() {
    let moduli = globe_sem::material::IsotropicModuli { kappav: 5.0, muv: 3.0 };
    let lambda = 3.0;
    let mut strain = Matrix3::zeros();
    strain[(0, 0)] = 1e-3;
    let stress = isotropic_stress(&strain, &moduli, None);
    let expected = Matrix3::from_diagonal(&Vector3::new((lambda + 6.0) * 1e-3, lambda * 1e-3, lambda * 1e-3));
    assert_matrix_eq!(stress, expected, comp = abs, tol = 1e-15);
}

#[test]
fn transverse_isotropy_is_invariant_about_the_pole() {
    let moduli = TransverseIsotropicModuli {
        kappav: 4.0,
        kappah: 4.2,
        muv: 2.0,
        muh: 2.1,
        eta_aniso: 0.93,
    };
    let local = radial_axis_stiffness(&moduli, None);
    for phi in [-2.5, 0.0, 0.4, 3.0] {
        let rotated = transverse_isotropic_stiffness(&moduli, 0.0, phi, None).to_voigt_matrix();
        assert_matrix_eq!(rotated, local, comp = abs, tol = 1e-13);
    }
}

#[test]
fn radial_axis_stiffness_at_the_equator_maps_radial_to_x() {
    // At theta = pi/2, phi = 0 the radial direction is the x axis
    let moduli = TransverseIsotropicModuli {
        kappav: 4.0,
        kappah: 4.5,
        muv: 2.0,
        muh: 2.5,
        eta_aniso: 0.9,
    };
    let local = radial_axis_stiffness(&moduli, None);
    let global = transverse_isotropic_stiffness(&moduli, std::f64::consts::FRAC_PI_2, 0.0, None);
    assert!((global.c11 - local[(2, 2)]).abs() < 1e-13);
    assert!((global.c22 - local[(1, 1)]).abs() < 1e-13);
    assert!((global.c33 - local[(0, 0)]).abs() < 1e-13);
    assert!((global.c55 - local[(4, 4)]).abs() < 1e-13);
}

proptest! {
    #[test]
    fn anisotropic_stress_with_isotropic_stiffness_is_hookes_law(
        gradient in displacement_gradient(),
        moduli in isotropic_moduli(),
    ) {
        let strain = strain_from_gradient(&gradient);
        let stiffness = AnisotropicStiffness::isotropic(moduli.kappav, moduli.muv);
        let from_stiffness = anisotropic_stress(&strain, &stiffness);
        let hooke = isotropic_stress(&strain, &moduli, None);
        prop_assert_matrix_eq!(from_stiffness, hooke, comp = abs, tol = 1e-14);
        prop_assert_matrix_eq!(hooke, hooke.transpose(), comp = exact);
    }

    #[test]
    fn isotropic_moduli_reduce_transverse_isotropy_to_isotropy(
        gradient in displacement_gradient(),
        moduli in isotropic_moduli(),
        (theta, phi) in spherical_angles(),
        fraction in 0.5..1.0,
    ) {
        let ti = TransverseIsotropicModuli::isotropic(moduli.kappav, moduli.muv);
        let stiffness = transverse_isotropic_stiffness(&ti, theta, phi, Some(fraction));
        let strain = strain_from_gradient(&gradient);
        let stress = anisotropic_stress(&strain, &stiffness);
        let expected = isotropic_stress(&strain, &moduli, Some(fraction));
        prop_assert_matrix_eq!(stress, expected, comp = abs, tol = 1e-13);
    }

    #[test]
    fn bond_rotation_agrees_with_tensor_rotation(
        moduli in transverse_isotropic_moduli(),
        (theta, phi) in spherical_angles(),
    ) {
        let local = radial_axis_stiffness(&moduli, None);
        let expected = rotate_stiffness_tensor(&local, &spherical_basis(theta, phi));
        let rotated = transverse_isotropic_stiffness(&moduli, theta, phi, None).to_voigt_matrix();
        prop_assert_matrix_eq!(rotated, expected, comp = abs, tol = 1e-12);
    }

    #[test]
    fn unrelaxed_fraction_scales_only_shear_moduli(
        moduli in transverse_isotropic_moduli(),
        fraction in 0.5..1.0,
    ) {
        let scaled = radial_axis_stiffness(&moduli, Some(fraction));
        let manual = TransverseIsotropicModuli {
            muv: moduli.muv * fraction,
            muh: moduli.muh * fraction,
            ..moduli
        };
        prop_assert_matrix_eq!(scaled, radial_axis_stiffness(&manual, None), comp = abs, tol = 1e-14);
        prop_assert_eq!(scaled[(3, 3)], moduli.muv * fraction);
    }
}
