use crate::unit_tests::{irregular_field, linear_field, max_abs_diff};
use globe_sem::assembly::AssemblyStrategy;
use globe_sem::attenuation::{AttenuationBucket, AttenuationModel, ElementAttenuation};
use globe_sem::config::KernelConfig;
use globe_sem::element::deviatoric_strain;
use globe_sem::forces::ForceComputation;
use globe_sem::material::{IsotropicModuli, MaterialStore};
use globe_sem::mesh::procedural::create_box_mesh;
use globe_sem::mesh::{RegionTag, SpectralMesh};
use globe_sem::region::{CrustMantle, InnerCore};
use globe_sem::Error;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, Matrix3, Point3, Vector3};
use std::collections::HashSet;

const NGLL: usize = 5;
const NGLL3: usize = NGLL * NGLL * NGLL;

fn moduli() -> IsotropicModuli<f64> {
    IsotropicModuli { kappav: 6.0, muv: 2.0 }
}

fn box_mesh(num_elements: [usize; 3], tag: RegionTag) -> SpectralMesh<f64, NGLL> {
    let extents = Vector3::new(num_elements[0] as f64, num_elements[1] as f64, num_elements[2] as f64);
    create_box_mesh(num_elements, &Point3::new(1.0, 2.0, 3.0), &extents, tag).unwrap()
}

fn compute_with_strategy(
    mesh: &SpectralMesh<f64, NGLL>,
    materials: &MaterialStore<f64>,
    strategy: AssemblyStrategy,
    displacement: &DVector<f64>,
) -> DVector<f64> {
    let computation = ForceComputation::builder(CrustMantle)
        .with_mesh(mesh)
        .with_materials(materials)
        .with_config(KernelConfig::default().with_assembly_strategy(strategy))
        .build()
        .unwrap();
    let mut acceleration = DVector::zeros(displacement.len());
    let mut state = computation.initial_state();
    computation.compute_forces(displacement, &mut acceleration, &mut state);
    acceleration
}

#[test]
fn assembly_strategies_agree() {
    let mesh = box_mesh([3, 2, 2], RegionTag::MantleNormal);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());
    let u = irregular_field(mesh.num_global_nodes(), 0.71);

    let serial = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Serial, &u);
    let colored = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Colored, &u);
    let atomic = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Atomic, &u);

    let scale = serial.amax();
    assert!(scale > 0.0);
    assert!(max_abs_diff(&serial, &colored) <= 1e-12 * scale);
    assert!(max_abs_diff(&serial, &atomic) <= 1e-12 * scale);
}

#[test]
fn acceleration_is_overwritten() {
    let mesh = box_mesh([1, 1, 1], RegionTag::Crust);
    let materials = MaterialStore::uniform(NGLL3, 1, moduli());
    let computation = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .build()
        .unwrap();

    let u = DVector::zeros(3 * mesh.num_global_nodes());
    let mut acceleration = DVector::repeat(u.len(), 1.0);
    let mut state = computation.initial_state();
    computation.compute_forces(&u, &mut acceleration, &mut state);
    assert_eq!(acceleration, DVector::zeros(u.len()));
}

#[test]
fn default_config_state_has_no_mechanisms() {
    let mesh = box_mesh([2, 1, 1], RegionTag::Crust);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());
    let computation = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .build()
        .unwrap();
    assert_eq!(computation.num_mechanisms(), 0);

    let mut state = computation.initial_state();
    assert_eq!(state.memory_variables.num_elements(), 2);
    assert_eq!(state.memory_variables.num_mechanisms(), 0);
    assert!(state.memory_variables.as_slice().is_empty());

    let u = irregular_field(mesh.num_global_nodes(), 0.3);
    let mut acceleration = DVector::zeros(u.len());
    computation.compute_forces(&u, &mut acceleration, &mut state);
    assert!(acceleration.amax() > 0.0);
    assert!(state.memory_variables.as_slice().is_empty());
}

#[test]
fn stiffness_operator_is_symmetric() {
    let mesh = box_mesh([2, 1, 1], RegionTag::Crust);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());
    let u = irregular_field(mesh.num_global_nodes(), 0.3);
    let v = irregular_field(mesh.num_global_nodes(), 1.9);

    let ku = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Serial, &u);
    let kv = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Serial, &v);

    let a = v.dot(&ku);
    let b = u.dot(&kv);
    assert!(a.abs() > 0.0);
    assert_scalar_eq!(a, b, comp = abs, tol = 1e-10 * a.abs());
    // The stiffness is positive semi-definite, and the internal force is its negative
    assert!(u.dot(&ku) < 0.0);
}

#[test]
fn linear_field_loads_only_the_boundary() {
    let mesh = box_mesh([2, 2, 1], RegionTag::From220To670);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());
    let g = Matrix3::new(1e-3, 0.0, 2e-4, 0.0, -1e-3, 0.0, 2e-4, 0.0, 5e-4);
    let u = linear_field(&mesh, &g, &Vector3::zeros());
    let acceleration = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Colored, &u);

    // Midpoint of the vertical edge shared by all four elements, inside the box
    let center = Point3::new(2.0, 3.0, 3.5);
    let node = mesh
        .positions()
        .iter()
        .position(|x| (x - center).norm() < 1e-12)
        .unwrap();
    for c in 0..3 {
        assert!(acceleration[3 * node + c].abs() < 1e-15);
    }
    assert!(acceleration.amax() > 1e-6);
}

#[test]
fn attenuation_advances_memory_and_records_strain() {
    let mesh = box_mesh([2, 1, 1], RegionTag::MantleNormal);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());
    let model = AttenuationModel::try_new(
        0.05,
        vec![0.5, 4.0],
        vec![AttenuationBucket {
            one_minus_sum_beta: 0.9,
            factor_common: vec![0.02, 0.03],
        }],
    )
    .unwrap();
    // Only the second element attenuates
    let elements = ElementAttenuation::from_buckets(vec![None, Some(0)]);
    let config = KernelConfig::default()
        .with_attenuation(true)
        .with_strain_recording(true)
        .with_assembly_strategy(AssemblyStrategy::Atomic);

    let computation = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_config(config)
        .with_attenuation(&model, elements)
        .build()
        .unwrap();
    assert_eq!(computation.num_mechanisms(), 2);

    let g = Matrix3::new(1e-3, 2e-4, 0.0, 0.0, -5e-4, 1e-4, 3e-4, 0.0, 2e-4);
    let dev = deviatoric_strain(&g);
    let u = linear_field(&mesh, &g, &Vector3::zeros());
    let mut acceleration = DVector::zeros(u.len());
    let mut state = computation.initial_state();

    computation.compute_forces(&u, &mut acceleration, &mut state);
    let mu = moduli().muv;
    for node in 0..NGLL3 {
        for element in 0..2 {
            let strain = state.strain.element(element)[node];
            for c in 0..5 {
                assert_scalar_eq!(strain[c], dev[c], comp = abs, tol = 1e-15);
            }
        }
        for (m, coeffs) in model.coefficients().iter().enumerate() {
            assert_eq!(state.memory_variables.get(0, m, node), &[0.0; 5]);
            let r = state.memory_variables.get(1, m, node);
            let factor = model.factor_common(0)[m];
            for c in 0..5 {
                assert_scalar_eq!(r[c], factor * mu * coeffs.gammaval * dev[c], comp = abs, tol = 1e-17);
            }
        }
    }

    let first = state.clone();
    computation.compute_forces(&u, &mut acceleration, &mut state);
    for (m, coeffs) in model.coefficients().iter().enumerate() {
        let factor = model.factor_common(0)[m];
        let r0 = first.memory_variables.get(1, m, 7);
        let r1 = state.memory_variables.get(1, m, 7);
        for c in 0..5 {
            let expected = coeffs.alphaval * r0[c] + factor * mu * (coeffs.betaval + coeffs.gammaval) * dev[c];
            assert_scalar_eq!(r1[c], expected, comp = abs, tol = 1e-17);
        }
    }
}

#[test]
fn inner_core_skips_fictitious_cube() {
    let template = box_mesh([3, 1, 1], RegionTag::InnerCore);
    let inverse_jacobians = (0..3)
        .flat_map(|e| template.element_inverse_jacobians(e).to_vec())
        .collect();
    let mesh = SpectralMesh::<f64, NGLL>::try_from_parts(
        template.ibool().to_vec(),
        inverse_jacobians,
        vec![RegionTag::InnerCore, RegionTag::TopCentralCube, RegionTag::InFictitiousCube],
        template.positions().to_vec(),
    )
    .unwrap();
    let materials = MaterialStore::uniform(NGLL3, 3, moduli());

    let computation = ForceComputation::builder(InnerCore)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .build()
        .unwrap();
    assert_eq!(computation.active_elements(), &[0, 1]);

    let u = irregular_field(mesh.num_global_nodes(), 0.9);
    let mut acceleration = DVector::zeros(u.len());
    let mut state = computation.initial_state();
    computation.compute_forces(&u, &mut acceleration, &mut state);

    let shared: HashSet<usize> = mesh
        .element_nodes(0)
        .iter()
        .chain(mesh.element_nodes(1))
        .copied()
        .collect();
    for &node in mesh.element_nodes(2) {
        if !shared.contains(&node) {
            for c in 0..3 {
                assert_eq!(acceleration[3 * node + c], 0.0);
            }
        }
    }

    // The same mesh has no crust/mantle elements at all
    let mantle = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .build()
        .unwrap();
    assert!(mantle.active_elements().is_empty());
    mantle.compute_forces(&u, &mut acceleration, &mut state);
    assert_eq!(acceleration, DVector::zeros(u.len()));
}

#[test]
fn builder_rejects_inconsistent_setup() {
    let mesh = box_mesh([2, 1, 1], RegionTag::MohoTo80);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());

    let missing_mesh = ForceComputation::<f64, _, NGLL>::builder(CrustMantle)
        .with_materials(&materials)
        .build();
    assert!(missing_mesh.is_err());

    let missing_ti = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_config(KernelConfig::default().with_transverse_isotropy(true))
        .build();
    assert!(missing_ti.is_err());

    let missing_anisotropy = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_config(KernelConfig::default().with_anisotropic_mantle(true))
        .build();
    assert!(missing_anisotropy.is_err());

    let missing_model = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_config(KernelConfig::default().with_attenuation(true).with_strain_recording(true))
        .build();
    assert!(missing_model.is_err());

    let invalid_config = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_config(KernelConfig::default().with_attenuation(true))
        .build();
    let err = invalid_config.err().unwrap();
    assert!(matches!(
        err.root_cause().downcast_ref::<Error>(),
        Some(Error::InvalidConfig(_))
    ));

    let short_materials = MaterialStore::uniform(NGLL3, 1, moduli());
    let mismatched = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&short_materials)
        .build();
    let err = mismatched.err().unwrap();
    assert!(matches!(
        err.root_cause().downcast_ref::<Error>(),
        Some(Error::MaterialLayout(_))
    ));

    let overlapping = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_coloring(vec![vec![0, 1]])
        .build();
    let err = overlapping.err().unwrap();
    assert!(matches!(
        err.root_cause().downcast_ref::<Error>(),
        Some(Error::ColoringNotDisjoint { color: 0, .. })
    ));

    let incomplete = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_coloring(vec![vec![0]])
        .build();
    assert!(incomplete.is_err());

    let out_of_bounds = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_coloring(vec![vec![0], vec![1], vec![7]])
        .build();
    let err = out_of_bounds.err().unwrap();
    assert!(matches!(
        err.root_cause().downcast_ref::<Error>(),
        Some(Error::InvalidTopology(_))
    ));
}

#[test]
fn precomputed_coloring_is_used() {
    let mesh = box_mesh([2, 1, 1], RegionTag::Crust);
    let materials = MaterialStore::uniform(NGLL3, mesh.num_elements(), moduli());
    let computation = ForceComputation::builder(CrustMantle)
        .with_mesh(&mesh)
        .with_materials(&materials)
        .with_coloring(vec![vec![1], vec![0]])
        .build()
        .unwrap();
    assert_eq!(computation.coloring().unwrap().colors(), &[vec![1], vec![0]]);

    let u = irregular_field(mesh.num_global_nodes(), 2.3);
    let mut acceleration = DVector::zeros(u.len());
    let mut state = computation.initial_state();
    computation.compute_forces(&u, &mut acceleration, &mut state);
    let serial = compute_with_strategy(&mesh, &materials, AssemblyStrategy::Serial, &u);
    assert!(max_abs_diff(&acceleration, &serial) <= 1e-12 * serial.amax());
}
