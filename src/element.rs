//! The per-element pipeline of the force kernel.
//!
//! For one element, the kernel gathers the nodal displacement, differentiates it along the three
//! reference axes and maps the result to physical derivatives, evaluates the stress at every
//! GLL point and integrates the stress divergence in weak form. The weak form uses the same GLL
//! points for interpolation and quadrature, so all operators reduce to one-dimensional
//! contractions along each axis.
use crate::attenuation::{correct_stress, update_memory_variables, AttenuationModel, ElementAttenuation};
use crate::config::KernelConfig;
use crate::constitutive::{
    anisotropic_stress, isotropic_stress, strain_from_gradient, transverse_isotropic_stiffness, ConstitutivePolicy,
};
use crate::material::MaterialStore;
use crate::mesh::{local_index, SpectralMesh};
use crate::nalgebra::{Matrix3, Vector3};
use crate::quadrature::GllOperator;
use crate::region::Region;
use crate::{Real, DEVIATORIC_COMPONENTS};
use itertools::izip;
use numeric_literals::replace_float_literals;

/// Copy the displacement of the element's nodes out of the global field.
///
/// The global field stores three components per global node, i.e. component `c` of node `n` is
/// at index `3 n + c`.
pub fn gather_element_displacement<T: Real>(displacement: &[T], element_nodes: &[usize], output: &mut [Vector3<T>]) {
    assert_eq!(element_nodes.len(), output.len());
    for (u, &iglob) in output.iter_mut().zip(element_nodes) {
        *u = Vector3::new(
            displacement[3 * iglob],
            displacement[3 * iglob + 1],
            displacement[3 * iglob + 2],
        );
    }
}

/// Compute the displacement gradient $G_{cd} = \partial u_c / \partial x_d$ at every GLL point.
///
/// The derivatives along each reference axis are obtained by contracting the nodal values with
/// `hprime`, and mapped to physical derivatives with the chain rule through the inverse
/// Jacobian.
pub fn compute_displacement_gradients<T: Real, const NGLL: usize>(
    operator: &GllOperator<T, NGLL>,
    displacement: &[Vector3<T>],
    inverse_jacobians: &[Matrix3<T>],
    gradients: &mut [Matrix3<T>],
) {
    let ngll3 = NGLL * NGLL * NGLL;
    assert_eq!(displacement.len(), ngll3);
    assert_eq!(inverse_jacobians.len(), ngll3);
    assert_eq!(gradients.len(), ngll3);

    let hprime = operator.hprime();
    for k in 0..NGLL {
        for j in 0..NGLL {
            for i in 0..NGLL {
                let mut d_xi = Vector3::zeros();
                let mut d_eta = Vector3::zeros();
                let mut d_gamma = Vector3::zeros();
                for b in 0..NGLL {
                    d_xi += displacement[local_index::<NGLL>(b, j, k)] * hprime[(i, b)];
                    d_eta += displacement[local_index::<NGLL>(i, b, k)] * hprime[(j, b)];
                    d_gamma += displacement[local_index::<NGLL>(i, j, b)] * hprime[(k, b)];
                }
                let node = local_index::<NGLL>(i, j, k);
                let reference_gradient = Matrix3::from_columns(&[d_xi, d_eta, d_gamma]);
                gradients[node] = reference_gradient * inverse_jacobians[node];
            }
        }
    }
}

/// Trace-free part of the strain, as (xx, yy, xy, xz, yz).
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn deviatoric_strain<T: Real>(gradient: &Matrix3<T>) -> [T; DEVIATORIC_COMPONENTS] {
    let strain = strain_from_gradient(gradient);
    let mean = strain.trace() / 3.0;
    [
        strain[(0, 0)] - mean,
        strain[(1, 1)] - mean,
        strain[(0, 1)],
        strain[(0, 2)],
        strain[(1, 2)],
    ]
}

/// Integrate the weak form of the stress divergence over one element.
///
/// With $J$ the Jacobian determinant and $\nabla \xi_r$ the rows of the inverse Jacobian, the
/// flux $J \sigma \nabla \xi_r$ along every reference axis $r$ is stored in column $r$ of
/// `fluxes`. The fluxes are contracted with `hprime_wgll` along their axis and weighted by the
/// GLL weights of the two remaining axes. The result, negated, is the internal force at each
/// node.
pub fn integrate_weak_form<T: Real, const NGLL: usize>(
    operator: &GllOperator<T, NGLL>,
    stresses: &[Matrix3<T>],
    inverse_jacobians: &[Matrix3<T>],
    fluxes: &mut [Matrix3<T>],
    forces: &mut [Vector3<T>],
) {
    let ngll3 = NGLL * NGLL * NGLL;
    assert_eq!(stresses.len(), ngll3);
    assert_eq!(inverse_jacobians.len(), ngll3);
    assert_eq!(fluxes.len(), ngll3);
    assert_eq!(forces.len(), ngll3);

    for (flux, sigma, inverse_jacobian) in izip!(fluxes.iter_mut(), stresses, inverse_jacobians) {
        let jacobian = T::one() / inverse_jacobian.determinant();
        *flux = sigma * inverse_jacobian.transpose() * jacobian;
    }

    let hprime_wgll = operator.hprime_wgll();
    let wgllwgll = operator.weight_products();
    for k in 0..NGLL {
        for j in 0..NGLL {
            for i in 0..NGLL {
                let mut f_xi = Vector3::zeros();
                let mut f_eta = Vector3::zeros();
                let mut f_gamma = Vector3::zeros();
                for a in 0..NGLL {
                    f_xi += fluxes[local_index::<NGLL>(a, j, k)].column(0) * hprime_wgll[(i, a)];
                    f_eta += fluxes[local_index::<NGLL>(i, a, k)].column(1) * hprime_wgll[(j, a)];
                    f_gamma += fluxes[local_index::<NGLL>(i, j, a)].column(2) * hprime_wgll[(k, a)];
                }
                forces[local_index::<NGLL>(i, j, k)] =
                    -(f_xi * wgllwgll[(j, k)] + f_eta * wgllwgll[(i, k)] + f_gamma * wgllwgll[(i, j)]);
            }
        }
    }
}

/// Scratch buffers and results of the element kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementWorkspace<T: Real> {
    displacement: Vec<Vector3<T>>,
    gradients: Vec<Matrix3<T>>,
    stresses: Vec<Matrix3<T>>,
    fluxes: Vec<Matrix3<T>>,
    forces: Vec<Vector3<T>>,
    strain: Vec<[T; DEVIATORIC_COMPONENTS]>,
    reference_modulus: Vec<T>,
}

impl<T: Real> Default for ElementWorkspace<T> {
    fn default() -> Self {
        Self {
            displacement: Vec::new(),
            gradients: Vec::new(),
            stresses: Vec::new(),
            fluxes: Vec::new(),
            forces: Vec::new(),
            strain: Vec::new(),
            reference_modulus: Vec::new(),
        }
    }
}

impl<T: Real> ElementWorkspace<T> {
    fn resize(&mut self, num_nodes: usize) {
        self.displacement.resize(num_nodes, Vector3::zeros());
        self.gradients.resize(num_nodes, Matrix3::zeros());
        self.stresses.resize(num_nodes, Matrix3::zeros());
        self.fluxes.resize(num_nodes, Matrix3::zeros());
        self.forces.resize(num_nodes, Vector3::zeros());
        self.strain.resize(num_nodes, [T::zero(); DEVIATORIC_COMPONENTS]);
        self.reference_modulus.resize(num_nodes, T::zero());
    }

    /// Internal force at each local node of the last computed element.
    pub fn forces(&self) -> &[Vector3<T>] {
        &self.forces
    }

    pub fn gradients(&self) -> &[Matrix3<T>] {
        &self.gradients
    }

    /// Stress after the attenuation correction.
    pub fn stresses(&self) -> &[Matrix3<T>] {
        &self.stresses
    }

    pub fn deviatoric_strain(&self) -> &[[T; DEVIATORIC_COMPONENTS]] {
        &self.strain
    }

    /// Shear modulus driving the memory variable update at each node.
    pub fn reference_modulus(&self) -> &[T] {
        &self.reference_modulus
    }
}

/// The force kernel for a single element, parameterized by the region it runs on.
pub struct ElementForceKernel<'a, T: Real, R, const NGLL: usize> {
    operator: &'a GllOperator<T, NGLL>,
    mesh: &'a SpectralMesh<T, NGLL>,
    materials: &'a MaterialStore<T>,
    region: &'a R,
    config: &'a KernelConfig,
    attenuation: Option<(&'a AttenuationModel<T>, &'a ElementAttenuation)>,
}

impl<'a, T, R, const NGLL: usize> ElementForceKernel<'a, T, R, NGLL>
where
    T: Real,
    R: Region,
{
    /// Create a kernel over the given data.
    ///
    /// The inputs are assumed to be consistent. Use
    /// [`ForceComputation`](crate::forces::ForceComputation) for a validated setup.
    ///
    /// # Panics
    ///
    /// Nothing is checked here. [`compute`](Self::compute) and
    /// [`elastic_stress`](Self::elastic_stress) panic for an element whose constitutive policy
    /// needs transverse isotropy parameters or an anisotropic stiffness that `materials` lacks.
    pub fn new(
        operator: &'a GllOperator<T, NGLL>,
        mesh: &'a SpectralMesh<T, NGLL>,
        materials: &'a MaterialStore<T>,
        region: &'a R,
        config: &'a KernelConfig,
    ) -> Self {
        Self {
            operator,
            mesh,
            materials,
            region,
            config,
            attenuation: None,
        }
    }

    pub fn with_attenuation(self, model: &'a AttenuationModel<T>, elements: &'a ElementAttenuation) -> Self {
        Self {
            attenuation: Some((model, elements)),
            ..self
        }
    }

    pub fn is_active(&self, element: usize) -> bool {
        self.region.is_active(self.mesh.region_tag(element))
    }

    pub fn constitutive_policy(&self, element: usize) -> ConstitutivePolicy {
        self.region
            .constitutive_policy(self.mesh.region_tag(element), self.config)
    }

    /// The attenuation bucket of the element, if attenuation is enabled and the element
    /// attenuates.
    pub fn attenuation_bucket(&self, element: usize) -> Option<usize> {
        if !self.config.attenuation {
            return None;
        }
        self.attenuation
            .and_then(|(_, elements)| elements.bucket(element))
    }

    /// Elastic stress at a node and the shear modulus used for its memory variables.
    ///
    /// With attenuation, `unrelaxed_fraction` scales the shear moduli of the isotropic and
    /// transversely isotropic branches (`muv`, and `muh` for the latter). The anisotropic branch
    /// uses the stiffness as given and ignores the fraction. The memory variables still correct
    /// the stress of every branch. The returned modulus is `muv` for the isotropic and
    /// transversely isotropic branches, and `c44` for the anisotropic one.
    ///
    /// # Panics
    ///
    /// Panics if `policy` needs transverse isotropy parameters or an anisotropic stiffness that
    /// the material store does not hold for the element.
    pub fn elastic_stress(
        &self,
        element: usize,
        node: usize,
        policy: ConstitutivePolicy,
        gradient: &Matrix3<T>,
        unrelaxed_fraction: Option<T>,
    ) -> (Matrix3<T>, T) {
        let strain = strain_from_gradient(gradient);
        match policy {
            ConstitutivePolicy::Isotropic => {
                let moduli = self.materials.isotropic(element, node);
                (isotropic_stress(&strain, &moduli, unrelaxed_fraction), moduli.muv)
            }
            ConstitutivePolicy::TransverselyIsotropic => {
                let moduli = self
                    .materials
                    .transverse_isotropic(element, node)
                    .expect("Transversely isotropic elements require transverse isotropy parameters");
                let iglob = self.mesh.element_nodes(element)[node];
                let coords = self.mesh.spherical_coordinates(iglob);
                let stiffness = transverse_isotropic_stiffness(&moduli, coords.theta, coords.phi, unrelaxed_fraction);
                (anisotropic_stress(&strain, &stiffness), moduli.muv)
            }
            ConstitutivePolicy::Anisotropic => {
                // Unscaled by the unrelaxed fraction
                let stiffness = self
                    .materials
                    .anisotropic(element, node)
                    .expect("Anisotropic elements require an anisotropic stiffness");
                (anisotropic_stress(&strain, stiffness), stiffness.c44)
            }
        }
    }

    /// Run the element pipeline, leaving forces and strain in the workspace.
    ///
    /// `memory` holds the element's memory variables, laid out as `[mechanism][node]`. It is
    /// only read if the element attenuates.
    pub fn compute(
        &self,
        element: usize,
        displacement: &[T],
        memory: &[[T; DEVIATORIC_COMPONENTS]],
        workspace: &mut ElementWorkspace<T>,
    ) {
        let ngll3 = NGLL * NGLL * NGLL;
        let ws = workspace;
        ws.resize(ngll3);

        let element_nodes = self.mesh.element_nodes(element);
        let inverse_jacobians = self.mesh.element_inverse_jacobians(element);
        gather_element_displacement(displacement, element_nodes, &mut ws.displacement);
        compute_displacement_gradients(self.operator, &ws.displacement, inverse_jacobians, &mut ws.gradients);

        let policy = self.constitutive_policy(element);
        let attenuation = self
            .attenuation_bucket(element)
            .zip(self.attenuation)
            .map(|(bucket, (model, _))| (model.unrelaxed_fraction(bucket), model.num_mechanisms()));

        for node in 0..ngll3 {
            let gradient = &ws.gradients[node];
            let (mut stress, modulus) =
                self.elastic_stress(element, node, policy, gradient, attenuation.map(|(fraction, _)| fraction));
            if let Some((_, num_mechanisms)) = attenuation {
                assert_eq!(memory.len(), num_mechanisms * ngll3);
                correct_stress(&mut stress, memory.iter().skip(node).step_by(ngll3));
            }
            ws.stresses[node] = stress;
            ws.reference_modulus[node] = modulus;
            ws.strain[node] = deviatoric_strain(gradient);
        }

        integrate_weak_form(self.operator, &ws.stresses, inverse_jacobians, &mut ws.fluxes, &mut ws.forces);
    }

    /// Advance the element's memory variables and record its strain, using the results of the
    /// last call to [`compute`](Self::compute) for the same element.
    ///
    /// `strain` holds the strain recorded in the previous step, and is overwritten with the
    /// current strain if strain recording is enabled.
    pub fn update_state(
        &self,
        element: usize,
        workspace: &ElementWorkspace<T>,
        memory: &mut [[T; DEVIATORIC_COMPONENTS]],
        strain: &mut [[T; DEVIATORIC_COMPONENTS]],
    ) {
        if let Some((bucket, (model, _))) = self.attenuation_bucket(element).zip(self.attenuation) {
            update_memory_variables(
                memory,
                model.factor_common(bucket),
                &workspace.reference_modulus,
                model.coefficients(),
                strain,
                &workspace.strain,
            );
        }
        if self.config.compute_and_store_strain {
            strain.copy_from_slice(&workspace.strain);
        }
    }
}
