//! Driver-facing entry point of the elastic force kernel.
use crate::assembly::{
    scatter_add, scatter_add_atomic, scatter_add_disjoint, AssemblyStrategy, AtomicField, DisjointSliceAccess,
    ElementColoring,
};
use crate::attenuation::{AttenuationModel, ElementAttenuation, MemoryVariables, StrainHistory};
use crate::config::KernelConfig;
use crate::constitutive::ConstitutivePolicy;
use crate::element::{ElementForceKernel, ElementWorkspace};
use crate::material::MaterialStore;
use crate::mesh::SpectralMesh;
use crate::nalgebra::{DVector, Vector3};
use crate::quadrature::GllOperator;
use crate::region::Region;
use crate::{AtomicScalar, Error, Real, DEVIATORIC_COMPONENTS};
use eyre::{eyre, WrapErr};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// Persistent per-element state carried between force evaluations.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelState<T> {
    pub memory_variables: MemoryVariables<T>,
    pub strain: StrainHistory<T>,
}

impl<T: Real> KernelState<T> {
    pub fn zeros(num_elements: usize, num_mechanisms: usize, nodes_per_element: usize) -> Self {
        Self {
            memory_variables: MemoryVariables::zeros(num_elements, num_mechanisms, nodes_per_element),
            strain: StrainHistory::zeros(num_elements, nodes_per_element),
        }
    }
}

/// Disjoint access to the state of individual elements from several threads.
struct ElementStateAccess<'a, T> {
    memory: DisjointSliceAccess<'a, [T; DEVIATORIC_COMPONENTS]>,
    memory_len: usize,
    strain: DisjointSliceAccess<'a, [T; DEVIATORIC_COMPONENTS]>,
    strain_len: usize,
}

impl<'a, T: Real> ElementStateAccess<'a, T> {
    fn new(state: &'a mut KernelState<T>) -> Self {
        let memory_len = state.memory_variables.element_len();
        let strain_len = state.strain.nodes_per_element();
        Self {
            memory: DisjointSliceAccess::new(state.memory_variables.as_mut_slice()),
            memory_len,
            strain: DisjointSliceAccess::new(state.strain.as_mut_slice()),
            strain_len,
        }
    }

    /// # Safety
    ///
    /// No two threads may access the same element at the same time.
    #[allow(clippy::type_complexity)]
    unsafe fn element(
        &self,
        element: usize,
    ) -> (&'a mut [[T; DEVIATORIC_COMPONENTS]], &'a mut [[T; DEVIATORIC_COMPONENTS]]) {
        let memory = self
            .memory
            .subslice_mut(self.memory_len * element..self.memory_len * (element + 1));
        let strain = self
            .strain
            .subslice_mut(self.strain_len * element..self.strain_len * (element + 1));
        (memory, strain)
    }
}

/// Builder for [`ForceComputation`].
pub struct ForceComputationBuilder<'a, T: Real, R, const NGLL: usize> {
    region: R,
    operator: Option<GllOperator<T, NGLL>>,
    mesh: Option<&'a SpectralMesh<T, NGLL>>,
    materials: Option<&'a MaterialStore<T>>,
    config: KernelConfig,
    attenuation: Option<(&'a AttenuationModel<T>, ElementAttenuation)>,
    colors: Option<Vec<Vec<usize>>>,
}

impl<'a, T: Real, R: Region, const NGLL: usize> ForceComputationBuilder<'a, T, R, NGLL> {
    pub fn with_mesh(self, mesh: &'a SpectralMesh<T, NGLL>) -> Self {
        Self {
            mesh: Some(mesh),
            ..self
        }
    }

    /// Use the given operator instead of constructing one.
    pub fn with_operator(self, operator: GllOperator<T, NGLL>) -> Self {
        Self {
            operator: Some(operator),
            ..self
        }
    }

    pub fn with_materials(self, materials: &'a MaterialStore<T>) -> Self {
        Self {
            materials: Some(materials),
            ..self
        }
    }

    pub fn with_config(self, config: KernelConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_attenuation(self, model: &'a AttenuationModel<T>, elements: ElementAttenuation) -> Self {
        Self {
            attenuation: Some((model, elements)),
            ..self
        }
    }

    /// Use a precomputed element coloring for the colored assembly strategy.
    ///
    /// The coloring must contain exactly the active elements of the region.
    pub fn with_coloring(self, colors: Vec<Vec<usize>>) -> Self {
        Self {
            colors: Some(colors),
            ..self
        }
    }

    /// Validate the inputs and prepare the computation.
    pub fn build(self) -> eyre::Result<ForceComputation<'a, T, R, NGLL>> {
        let mesh = self.mesh.ok_or_else(|| eyre!("a mesh is required"))?;
        let materials = self
            .materials
            .ok_or_else(|| eyre!("a material store is required"))?;
        let config = self.config;
        let region = self.region;
        let ngll3 = NGLL * NGLL * NGLL;

        config.validate().wrap_err("invalid kernel configuration")?;
        mesh.validate_geometry()
            .wrap_err("mesh geometry is degenerate")?;
        if materials.nodes_per_element() != ngll3 {
            return Err(eyre!(
                "material store has {} nodes per element, but the mesh has {}",
                materials.nodes_per_element(),
                ngll3
            ));
        }
        materials
            .validate(ngll3 * mesh.num_elements())
            .wrap_err("material store does not match the mesh")?;

        let active_elements: Vec<usize> = (0..mesh.num_elements())
            .filter(|&element| region.is_active(mesh.region_tag(element)))
            .collect();

        let mut policy_counts = [0usize; 3];
        for &element in &active_elements {
            let policy = region.constitutive_policy(mesh.region_tag(element), &config);
            match policy {
                ConstitutivePolicy::Isotropic => policy_counts[0] += 1,
                ConstitutivePolicy::TransverselyIsotropic => {
                    policy_counts[1] += 1;
                    if !materials.has_transverse_isotropy() {
                        return Err(eyre!(
                            "element {element} is transversely isotropic, \
                             but the material store has no transverse isotropy parameters"
                        ));
                    }
                }
                ConstitutivePolicy::Anisotropic => {
                    policy_counts[2] += 1;
                    if !materials.has_anisotropy() {
                        return Err(eyre!(
                            "element {element} is anisotropic, but the material store has no anisotropic stiffness"
                        ));
                    }
                }
            }
        }

        let attenuation = match self.attenuation {
            Some((model, elements)) => {
                elements
                    .validate(mesh.num_elements(), model)
                    .wrap_err("element attenuation does not match the mesh or model")?;
                if !config.attenuation {
                    warn!("An attenuation model was provided, but attenuation is disabled in the configuration");
                }
                Some((model, elements))
            }
            None if config.attenuation => {
                return Err(eyre!("attenuation is enabled, but no attenuation model was provided"));
            }
            None => None,
        };

        let coloring = match (config.assembly_strategy, self.colors) {
            (AssemblyStrategy::Colored, Some(colors)) => {
                if let Some(&element) = colors
                    .iter()
                    .flatten()
                    .find(|&&element| element >= mesh.num_elements())
                {
                    return Err(Error::InvalidTopology(format!(
                        "colored element {element} is out of bounds for {} elements",
                        mesh.num_elements()
                    )))
                    .wrap_err("provided element coloring is invalid");
                }
                let coloring = ElementColoring::try_from_colors(colors, |element| mesh.element_nodes(element))
                    .wrap_err("provided element coloring is invalid")?;
                let covers_active = coloring.num_elements() == active_elements.len()
                    && coloring
                        .colors()
                        .iter()
                        .flatten()
                        .all(|&element| region.is_active(mesh.region_tag(element)));
                if !covers_active {
                    return Err(eyre!("provided element coloring must contain exactly the active elements"));
                }
                Some(coloring)
            }
            (AssemblyStrategy::Colored, None) => Some(ElementColoring::for_mesh(mesh, active_elements.iter().copied())),
            (_, Some(_)) => {
                warn!("An element coloring was provided, but the assembly strategy does not use it");
                None
            }
            (_, None) => None,
        };

        let num_attenuating = attenuation
            .as_ref()
            .filter(|_| config.attenuation)
            .map(|(_, elements)| {
                active_elements
                    .iter()
                    .filter(|&&element| elements.bucket(element).is_some())
                    .count()
            })
            .unwrap_or(0);

        info!(
            "Prepared {} force kernel: {} active of {} elements, {:?} assembly",
            region.name(),
            active_elements.len(),
            mesh.num_elements(),
            config.assembly_strategy
        );
        debug!(
            "{}: {} isotropic, {} transversely isotropic, {} anisotropic, {} attenuating elements",
            region.name(),
            policy_counts[0],
            policy_counts[1],
            policy_counts[2],
            num_attenuating
        );
        if let Some(coloring) = &coloring {
            debug!("{}: {} colors", region.name(), coloring.num_colors());
        }

        Ok(ForceComputation {
            operator: self.operator.unwrap_or_default(),
            mesh,
            materials,
            region,
            config,
            attenuation,
            active_elements,
            coloring,
            workspace: ThreadLocal::new(),
        })
    }
}

/// Computes the elastic internal forces of one region of the mesh.
pub struct ForceComputation<'a, T: Real, R, const NGLL: usize> {
    operator: GllOperator<T, NGLL>,
    mesh: &'a SpectralMesh<T, NGLL>,
    materials: &'a MaterialStore<T>,
    region: R,
    config: KernelConfig,
    attenuation: Option<(&'a AttenuationModel<T>, ElementAttenuation)>,
    active_elements: Vec<usize>,
    coloring: Option<ElementColoring>,
    workspace: ThreadLocal<RefCell<ElementWorkspace<T>>>,
}

impl<'a, T: Real, R: Region, const NGLL: usize> ForceComputation<'a, T, R, NGLL> {
    pub fn builder(region: R) -> ForceComputationBuilder<'a, T, R, NGLL> {
        ForceComputationBuilder {
            region,
            operator: None,
            mesh: None,
            materials: None,
            config: KernelConfig::default(),
            attenuation: None,
            colors: None,
        }
    }
}

impl<'a, T, R, const NGLL: usize> ForceComputation<'a, T, R, NGLL>
where
    T: Real + AtomicScalar,
    R: Region,
{
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn operator(&self) -> &GllOperator<T, NGLL> {
        &self.operator
    }

    pub fn active_elements(&self) -> &[usize] {
        &self.active_elements
    }

    /// The element coloring, present for the colored assembly strategy.
    pub fn coloring(&self) -> Option<&ElementColoring> {
        self.coloring.as_ref()
    }

    pub fn num_mechanisms(&self) -> usize {
        self.attenuation
            .as_ref()
            .map(|(model, _)| model.num_mechanisms())
            .unwrap_or(0)
    }

    /// Zero-initialized state with the dimensions required by this computation.
    pub fn initial_state(&self) -> KernelState<T> {
        KernelState::zeros(self.mesh.num_elements(), self.num_mechanisms(), NGLL * NGLL * NGLL)
    }

    /// The kernel for individual elements.
    pub fn element_kernel(&self) -> ElementForceKernel<'_, T, R, NGLL> {
        let kernel = ElementForceKernel::new(&self.operator, self.mesh, self.materials, &self.region, &self.config);
        match &self.attenuation {
            Some((model, elements)) => kernel.with_attenuation(model, elements),
            None => kernel,
        }
    }

    fn process_element(
        &self,
        kernel: &ElementForceKernel<'_, T, R, NGLL>,
        element: usize,
        displacement: &[T],
        state: &ElementStateAccess<'_, T>,
        scatter: impl FnOnce(&[usize], &[Vector3<T>]),
    ) {
        let ws = &mut *self.workspace.get_or_default().borrow_mut();
        // Every element is processed exactly once per evaluation
        let (memory, strain) = unsafe { state.element(element) };
        kernel.compute(element, displacement, memory, ws);
        scatter(self.mesh.element_nodes(element), ws.forces());
        kernel.update_state(element, ws, memory, strain);
    }

    /// Compute the internal elastic forces for the given displacement.
    ///
    /// `acceleration` is overwritten with the assembled forces of all active elements. Both
    /// fields store three components per global node. Memory variables are advanced and strain
    /// is recorded according to the configuration.
    ///
    /// # Panics
    ///
    /// Panics if the fields or the state do not match the dimensions of the mesh. Use
    /// [`initial_state`](Self::initial_state) to create a compatible state.
    pub fn compute_forces(&self, displacement: &DVector<T>, acceleration: &mut DVector<T>, state: &mut KernelState<T>) {
        let num_dofs = 3 * self.mesh.num_global_nodes();
        let ngll3 = NGLL * NGLL * NGLL;
        assert_eq!(displacement.len(), num_dofs, "displacement must have three components per global node");
        assert_eq!(acceleration.len(), num_dofs, "acceleration must have three components per global node");
        assert_eq!(state.memory_variables.num_mechanisms(), self.num_mechanisms());
        assert_eq!(state.memory_variables.num_elements(), self.mesh.num_elements());
        assert_eq!(state.memory_variables.nodes_per_element(), ngll3);
        assert_eq!(state.strain.num_elements(), self.mesh.num_elements());
        assert_eq!(state.strain.nodes_per_element(), ngll3);

        acceleration.fill(T::zero());
        let displacement = displacement.as_slice();
        let kernel = self.element_kernel();
        let state = ElementStateAccess::new(state);

        match self.config.assembly_strategy {
            AssemblyStrategy::Serial => {
                let acceleration = acceleration.as_mut_slice();
                for &element in &self.active_elements {
                    self.process_element(&kernel, element, displacement, &state, |nodes, forces| {
                        scatter_add(acceleration, nodes, forces)
                    });
                }
            }
            AssemblyStrategy::Colored => {
                let coloring = self
                    .coloring
                    .as_ref()
                    .expect("Coloring is computed at setup for the colored strategy");
                let access = DisjointSliceAccess::new(acceleration.as_mut_slice());
                for color in coloring.colors() {
                    color.par_iter().for_each(|&element| {
                        self.process_element(&kernel, element, displacement, &state, |nodes, forces| {
                            // Elements of the same color share no nodes
                            unsafe { scatter_add_disjoint(&access, nodes, forces) }
                        });
                    });
                }
            }
            AssemblyStrategy::Atomic => {
                let field = AtomicField::zeros(num_dofs);
                self.active_elements.par_iter().for_each(|&element| {
                    self.process_element(&kernel, element, displacement, &state, |nodes, forces| {
                        scatter_add_atomic(&field, nodes, forces)
                    });
                });
                field.copy_to_slice(acceleration.as_mut_slice());
            }
        }
    }
}
