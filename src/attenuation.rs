//! Viscoelastic attenuation through standard linear solids.
//!
//! Attenuation is modeled by a small number of relaxation mechanisms. Each mechanism carries a
//! memory variable per local node, a symmetric trace-free tensor stored by its five
//! independent components (xx, yy, xy, xz, yz). The memory variables are subtracted from the
//! elastic stress and advanced in time after every force evaluation.
use crate::error::Error;
use crate::mesh::{RegionTag, SpectralMesh};
use crate::nalgebra::Matrix3;
use crate::{Real, DEVIATORIC_COMPONENTS};
use itertools::izip;
use log::debug;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Time-stepping coefficients of one relaxation mechanism.
///
/// The memory variable update is $R \gets \alpha R + \beta \varepsilon^{n} + \gamma
/// \varepsilon^{n+1}$ (up to the modulus scaling), where the coefficients are fourth-order
/// Taylor expansions of the exact exponential integrator.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelaxationCoefficients<T> {
    pub alphaval: T,
    pub betaval: T,
    pub gammaval: T,
}

impl<T: Real> RelaxationCoefficients<T> {
    /// Coefficients for the time step `dt` and relaxation time `tau_sigma`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn from_relaxation_time(dt: T, tau_sigma: T) -> Self {
        let tauinv = -1.0 / tau_sigma;
        let x = dt * tauinv;
        let x2 = x * x;
        let x3 = x2 * x;
        let x4 = x3 * x;
        Self {
            alphaval: 1.0 + x + x2 / 2.0 + x3 / 6.0 + x4 / 24.0,
            betaval: dt * (0.5 + x / 3.0 + x2 / 8.0 + x3 / 30.0),
            gammaval: dt * (0.5 + x / 6.0 + x2 / 24.0 + x3 / 120.0),
        }
    }
}

/// Maps an element to its attenuation bucket.
///
/// The classification by region and radius belongs to the attenuation model of the driver.
/// Returning `None` means the element does not attenuate.
pub trait RelaxationLookup<T> {
    fn bucket(&self, tag: RegionTag, radius: T) -> Option<usize>;
}

impl<T, F> RelaxationLookup<T> for F
where
    F: Fn(RegionTag, T) -> Option<usize>,
{
    fn bucket(&self, tag: RegionTag, radius: T) -> Option<usize> {
        self(tag, radius)
    }
}

/// Attenuation parameters shared by all elements with the same quality factor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttenuationBucket<T> {
    /// Ratio of the relaxed to the unrelaxed modulus, in `(0, 1]`.
    pub one_minus_sum_beta: T,
    /// Scaling of the memory variable source term, one per mechanism.
    pub factor_common: Vec<T>,
}

/// Relaxation times, time-stepping coefficients and bucket tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttenuationModel<T> {
    dt: T,
    tau_sigma: Vec<T>,
    coefficients: Vec<RelaxationCoefficients<T>>,
    buckets: Vec<AttenuationBucket<T>>,
}

impl<T: Real> AttenuationModel<T> {
    /// Build the model for time step `dt`, with one relaxation mechanism per entry of
    /// `tau_sigma`.
    pub fn try_new(dt: T, tau_sigma: Vec<T>, buckets: Vec<AttenuationBucket<T>>) -> Result<Self, Error> {
        if !(dt > T::zero() && dt.is_finite()) {
            return Err(Error::Attenuation("time step must be positive and finite".to_string()));
        }
        if tau_sigma.is_empty() {
            return Err(Error::Attenuation("at least one relaxation mechanism is required".to_string()));
        }
        if let Some(m) = tau_sigma
            .iter()
            .position(|&tau| !(tau > T::zero() && tau.is_finite()))
        {
            return Err(Error::Attenuation(format!(
                "relaxation time of mechanism {m} must be positive and finite"
            )));
        }
        for (idx, bucket) in buckets.iter().enumerate() {
            let fraction = bucket.one_minus_sum_beta;
            if !(fraction > T::zero() && fraction <= T::one()) {
                return Err(Error::Attenuation(format!(
                    "modulus fraction of bucket {idx} must be in (0, 1]"
                )));
            }
            if bucket.factor_common.len() != tau_sigma.len() {
                return Err(Error::Attenuation(format!(
                    "bucket {idx} has {} factors, expected one per mechanism ({})",
                    bucket.factor_common.len(),
                    tau_sigma.len()
                )));
            }
        }

        let coefficients = tau_sigma
            .iter()
            .map(|&tau| RelaxationCoefficients::from_relaxation_time(dt, tau))
            .collect();
        Ok(Self {
            dt,
            tau_sigma,
            coefficients,
            buckets,
        })
    }

    pub fn dt(&self) -> T {
        self.dt
    }

    pub fn num_mechanisms(&self) -> usize {
        self.tau_sigma.len()
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn tau_sigma(&self) -> &[T] {
        &self.tau_sigma
    }

    pub fn coefficients(&self) -> &[RelaxationCoefficients<T>] {
        &self.coefficients
    }

    pub fn unrelaxed_fraction(&self, bucket: usize) -> T {
        self.buckets[bucket].one_minus_sum_beta
    }

    pub fn factor_common(&self, bucket: usize) -> &[T] {
        &self.buckets[bucket].factor_common
    }
}

/// The attenuation bucket of every element, resolved once at setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttenuation {
    buckets: Vec<Option<usize>>,
}

impl ElementAttenuation {
    pub fn from_buckets(buckets: Vec<Option<usize>>) -> Self {
        Self { buckets }
    }

    /// Resolve the bucket of each element from its tag and the radius at its center.
    pub fn resolve<T, const NGLL: usize>(
        mesh: &SpectralMesh<T, NGLL>,
        model: &AttenuationModel<T>,
        lookup: &impl RelaxationLookup<T>,
    ) -> Result<Self, Error>
    where
        T: Real,
    {
        let buckets = (0..mesh.num_elements())
            .map(|element| lookup.bucket(mesh.region_tag(element), mesh.element_center_radius(element)))
            .collect();
        let resolved = Self { buckets };
        resolved.validate(mesh.num_elements(), model)?;
        debug!(
            "Resolved attenuation for {} of {} elements",
            resolved.num_attenuating(),
            mesh.num_elements()
        );
        Ok(resolved)
    }

    pub fn validate<T>(&self, num_elements: usize, model: &AttenuationModel<T>) -> Result<(), Error> {
        if self.buckets.len() != num_elements {
            return Err(Error::Attenuation(format!(
                "{} element buckets given for {num_elements} elements",
                self.buckets.len()
            )));
        }
        for (element, bucket) in self.buckets.iter().enumerate() {
            if let Some(bucket) = *bucket {
                if bucket >= model.buckets.len() {
                    return Err(Error::Attenuation(format!(
                        "element {element} refers to bucket {bucket}, but the model has {} buckets",
                        model.buckets.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn bucket(&self, element: usize) -> Option<usize> {
        self.buckets[element]
    }

    pub fn num_attenuating(&self) -> usize {
        self.buckets.iter().filter(|b| b.is_some()).count()
    }
}

/// Memory variables of all elements, laid out as `[element][mechanism][node]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryVariables<T> {
    num_elements: usize,
    num_mechanisms: usize,
    nodes_per_element: usize,
    values: Vec<[T; DEVIATORIC_COMPONENTS]>,
}

impl<T: Real> MemoryVariables<T> {
    pub fn zeros(num_elements: usize, num_mechanisms: usize, nodes_per_element: usize) -> Self {
        Self {
            num_elements,
            num_mechanisms,
            nodes_per_element,
            values: vec![[T::zero(); DEVIATORIC_COMPONENTS]; num_elements * num_mechanisms * nodes_per_element],
        }
    }

    pub fn num_mechanisms(&self) -> usize {
        self.num_mechanisms
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    /// Number of entries per element.
    pub fn element_len(&self) -> usize {
        self.num_mechanisms * self.nodes_per_element
    }

    /// Number of elements, also when there are no mechanisms and hence no stored values.
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn element(&self, element: usize) -> &[[T; DEVIATORIC_COMPONENTS]] {
        let n = self.element_len();
        &self.values[n * element..n * (element + 1)]
    }

    pub fn element_mut(&mut self, element: usize) -> &mut [[T; DEVIATORIC_COMPONENTS]] {
        let n = self.element_len();
        &mut self.values[n * element..n * (element + 1)]
    }

    pub fn get(&self, element: usize, mechanism: usize, node: usize) -> &[T; DEVIATORIC_COMPONENTS] {
        &self.element(element)[mechanism * self.nodes_per_element + node]
    }

    pub fn as_slice(&self) -> &[[T; DEVIATORIC_COMPONENTS]] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [[T; DEVIATORIC_COMPONENTS]] {
        &mut self.values
    }
}

/// Deviatoric strain of all elements, laid out as `[element][node]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrainHistory<T> {
    num_elements: usize,
    nodes_per_element: usize,
    values: Vec<[T; DEVIATORIC_COMPONENTS]>,
}

impl<T: Real> StrainHistory<T> {
    pub fn zeros(num_elements: usize, nodes_per_element: usize) -> Self {
        Self {
            num_elements,
            nodes_per_element,
            values: vec![[T::zero(); DEVIATORIC_COMPONENTS]; num_elements * nodes_per_element],
        }
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn element(&self, element: usize) -> &[[T; DEVIATORIC_COMPONENTS]] {
        let n = self.nodes_per_element;
        &self.values[n * element..n * (element + 1)]
    }

    pub fn element_mut(&mut self, element: usize) -> &mut [[T; DEVIATORIC_COMPONENTS]] {
        let n = self.nodes_per_element;
        &mut self.values[n * element..n * (element + 1)]
    }

    pub fn as_slice(&self) -> &[[T; DEVIATORIC_COMPONENTS]] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [[T; DEVIATORIC_COMPONENTS]] {
        &mut self.values
    }
}

/// Subtract the memory variables of all mechanisms at a node from the stress.
///
/// The memory variables are trace-free, so the zz component receives `Rxx + Ryy`.
pub fn correct_stress<'a, T>(stress: &mut Matrix3<T>, memory: impl IntoIterator<Item = &'a [T; DEVIATORIC_COMPONENTS]>)
where
    T: Real,
{
    let mut sum = [T::zero(); DEVIATORIC_COMPONENTS];
    for r in memory {
        for (s, &value) in sum.iter_mut().zip(r) {
            *s += value;
        }
    }
    let [rxx, ryy, rxy, rxz, ryz] = sum;

    stress[(0, 0)] -= rxx;
    stress[(1, 1)] -= ryy;
    stress[(2, 2)] += rxx + ryy;
    for (a, b, r) in [(0, 1, rxy), (0, 2, rxz), (1, 2, ryz)] {
        stress[(a, b)] -= r;
        stress[(b, a)] -= r;
    }
}

/// Advance the memory variables of one element by one time step.
///
/// `memory` holds the element's memory variables laid out as `[mechanism][node]`, and
/// `reference_modulus` the shear modulus at each node. For every mechanism, node and
/// component,
/// $R \gets \alpha R + f \mu (\beta \varepsilon^{old} + \gamma \varepsilon^{new})$.
pub fn update_memory_variables<T: Real>(
    memory: &mut [[T; DEVIATORIC_COMPONENTS]],
    factor_common: &[T],
    reference_modulus: &[T],
    coefficients: &[RelaxationCoefficients<T>],
    strain_old: &[[T; DEVIATORIC_COMPONENTS]],
    strain_new: &[[T; DEVIATORIC_COMPONENTS]],
) {
    let nodes_per_element = reference_modulus.len();
    assert_eq!(memory.len(), coefficients.len() * nodes_per_element);
    assert_eq!(factor_common.len(), coefficients.len());
    assert_eq!(strain_old.len(), nodes_per_element);
    assert_eq!(strain_new.len(), nodes_per_element);

    for (mechanism_memory, &factor, coeffs) in izip!(memory.chunks_exact_mut(nodes_per_element), factor_common, coefficients)
    {
        let RelaxationCoefficients {
            alphaval,
            betaval,
            gammaval,
        } = *coeffs;
        for (r, &mu, old, new) in izip!(mechanism_memory, reference_modulus, strain_old, strain_new) {
            let scale = factor * mu;
            for c in 0..DEVIATORIC_COMPONENTS {
                r[c] = alphaval * r[c] + scale * (betaval * old[c] + gammaval * new[c]);
            }
        }
    }
}
