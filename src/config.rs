//! Feature flags selecting the physics and the assembly strategy of the force kernel.
use crate::assembly::AssemblyStrategy;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Configuration of the force kernel.
///
/// The defaults describe the simplest kernel: isotropic elasticity without attenuation and
/// without strain recording, assembled with element coloring. Missing fields take their
/// default values when deserializing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Record the deviatoric strain of every element after each force evaluation.
    pub compute_and_store_strain: bool,
    pub attenuation: bool,
    /// Use the full anisotropic stiffness in the crust and mantle.
    pub anisotropic_mantle: bool,
    /// Use radial transverse isotropy in the designated depth band of the mantle.
    pub transverse_isotropy: bool,
    pub anisotropic_inner_core: bool,
    pub assembly_strategy: AssemblyStrategy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            compute_and_store_strain: false,
            attenuation: false,
            anisotropic_mantle: false,
            transverse_isotropy: false,
            anisotropic_inner_core: false,
            assembly_strategy: AssemblyStrategy::Colored,
        }
    }
}

impl KernelConfig {
    pub fn with_strain_recording(self, enabled: bool) -> Self {
        Self {
            compute_and_store_strain: enabled,
            ..self
        }
    }

    pub fn with_attenuation(self, enabled: bool) -> Self {
        Self {
            attenuation: enabled,
            ..self
        }
    }

    pub fn with_anisotropic_mantle(self, enabled: bool) -> Self {
        Self {
            anisotropic_mantle: enabled,
            ..self
        }
    }

    pub fn with_transverse_isotropy(self, enabled: bool) -> Self {
        Self {
            transverse_isotropy: enabled,
            ..self
        }
    }

    pub fn with_anisotropic_inner_core(self, enabled: bool) -> Self {
        Self {
            anisotropic_inner_core: enabled,
            ..self
        }
    }

    pub fn with_assembly_strategy(self, strategy: AssemblyStrategy) -> Self {
        Self {
            assembly_strategy: strategy,
            ..self
        }
    }

    /// Check that the combination of flags is supported.
    ///
    /// Attenuation requires strain recording, because the memory-variable update needs the
    /// strain of the previous step.
    pub fn validate(&self) -> Result<(), Error> {
        if self.attenuation && !self.compute_and_store_strain {
            return Err(Error::InvalidConfig(
                "attenuation requires strain recording to be enabled".to_string(),
            ));
        }
        Ok(())
    }
}
