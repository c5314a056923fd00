//! Parameterization of the element kernel by the region of the earth it runs on.
//!
//! The crust/mantle and the inner core share a single element kernel and differ only in which
//! elements take part and which constitutive policy each element uses.
use crate::config::KernelConfig;
use crate::constitutive::ConstitutivePolicy;
use crate::mesh::RegionTag;

pub trait Region: Sync {
    /// Human-readable name, used for logging.
    fn name(&self) -> &'static str;

    /// Whether elements with the given tag are computed at all.
    fn is_active(&self, tag: RegionTag) -> bool;

    fn constitutive_policy(&self, tag: RegionTag, config: &KernelConfig) -> ConstitutivePolicy;
}

/// The crust and mantle.
///
/// Full anisotropy takes precedence over transverse isotropy, which only applies to elements
/// in the band between the Moho and 220 km depth.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CrustMantle;

impl Region for CrustMantle {
    fn name(&self) -> &'static str {
        "crust/mantle"
    }

    fn is_active(&self, tag: RegionTag) -> bool {
        use RegionTag::*;
        matches!(tag, Crust | MohoTo80 | From80To220 | From220To670 | MantleNormal)
    }

    fn constitutive_policy(&self, tag: RegionTag, config: &KernelConfig) -> ConstitutivePolicy {
        if config.anisotropic_mantle {
            ConstitutivePolicy::Anisotropic
        } else if config.transverse_isotropy && tag.is_transverse_isotropy_band() {
            ConstitutivePolicy::TransverselyIsotropic
        } else {
            ConstitutivePolicy::Isotropic
        }
    }
}

/// The inner core, including the central cube.
///
/// Elements of the fictitious cube at the very center are not computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InnerCore;

impl Region for InnerCore {
    fn name(&self) -> &'static str {
        "inner core"
    }

    fn is_active(&self, tag: RegionTag) -> bool {
        use RegionTag::*;
        matches!(tag, InnerCore | MiddleCentralCube | BottomCentralCube | TopCentralCube)
    }

    fn constitutive_policy(&self, _tag: RegionTag, config: &KernelConfig) -> ConstitutivePolicy {
        if config.anisotropic_inner_core {
            ConstitutivePolicy::Anisotropic
        } else {
            ConstitutivePolicy::Isotropic
        }
    }
}
