//! Errors reported while setting up or running the force kernel.
//!
//! The kernel itself is pure arithmetic. The only faults are inconsistent inputs, which are
//! detected once at setup and reported as an [`Error`].
use std::fmt;
use std::fmt::{Display, Formatter};

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The Jacobian of the reference-to-physical map is zero or not finite at a node.
    DegenerateGeometry { element: usize, node: usize },
    /// The local-to-global map is inconsistent with the mesh dimensions.
    InvalidTopology(String),
    /// Material arrays do not match the mesh, or required material data is missing.
    MaterialLayout(String),
    /// Attenuation tables or state do not match the mesh or the number of mechanisms.
    Attenuation(String),
    /// Two elements assigned to the same color share a global node.
    ColoringNotDisjoint { color: usize, node: usize },
    /// The combination of feature flags is not supported.
    InvalidConfig(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateGeometry { element, node } => {
                write!(
                    f,
                    "degenerate geometry: Jacobian at local node {node} of element {element} is zero or not finite"
                )
            }
            Self::InvalidTopology(msg) => write!(f, "invalid mesh topology: {msg}"),
            Self::MaterialLayout(msg) => write!(f, "invalid material layout: {msg}"),
            Self::Attenuation(msg) => write!(f, "invalid attenuation setup: {msg}"),
            Self::ColoringNotDisjoint { color, node } => {
                write!(f, "color {color} contains several elements sharing global node {node}")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid kernel configuration: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
