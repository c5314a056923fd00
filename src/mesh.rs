//! Spectral element mesh: local-to-global numbering, geometry and region tags.
use crate::error::Error;
use crate::nalgebra::{Matrix3, Point3};
use crate::Real;
use serde::{Deserialize, Serialize};

pub mod procedural;

/// Index of GLL point `(i, j, k)` within an element, with `i` running fastest.
#[inline(always)]
pub const fn local_index<const NGLL: usize>(i: usize, j: usize, k: usize) -> usize {
    i + NGLL * (j + NGLL * k)
}

/// Layer classification of an element, as assigned by the global mesher.
///
/// The discriminants match the integer flags written by the mesher.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionTag {
    Crust = 1,
    MohoTo80 = 2,
    From80To220 = 3,
    From220To670 = 4,
    MantleNormal = 5,
    OuterCore = 6,
    InnerCore = 7,
    MiddleCentralCube = 8,
    BottomCentralCube = 9,
    TopCentralCube = 10,
    InFictitiousCube = 11,
}

impl RegionTag {
    pub fn try_from_flag(flag: i32) -> Option<Self> {
        use RegionTag::*;
        let tag = match flag {
            1 => Crust,
            2 => MohoTo80,
            3 => From80To220,
            4 => From220To670,
            5 => MantleNormal,
            6 => OuterCore,
            7 => InnerCore,
            8 => MiddleCentralCube,
            9 => BottomCentralCube,
            10 => TopCentralCube,
            11 => InFictitiousCube,
            _ => return None,
        };
        Some(tag)
    }

    pub fn flag(&self) -> i32 {
        *self as i32
    }

    /// Whether the element lies in the depth band between the Moho and 220 km, the only band
    /// in which transverse isotropy is applied.
    pub fn is_transverse_isotropy_band(&self) -> bool {
        matches!(self, Self::MohoTo80 | Self::From80To220)
    }
}

/// Spherical coordinates of a mesh node.
///
/// `theta` is the co-latitude measured from the +z axis and `phi` the longitude measured from
/// the +x axis.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphericalCoordinates<T> {
    pub radius: T,
    pub theta: T,
    pub phi: T,
}

impl<T: Real> SphericalCoordinates<T> {
    pub fn from_cartesian(x: &Point3<T>) -> Self {
        let radius = x.coords.norm();
        let theta = if radius > T::zero() {
            (x.z / radius).clamp(-T::one(), T::one()).acos()
        } else {
            T::zero()
        };
        let phi = x.y.atan2(x.x);
        Self { radius, theta, phi }
    }
}

/// A mesh of hexahedral spectral elements with `NGLL` GLL points per axis.
///
/// Global nodes are shared by all elements meeting at a face, edge or corner, so the map from
/// local to global node indices is many-to-one. The geometry is stored as the inverse
/// Jacobian $\partial(\xi, \eta, \gamma) / \partial(x, y, z)$ at every local node: row 0 holds
/// $(\xi_x, \xi_y, \xi_z)$, row 1 the $\eta$ derivatives and row 2 the $\gamma$ derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralMesh<T: Real, const NGLL: usize> {
    num_global_nodes: usize,
    ibool: Vec<usize>,
    inverse_jacobians: Vec<Matrix3<T>>,
    region_tags: Vec<RegionTag>,
    positions: Vec<Point3<T>>,
    spherical_coordinates: Vec<SphericalCoordinates<T>>,
}

impl<T: Real, const NGLL: usize> SpectralMesh<T, NGLL> {
    pub const NGLL3: usize = NGLL * NGLL * NGLL;

    /// Assemble a mesh from its raw arrays, validating topology and geometry.
    ///
    /// - `ibool` maps `local + NGLL³ · element` to a global node index,
    /// - `inverse_jacobians` uses the same layout as `ibool`,
    /// - `region_tags` has one entry per element,
    /// - `positions` has one entry per global node.
    pub fn try_from_parts(
        ibool: Vec<usize>,
        inverse_jacobians: Vec<Matrix3<T>>,
        region_tags: Vec<RegionTag>,
        positions: Vec<Point3<T>>,
    ) -> Result<Self, Error> {
        let num_elements = region_tags.len();
        let num_global_nodes = positions.len();
        let num_local = Self::NGLL3 * num_elements;

        if ibool.len() != num_local {
            return Err(Error::InvalidTopology(format!(
                "local-to-global map has {} entries, expected {} for {} elements",
                ibool.len(),
                num_local,
                num_elements
            )));
        }
        if inverse_jacobians.len() != num_local {
            return Err(Error::InvalidTopology(format!(
                "geometry has {} entries, expected {}",
                inverse_jacobians.len(),
                num_local
            )));
        }

        let mut visited = vec![false; num_global_nodes];
        for &iglob in &ibool {
            let entry = visited.get_mut(iglob).ok_or_else(|| {
                Error::InvalidTopology(format!(
                    "global node index {iglob} out of bounds for {num_global_nodes} nodes"
                ))
            })?;
            *entry = true;
        }
        if let Some(orphan) = visited.iter().position(|v| !v) {
            return Err(Error::InvalidTopology(format!(
                "global node {orphan} does not belong to any element"
            )));
        }

        let spherical_coordinates = positions.iter().map(SphericalCoordinates::from_cartesian).collect();
        let mesh = Self {
            num_global_nodes,
            ibool,
            inverse_jacobians,
            region_tags,
            positions,
            spherical_coordinates,
        };
        mesh.validate_geometry()?;
        Ok(mesh)
    }

    /// Check that the Jacobian is non-zero and finite at every local node.
    pub fn validate_geometry(&self) -> Result<(), Error> {
        for element in 0..self.num_elements() {
            for node in 0..Self::NGLL3 {
                let det = self.inverse_jacobian(element, node).determinant();
                let jacobian = T::one() / det;
                if det == T::zero() || !det.is_finite() || !jacobian.is_finite() {
                    return Err(Error::DegenerateGeometry { element, node });
                }
            }
        }
        Ok(())
    }

    pub fn num_elements(&self) -> usize {
        self.region_tags.len()
    }

    pub fn num_global_nodes(&self) -> usize {
        self.num_global_nodes
    }

    /// Global indices of all local nodes of the element, in local node order.
    pub fn element_nodes(&self, element: usize) -> &[usize] {
        let n = Self::NGLL3;
        &self.ibool[n * element..n * (element + 1)]
    }

    pub fn ibool(&self) -> &[usize] {
        &self.ibool
    }

    pub fn inverse_jacobian(&self, element: usize, node: usize) -> &Matrix3<T> {
        &self.inverse_jacobians[Self::NGLL3 * element + node]
    }

    pub fn element_inverse_jacobians(&self, element: usize) -> &[Matrix3<T>] {
        let n = Self::NGLL3;
        &self.inverse_jacobians[n * element..n * (element + 1)]
    }

    /// The Jacobian determinant of the reference-to-physical map, i.e. the reciprocal of the
    /// determinant of the stored inverse Jacobian.
    pub fn jacobian_determinant(&self, element: usize, node: usize) -> T {
        T::one() / self.inverse_jacobian(element, node).determinant()
    }

    pub fn region_tag(&self, element: usize) -> RegionTag {
        self.region_tags[element]
    }

    pub fn region_tags(&self) -> &[RegionTag] {
        &self.region_tags
    }

    pub fn positions(&self) -> &[Point3<T>] {
        &self.positions
    }

    pub fn spherical_coordinates(&self, global_node: usize) -> &SphericalCoordinates<T> {
        &self.spherical_coordinates[global_node]
    }

    /// Radius at the GLL point closest to the centre of the element.
    pub fn element_center_radius(&self, element: usize) -> T {
        let mid = NGLL / 2;
        let iglob = self.element_nodes(element)[local_index::<NGLL>(mid, mid, mid)];
        self.spherical_coordinates[iglob].radius
    }
}
