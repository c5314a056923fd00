//! Structured meshes with affine geometry, for setting up small problems.
use crate::error::Error;
use crate::mesh::{local_index, RegionTag, SpectralMesh};
use crate::nalgebra::{convert, Matrix3, Point3, Vector3};
use crate::Real;
use globe_sem_quadrature::univariate::gauss_lobatto;

fn gll_reference_points<const NGLL: usize>() -> Vec<f64> {
    let (_, points) = gauss_lobatto(NGLL).expect("GLL rules require at least two points per axis");
    points.into_iter().map(|[x]| x).collect()
}

/// Create an axis-aligned box of `nx × ny × nz` hexahedral spectral elements.
///
/// The box spans `origin + [0, extents]`. Neighboring elements share the GLL nodes on their
/// common faces, edges and corners, and every element has the given region tag.
///
/// If any of the element counts is zero, the mesh is empty.
///
/// # Panics
///
/// Panics if `NGLL < 2`.
pub fn create_box_mesh<T, const NGLL: usize>(
    num_elements: [usize; 3],
    origin: &Point3<T>,
    extents: &Vector3<T>,
    tag: RegionTag,
) -> Result<SpectralMesh<T, NGLL>, Error>
where
    T: Real,
{
    let [nx, ny, nz] = num_elements;
    if nx == 0 || ny == 0 || nz == 0 {
        return SpectralMesh::try_from_parts(Vec::new(), Vec::new(), Vec::new(), Vec::new());
    }

    let xi = gll_reference_points::<NGLL>();
    let n = NGLL - 1;
    // Number of global nodes along each axis
    let [gx, gy, gz] = [nx * n + 1, ny * n + 1, nz * n + 1];
    let global_index = |gi: usize, gj: usize, gk: usize| gi + gx * (gj + gy * gk);

    let sizes = Vector3::new(
        extents.x / convert(nx as f64),
        extents.y / convert(ny as f64),
        extents.z / convert(nz as f64),
    );
    let half: T = convert(0.5);

    // Coordinate of global node `g` along an axis with element size `h`
    let coordinate = |g: usize, h: T| {
        let (element, local) = if g == 0 { (0, 0) } else { ((g - 1) / n, (g - 1) % n + 1) };
        let offset: T = convert(element as f64);
        let reference: T = convert(xi[local]);
        h * (offset + half * (reference + T::one()))
    };

    let mut positions = Vec::with_capacity(gx * gy * gz);
    for gk in 0..gz {
        for gj in 0..gy {
            for gi in 0..gx {
                let x = coordinate(gi, sizes.x);
                let y = coordinate(gj, sizes.y);
                let z = coordinate(gk, sizes.z);
                positions.push(origin + Vector3::new(x, y, z));
            }
        }
    }

    let two: T = convert(2.0);
    let inverse_jacobian = Matrix3::from_diagonal(&Vector3::new(two / sizes.x, two / sizes.y, two / sizes.z));

    let num_elements = nx * ny * nz;
    let ngll3 = NGLL * NGLL * NGLL;
    let mut ibool = vec![0; ngll3 * num_elements];
    for ez in 0..nz {
        for ey in 0..ny {
            for ex in 0..nx {
                let element = ex + nx * (ey + ny * ez);
                let element_nodes = &mut ibool[ngll3 * element..ngll3 * (element + 1)];
                for k in 0..NGLL {
                    for j in 0..NGLL {
                        for i in 0..NGLL {
                            element_nodes[local_index::<NGLL>(i, j, k)] =
                                global_index(ex * n + i, ey * n + j, ez * n + k);
                        }
                    }
                }
            }
        }
    }

    SpectralMesh::try_from_parts(
        ibool,
        vec![inverse_jacobian; ngll3 * num_elements],
        vec![tag; num_elements],
        positions,
    )
}

/// Create a single element with the affine geometry `x = A ξ + b`.
///
/// The inverse Jacobian is `A⁻¹` at every node. A singular `A` yields
/// [`Error::DegenerateGeometry`] for the first node.
///
/// # Panics
///
/// Panics if `NGLL < 2`.
pub fn create_affine_element<T, const NGLL: usize>(
    a: &Matrix3<T>,
    b: &Vector3<T>,
    tag: RegionTag,
) -> Result<SpectralMesh<T, NGLL>, Error>
where
    T: Real,
{
    let xi = gll_reference_points::<NGLL>();
    let ngll3 = NGLL * NGLL * NGLL;

    let mut positions = Vec::with_capacity(ngll3);
    for k in 0..NGLL {
        for j in 0..NGLL {
            for i in 0..NGLL {
                let reference = Vector3::new(convert(xi[i]), convert(xi[j]), convert(xi[k]));
                positions.push(Point3::from(a * reference + b));
            }
        }
    }

    // A zero inverse Jacobian is rejected by the geometry validation
    let inverse_jacobian = a.try_inverse().unwrap_or_else(Matrix3::zeros);
    SpectralMesh::try_from_parts(
        (0..ngll3).collect(),
        vec![inverse_jacobian; ngll3],
        vec![tag],
        positions,
    )
}
