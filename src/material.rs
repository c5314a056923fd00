//! Elastic material parameters stored per local GLL node.
use crate::error::Error;
use crate::nalgebra::Matrix6;
use crate::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Bulk and shear modulus of an isotropic material.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsotropicModuli<T> {
    pub kappav: T,
    pub muv: T,
}

/// Moduli of a transversely isotropic material with a radial symmetry axis.
///
/// `kappav`, `muv` are the moduli for the vertical (radial) direction, `kappah`, `muh` those for
/// the horizontal directions, and `eta_aniso` the dimensionless parameter $\eta$ controlling
/// the incidence-angle dependence.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransverseIsotropicModuli<T> {
    pub kappav: T,
    pub kappah: T,
    pub muv: T,
    pub muh: T,
    pub eta_aniso: T,
}

impl<T: Real> TransverseIsotropicModuli<T> {
    /// Transversely isotropic moduli that describe an isotropic material.
    pub fn isotropic(kappa: T, mu: T) -> Self {
        Self {
            kappav: kappa,
            kappah: kappa,
            muv: mu,
            muh: mu,
            eta_aniso: T::one(),
        }
    }
}

/// The 21 independent coefficients of a general elastic stiffness tensor.
///
/// Coefficients use Voigt notation with the component order xx, yy, zz, yz, xz, xy, so that
/// `c44` couples yz with yz and `c16` couples xx with xy. Stress is obtained from engineering
/// shear strains, i.e. the Voigt strain vector is $(\varepsilon_{xx}, \varepsilon_{yy},
/// \varepsilon_{zz}, 2\varepsilon_{yz}, 2\varepsilon_{xz}, 2\varepsilon_{xy})$.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnisotropicStiffness<T> {
    pub c11: T,
    pub c12: T,
    pub c13: T,
    pub c14: T,
    pub c15: T,
    pub c16: T,
    pub c22: T,
    pub c23: T,
    pub c24: T,
    pub c25: T,
    pub c26: T,
    pub c33: T,
    pub c34: T,
    pub c35: T,
    pub c36: T,
    pub c44: T,
    pub c45: T,
    pub c46: T,
    pub c55: T,
    pub c56: T,
    pub c66: T,
}

impl<T: Real> AnisotropicStiffness<T> {
    /// The stiffness of an isotropic material with bulk modulus `kappa` and shear modulus `mu`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn isotropic(kappa: T, mu: T) -> Self {
        let lambda = kappa - 2.0 / 3.0 * mu;
        let mut c = Matrix6::zeros();
        for i in 0..3 {
            for j in 0..3 {
                c[(i, j)] = lambda;
            }
            c[(i, i)] += 2.0 * mu;
            c[(i + 3, i + 3)] = mu;
        }
        Self::from_voigt_matrix(&c)
    }

    /// The full symmetric 6x6 Voigt stiffness matrix.
    #[rustfmt::skip]
    pub fn to_voigt_matrix(&self) -> Matrix6<T> {
        let c = self;
        Matrix6::new(
            c.c11, c.c12, c.c13, c.c14, c.c15, c.c16,
            c.c12, c.c22, c.c23, c.c24, c.c25, c.c26,
            c.c13, c.c23, c.c33, c.c34, c.c35, c.c36,
            c.c14, c.c24, c.c34, c.c44, c.c45, c.c46,
            c.c15, c.c25, c.c35, c.c45, c.c55, c.c56,
            c.c16, c.c26, c.c36, c.c46, c.c56, c.c66,
        )
    }

    /// Build the coefficients from the upper triangle of a Voigt stiffness matrix.
    ///
    /// The lower triangle is ignored.
    pub fn from_voigt_matrix(c: &Matrix6<T>) -> Self {
        Self {
            c11: c[(0, 0)],
            c12: c[(0, 1)],
            c13: c[(0, 2)],
            c14: c[(0, 3)],
            c15: c[(0, 4)],
            c16: c[(0, 5)],
            c22: c[(1, 1)],
            c23: c[(1, 2)],
            c24: c[(1, 3)],
            c25: c[(1, 4)],
            c26: c[(1, 5)],
            c33: c[(2, 2)],
            c34: c[(2, 3)],
            c35: c[(2, 4)],
            c36: c[(2, 5)],
            c44: c[(3, 3)],
            c45: c[(3, 4)],
            c46: c[(3, 5)],
            c55: c[(4, 4)],
            c56: c[(4, 5)],
            c66: c[(5, 5)],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TransverseIsotropyArrays<T> {
    kappah: Vec<T>,
    muh: Vec<T>,
    eta_aniso: Vec<T>,
}

/// Material parameters for every local node of a mesh.
///
/// All arrays use the layout `node + nodes_per_element · element`, the same as the
/// local-to-global map of the mesh. The isotropic moduli are always present, since they also
/// provide the reference shear modulus for attenuation. Transversely isotropic and fully
/// anisotropic parameters are optional and only needed by elements that use them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialStore<T> {
    nodes_per_element: usize,
    kappav: Vec<T>,
    muv: Vec<T>,
    transverse_isotropy: Option<TransverseIsotropyArrays<T>>,
    anisotropy: Option<Vec<AnisotropicStiffness<T>>>,
}

impl<T: Real> MaterialStore<T> {
    pub fn from_isotropic(nodes_per_element: usize, kappav: Vec<T>, muv: Vec<T>) -> Self {
        Self {
            nodes_per_element,
            kappav,
            muv,
            transverse_isotropy: None,
            anisotropy: None,
        }
    }

    /// A store in which every node has the same isotropic moduli.
    pub fn uniform(nodes_per_element: usize, num_elements: usize, moduli: IsotropicModuli<T>) -> Self {
        let n = nodes_per_element * num_elements;
        Self::from_isotropic(nodes_per_element, vec![moduli.kappav; n], vec![moduli.muv; n])
    }

    pub fn with_transverse_isotropy(self, kappah: Vec<T>, muh: Vec<T>, eta_aniso: Vec<T>) -> Self {
        Self {
            transverse_isotropy: Some(TransverseIsotropyArrays { kappah, muh, eta_aniso }),
            ..self
        }
    }

    pub fn with_anisotropy(self, stiffness: Vec<AnisotropicStiffness<T>>) -> Self {
        Self {
            anisotropy: Some(stiffness),
            ..self
        }
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    pub fn has_transverse_isotropy(&self) -> bool {
        self.transverse_isotropy.is_some()
    }

    pub fn has_anisotropy(&self) -> bool {
        self.anisotropy.is_some()
    }

    /// Check that every present array has one entry per local node.
    pub fn validate(&self, num_local_nodes: usize) -> Result<(), Error> {
        let check = |name: &str, len: usize| {
            if len == num_local_nodes {
                Ok(())
            } else {
                Err(Error::MaterialLayout(format!(
                    "{name} has {len} entries, expected one per local node ({num_local_nodes})"
                )))
            }
        };

        check("kappav", self.kappav.len())?;
        check("muv", self.muv.len())?;
        if let Some(ti) = &self.transverse_isotropy {
            check("kappah", ti.kappah.len())?;
            check("muh", ti.muh.len())?;
            check("eta_aniso", ti.eta_aniso.len())?;
        }
        if let Some(stiffness) = &self.anisotropy {
            check("anisotropic stiffness", stiffness.len())?;
        }
        Ok(())
    }

    fn index(&self, element: usize, node: usize) -> usize {
        debug_assert!(node < self.nodes_per_element);
        node + self.nodes_per_element * element
    }

    pub fn isotropic(&self, element: usize, node: usize) -> IsotropicModuli<T> {
        let idx = self.index(element, node);
        IsotropicModuli {
            kappav: self.kappav[idx],
            muv: self.muv[idx],
        }
    }

    /// Transversely isotropic moduli at the node, if the store carries them.
    pub fn transverse_isotropic(&self, element: usize, node: usize) -> Option<TransverseIsotropicModuli<T>> {
        let idx = self.index(element, node);
        self.transverse_isotropy
            .as_ref()
            .map(|ti| TransverseIsotropicModuli {
                kappav: self.kappav[idx],
                kappah: ti.kappah[idx],
                muv: self.muv[idx],
                muh: ti.muh[idx],
                eta_aniso: ti.eta_aniso[idx],
            })
    }

    /// Anisotropic stiffness at the node, if the store carries it.
    pub fn anisotropic(&self, element: usize, node: usize) -> Option<&AnisotropicStiffness<T>> {
        let idx = self.index(element, node);
        self.anisotropy.as_ref().map(|c| &c[idx])
    }
}
