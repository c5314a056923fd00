//! Accumulation of element forces into the global acceleration field.
//!
//! Neighboring elements share global nodes, so element contributions must be summed. Three
//! strategies are available:
//!
//! - [`AssemblyStrategy::Serial`] visits elements one by one,
//! - [`AssemblyStrategy::Colored`] processes the elements of one [color](ElementColoring) at a
//!   time in parallel. Elements of the same color share no global node, so their writes never
//!   conflict,
//! - [`AssemblyStrategy::Atomic`] processes all elements in parallel and accumulates through
//!   atomic compare-and-exchange additions on an [`AtomicField`].
//!
//! The strategies compute the same sums in different orders. Since floating-point addition is
//! not associative, results agree up to rounding: the difference at a node is bounded by
//! roughly `n ε |f|`, where `n` is the number of elements sharing the node, `ε` the machine
//! epsilon and `|f|` the largest contribution.
use crate::nalgebra::Vector3;
use crate::{AtomicScalar, Real};
use itertools::izip;
use serde::{Deserialize, Serialize};

mod access;
mod atomic;
mod coloring;

pub use access::DisjointSliceAccess;
pub use atomic::AtomicField;
pub use coloring::ElementColoring;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssemblyStrategy {
    Serial,
    Colored,
    Atomic,
}

/// Add the local forces of an element to the global field, which stores three components per
/// global node.
pub fn scatter_add<T: Real>(acceleration: &mut [T], element_nodes: &[usize], local_forces: &[Vector3<T>]) {
    assert_eq!(element_nodes.len(), local_forces.len());
    for (&iglob, force) in izip!(element_nodes, local_forces) {
        for c in 0..3 {
            acceleration[3 * iglob + c] += force[c];
        }
    }
}

/// Same as [`scatter_add`], but through disjoint parallel access.
///
/// # Safety
///
/// No other thread may concurrently access any component of the element's nodes, and all
/// indices must be in bounds.
pub unsafe fn scatter_add_disjoint<T: Real>(
    acceleration: &DisjointSliceAccess<T>,
    element_nodes: &[usize],
    local_forces: &[Vector3<T>],
) {
    assert_eq!(element_nodes.len(), local_forces.len());
    for (&iglob, force) in izip!(element_nodes, local_forces) {
        let node_acceleration = acceleration.subslice_mut(3 * iglob..3 * iglob + 3);
        for c in 0..3 {
            node_acceleration[c] += force[c];
        }
    }
}

/// Same as [`scatter_add`], but accumulating atomically.
pub fn scatter_add_atomic<T>(acceleration: &AtomicField<T>, element_nodes: &[usize], local_forces: &[Vector3<T>])
where
    T: Real + AtomicScalar,
{
    assert_eq!(element_nodes.len(), local_forces.len());
    for (&iglob, force) in izip!(element_nodes, local_forces) {
        for c in 0..3 {
            acceleration.fetch_add(3 * iglob + c, force[c]);
        }
    }
}
