use crate::nalgebra::{DVector, Scalar};
use crate::{AtomicScalar, Real};

/// A field of scalars that supports concurrent accumulation.
///
/// Every entry is stored as the bit pattern of the scalar in an atomic integer, and
/// [`fetch_add`](Self::fetch_add) retries a compare-and-exchange until the addition succeeds.
#[derive(Debug)]
pub struct AtomicField<T: AtomicScalar> {
    values: Vec<T::Atomic>,
}

impl<T: AtomicScalar> AtomicField<T> {
    pub fn from_values(values: &[T]) -> Self {
        Self {
            values: values.iter().map(|&v| T::new_atomic(v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Atomically add `value` to the entry at `index`, returning the previous value.
    pub fn fetch_add(&self, index: usize, value: T) -> T {
        T::fetch_add(&self.values[index], value)
    }

    pub fn load(&self, index: usize) -> T {
        T::load(&self.values[index])
    }

    pub fn store(&self, index: usize, value: T) {
        T::store(&self.values[index], value)
    }

    /// Copy the current values into `output`.
    pub fn copy_to_slice(&self, output: &mut [T]) {
        assert_eq!(output.len(), self.values.len());
        for (out, atomic) in output.iter_mut().zip(&self.values) {
            *out = T::load(atomic);
        }
    }

    pub fn into_values(self) -> Vec<T> {
        self.values.into_iter().map(T::into_inner).collect()
    }
}

impl<T: AtomicScalar + Real> AtomicField<T> {
    pub fn zeros(len: usize) -> Self {
        Self::from_values(&vec![T::zero(); len])
    }
}

impl<T: AtomicScalar + Scalar> From<&DVector<T>> for AtomicField<T> {
    fn from(vector: &DVector<T>) -> Self {
        Self::from_values(vector.as_slice())
    }
}

impl<T: AtomicScalar + Scalar> From<AtomicField<T>> for DVector<T> {
    fn from(field: AtomicField<T>) -> Self {
        DVector::from_vec(field.into_values())
    }
}
