use std::marker::PhantomData;
use std::ops::Range;

/// Shared mutable access to a slice from several threads, for writes to disjoint indices.
///
/// The caller is responsible for ensuring that no two threads access the same index at the same
/// time. Element colorings provide exactly this guarantee for the nodes of the elements within a
/// color, and per-element state is naturally disjoint between elements.
#[derive(Debug)]
pub struct DisjointSliceAccess<'a, T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<&'a mut T>,
}

impl<'a, T> DisjointSliceAccess<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Obtain a mutable reference to the entry at `index`.
    ///
    /// # Safety
    ///
    /// The index must be in bounds. Multiple threads must not access the same index without
    /// synchronization.
    pub unsafe fn get_unchecked_mut(&self, index: usize) -> &'a mut T {
        debug_assert!(index < self.len);
        &mut *self.ptr.add(index)
    }

    /// Construct a subslice for the given range.
    ///
    /// # Safety
    ///
    /// The range must be valid for the slice.
    ///
    /// Multiple threads must not call this function with overlapping ranges without synchronization.
    pub unsafe fn subslice_mut(&self, range: Range<usize>) -> &'a mut [T] {
        let Range { start, end } = range;
        debug_assert!(end >= start);
        debug_assert!(end <= self.len);
        std::slice::from_raw_parts_mut(self.ptr.add(start), end - start)
    }
}

impl<'a, T> Clone for DisjointSliceAccess<'a, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            len: self.len,
            marker: PhantomData,
        }
    }
}

unsafe impl<'a, T: Send> Sync for DisjointSliceAccess<'a, T> {}
unsafe impl<'a, T: Send> Send for DisjointSliceAccess<'a, T> {}
