//! Portable atomic accumulation for floating-point scalars.
//!
//! Few platforms offer a native atomic floating-point add. Instead, the value is stored as its
//! bit pattern in an atomic integer of the same width, and additions are performed with a
//! compare-and-exchange retry loop: read the current bits, add in floating point, and publish
//! the new bits only if nobody else has written in the meantime.
//!
//! The final value after concurrent additions is the sum of all contributions, but the order
//! in which they are added is unspecified, so results may differ in the last bits between runs.
use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A scalar that supports atomic accumulation through its bit pattern.
pub trait AtomicScalar: Copy + Send + Sync + 'static {
    type Atomic: Send + Sync + Debug;

    fn new_atomic(value: Self) -> Self::Atomic;

    fn load(atomic: &Self::Atomic) -> Self;

    fn store(atomic: &Self::Atomic, value: Self);

    /// Atomically add `value`, returning the previous value.
    fn fetch_add(atomic: &Self::Atomic, value: Self) -> Self;

    fn into_inner(atomic: Self::Atomic) -> Self;
}

macro_rules! impl_atomic_scalar {
    ($float:ty, $atomic:ty) => {
        impl AtomicScalar for $float {
            type Atomic = $atomic;

            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value.to_bits())
            }

            fn load(atomic: &Self::Atomic) -> Self {
                <$float>::from_bits(atomic.load(Ordering::Relaxed))
            }

            fn store(atomic: &Self::Atomic, value: Self) {
                atomic.store(value.to_bits(), Ordering::Relaxed)
            }

            fn fetch_add(atomic: &Self::Atomic, value: Self) -> Self {
                let mut current = atomic.load(Ordering::Relaxed);
                loop {
                    let new = (<$float>::from_bits(current) + value).to_bits();
                    match atomic.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed) {
                        Ok(previous) => return <$float>::from_bits(previous),
                        Err(actual) => current = actual,
                    }
                }
            }

            fn into_inner(atomic: Self::Atomic) -> Self {
                <$float>::from_bits(atomic.into_inner())
            }
        }
    };
}

impl_atomic_scalar!(f32, AtomicU32);
impl_atomic_scalar!(f64, AtomicU64);
