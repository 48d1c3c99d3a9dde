//! Lock-free strategy: every operation is a hardware atomic.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use super::{AtomicInteger, AtomicOps, FlagOps, impl_compound_assign};

/// Clamp an ordering hint to one that is legal for a load.
#[inline]
const fn load_order(order: Ordering) -> Ordering {
    match order {
        Ordering::Release => Ordering::Relaxed,
        Ordering::AcqRel => Ordering::Acquire,
        other => other,
    }
}

/// Clamp an ordering hint to one that is legal for a store.
#[inline]
const fn store_order(order: Ordering) -> Ordering {
    match order {
        Ordering::Acquire => Ordering::Relaxed,
        Ordering::AcqRel => Ordering::Release,
        other => other,
    }
}

/// Hardware-backed atomic integer.
pub struct AtomicValue<T: AtomicInteger> {
    repr: T::Atomic,
}

impl<T: AtomicInteger> AtomicValue<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            repr: T::new_atomic(value),
        }
    }
}

impl<T: AtomicInteger> AtomicOps<T> for AtomicValue<T> {
    fn new(value: T) -> Self {
        AtomicValue::new(value)
    }

    fn into_inner(self) -> T {
        T::atomic_into_inner(self.repr)
    }

    fn get_mut(&mut self) -> &mut T {
        T::atomic_get_mut(&mut self.repr)
    }

    #[inline]
    fn load(&self, order: Ordering) -> T {
        T::atomic_load(&self.repr, load_order(order))
    }

    #[inline]
    fn store(&self, value: T, order: Ordering) {
        T::atomic_store(&self.repr, value, store_order(order));
    }

    #[inline]
    fn exchange(&self, value: T, order: Ordering) -> T {
        T::atomic_swap(&self.repr, value, order)
    }

    #[inline]
    fn compare_exchange_weak(&self, current: T, new: T, order: Ordering) -> Result<T, T> {
        T::atomic_compare_exchange_weak(&self.repr, current, new, order, load_order(order))
    }

    #[inline]
    fn compare_exchange_strong(&self, current: T, new: T, order: Ordering) -> Result<T, T> {
        T::atomic_compare_exchange(&self.repr, current, new, order, load_order(order))
    }

    #[inline]
    fn fetch_add(&self, value: T, order: Ordering) -> T {
        T::atomic_fetch_add(&self.repr, value, order)
    }

    #[inline]
    fn fetch_sub(&self, value: T, order: Ordering) -> T {
        T::atomic_fetch_sub(&self.repr, value, order)
    }

    #[inline]
    fn fetch_and(&self, value: T, order: Ordering) -> T {
        T::atomic_fetch_and(&self.repr, value, order)
    }

    #[inline]
    fn fetch_or(&self, value: T, order: Ordering) -> T {
        T::atomic_fetch_or(&self.repr, value, order)
    }

    #[inline]
    fn fetch_xor(&self, value: T, order: Ordering) -> T {
        T::atomic_fetch_xor(&self.repr, value, order)
    }
}

impl_compound_assign!(AtomicValue);

impl<T: AtomicInteger> Default for AtomicValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicInteger> From<T> for AtomicValue<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicInteger> fmt::Debug for AtomicValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicValue")
            .field(&self.load(Ordering::Relaxed))
            .finish()
    }
}

/// Hardware-backed one-shot gate.
#[derive(Default)]
pub struct AtomicFlag {
    set: AtomicBool,
}

impl AtomicFlag {
    /// A cleared flag; usable in `static` initializers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
        }
    }
}

impl FlagOps for AtomicFlag {
    #[inline]
    fn test_and_set(&self, order: Ordering) -> bool {
        self.set.swap(true, order)
    }

    #[inline]
    fn clear(&self, order: Ordering) {
        self.set.store(false, store_order(order));
    }

    #[inline]
    fn is_set(&self, order: Ordering) -> bool {
        self.set.load(load_order(order))
    }
}

impl fmt::Debug for AtomicFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicFlag")
            .field(&self.is_set(Ordering::Relaxed))
            .finish()
    }
}
