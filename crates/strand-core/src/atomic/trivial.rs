//! Trivial strategy for single-threaded builds.
//!
//! Operations are plain reads and writes through a [`Cell`]; ordering hints
//! are ignored. The types are `!Sync`, so the compiler rejects any attempt to
//! share one between threads. `compare_exchange_weak` never fails spuriously
//! here and is identical to `compare_exchange_strong`.

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::Ordering;

use super::{AtomicInteger, AtomicOps, FlagOps, impl_compound_assign};

/// Non-synchronized integer with the `AtomicOps` surface.
pub struct AtomicValue<T: AtomicInteger> {
    value: Cell<T>,
}

impl<T: AtomicInteger> AtomicValue<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            value: Cell::new(value),
        }
    }

    #[inline]
    fn update(&self, f: impl FnOnce(T) -> T) -> T {
        let old = self.value.get();
        self.value.set(f(old));
        old
    }
}

impl<T: AtomicInteger> AtomicOps<T> for AtomicValue<T> {
    fn new(value: T) -> Self {
        AtomicValue::new(value)
    }

    fn into_inner(self) -> T {
        self.value.into_inner()
    }

    fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    #[inline]
    fn load(&self, _order: Ordering) -> T {
        self.value.get()
    }

    #[inline]
    fn store(&self, value: T, _order: Ordering) {
        self.value.set(value);
    }

    #[inline]
    fn exchange(&self, value: T, _order: Ordering) -> T {
        self.value.replace(value)
    }

    #[inline]
    fn compare_exchange_weak(&self, current: T, new: T, order: Ordering) -> Result<T, T> {
        self.compare_exchange_strong(current, new, order)
    }

    #[inline]
    fn compare_exchange_strong(&self, current: T, new: T, _order: Ordering) -> Result<T, T> {
        let actual = self.value.get();
        if actual == current {
            self.value.set(new);
            Ok(actual)
        } else {
            Err(actual)
        }
    }

    #[inline]
    fn fetch_add(&self, value: T, _order: Ordering) -> T {
        self.update(|old| old.wrapping_add(value))
    }

    #[inline]
    fn fetch_sub(&self, value: T, _order: Ordering) -> T {
        self.update(|old| old.wrapping_sub(value))
    }

    #[inline]
    fn fetch_and(&self, value: T, _order: Ordering) -> T {
        self.update(|old| old & value)
    }

    #[inline]
    fn fetch_or(&self, value: T, _order: Ordering) -> T {
        self.update(|old| old | value)
    }

    #[inline]
    fn fetch_xor(&self, value: T, _order: Ordering) -> T {
        self.update(|old| old ^ value)
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
        f.debug_tuple("AtomicValue").field(&self.value.get()).finish()
    }
}

/// Non-synchronized one-shot gate.
#[derive(Default)]
pub struct AtomicFlag {
    set: Cell<bool>,
}

impl AtomicFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set: Cell::new(false),
        }
    }
}

impl FlagOps for AtomicFlag {
    #[inline]
    fn test_and_set(&self, _order: Ordering) -> bool {
        self.set.replace(true)
    }

    #[inline]
    fn clear(&self, _order: Ordering) {
        self.set.set(false);
    }

    #[inline]
    fn is_set(&self, _order: Ordering) -> bool {
        self.set.get()
    }
}

impl fmt::Debug for AtomicFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicFlag").field(&self.set.get()).finish()
    }
}
