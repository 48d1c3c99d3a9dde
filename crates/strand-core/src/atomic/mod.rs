//! Atomic value and flag primitives with build-time strategy selection.
//!
//! Two strategies implement the same [`AtomicOps`] / [`FlagOps`] surface:
//!
//! - [`lockfree`]: maps every operation onto the hardware read-modify-write
//!   instructions exposed by `core::sync::atomic`. `Sync`, safe to share.
//! - [`trivial`]: plain reads and writes through a `Cell`. Zero cost, and
//!   `!Sync`, so handing one to a second thread does not compile.
//!
//! The crate-level [`AtomicValue`] and [`AtomicFlag`] aliases resolve to one
//! of the two depending on the `single-threaded` cargo feature. Nothing
//! inspects the choice at run time.
//!
//! Every operation takes an [`Ordering`] hint. The lock-free strategy
//! normalizes hints that are illegal for the operation (a `Release` load,
//! say) to the closest legal ordering instead of panicking; the trivial
//! strategy ignores them.

pub mod lockfree;
pub mod trivial;

use core::fmt;
use core::ops::{BitAnd, BitOr, BitXor};
use core::sync::atomic;

pub use core::sync::atomic::Ordering;

#[cfg(not(feature = "single-threaded"))]
pub use lockfree::{AtomicFlag, AtomicValue};
#[cfg(feature = "single-threaded")]
pub use trivial::{AtomicFlag, AtomicValue};

/// Name of the strategy behind the crate-level aliases.
#[cfg(not(feature = "single-threaded"))]
pub const STRATEGY: &str = "lockfree";
/// Name of the strategy behind the crate-level aliases.
#[cfg(feature = "single-threaded")]
pub const STRATEGY: &str = "trivial";

// ---------------------------------------------------------------------------
// Integer types usable inside AtomicValue
// ---------------------------------------------------------------------------

/// Integer types with a native atomic counterpart.
///
/// The `atomic_*` functions forward to the matching `core::sync::atomic`
/// type; the plain arithmetic helpers back the trivial strategy and the
/// derived increment/compound operations.
pub trait AtomicInteger:
    Copy
    + Eq
    + Default
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
{
    /// The hardware-backed atomic cell for this integer.
    type Atomic: Send + Sync;

    const ONE: Self;

    fn new_atomic(value: Self) -> Self::Atomic;
    fn atomic_get_mut(cell: &mut Self::Atomic) -> &mut Self;
    fn atomic_into_inner(cell: Self::Atomic) -> Self;
    fn atomic_load(cell: &Self::Atomic, order: Ordering) -> Self;
    fn atomic_store(cell: &Self::Atomic, value: Self, order: Ordering);
    fn atomic_swap(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_compare_exchange(
        cell: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
    fn atomic_compare_exchange_weak(
        cell: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
    fn atomic_fetch_add(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_sub(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_and(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_or(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_xor(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
}

macro_rules! impl_atomic_integer {
    ($($(#[$meta:meta])* $int:ty => $atomic:ty;)*) => {$(
        $(#[$meta])*
        impl AtomicInteger for $int {
            type Atomic = $atomic;

            const ONE: Self = 1;

            #[inline]
            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }
            #[inline]
            fn atomic_get_mut(cell: &mut Self::Atomic) -> &mut Self {
                cell.get_mut()
            }
            #[inline]
            fn atomic_into_inner(cell: Self::Atomic) -> Self {
                cell.into_inner()
            }
            #[inline]
            fn atomic_load(cell: &Self::Atomic, order: Ordering) -> Self {
                cell.load(order)
            }
            #[inline]
            fn atomic_store(cell: &Self::Atomic, value: Self, order: Ordering) {
                cell.store(value, order)
            }
            #[inline]
            fn atomic_swap(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.swap(value, order)
            }
            #[inline]
            fn atomic_compare_exchange(
                cell: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                cell.compare_exchange(current, new, success, failure)
            }
            #[inline]
            fn atomic_compare_exchange_weak(
                cell: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                cell.compare_exchange_weak(current, new, success, failure)
            }
            #[inline]
            fn atomic_fetch_add(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.fetch_add(value, order)
            }
            #[inline]
            fn atomic_fetch_sub(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.fetch_sub(value, order)
            }
            #[inline]
            fn atomic_fetch_and(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.fetch_and(value, order)
            }
            #[inline]
            fn atomic_fetch_or(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.fetch_or(value, order)
            }
            #[inline]
            fn atomic_fetch_xor(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.fetch_xor(value, order)
            }
            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$int>::wrapping_add(self, rhs)
            }
            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$int>::wrapping_sub(self, rhs)
            }
        }
    )*};
}

impl_atomic_integer! {
    i8 => atomic::AtomicI8;
    u8 => atomic::AtomicU8;
    i16 => atomic::AtomicI16;
    u16 => atomic::AtomicU16;
    i32 => atomic::AtomicI32;
    u32 => atomic::AtomicU32;
    #[cfg(target_has_atomic = "64")]
    i64 => atomic::AtomicI64;
    #[cfg(target_has_atomic = "64")]
    u64 => atomic::AtomicU64;
    isize => atomic::AtomicIsize;
    usize => atomic::AtomicUsize;
}

// ---------------------------------------------------------------------------
// Strategy interfaces
// ---------------------------------------------------------------------------

/// Operations every `AtomicValue` strategy provides.
///
/// Compare-exchange follows the `core::sync::atomic` convention:
/// `Ok(previous)` when the swap happened, `Err(actual)` otherwise, where
/// `actual` is the value the caller should retry with.
pub trait AtomicOps<T: AtomicInteger>: Sized {
    fn new(value: T) -> Self;

    /// Whether operations complete without taking a lock. True for both
    /// strategies; the trivial one cannot contend.
    fn is_lock_free(&self) -> bool {
        true
    }

    fn into_inner(self) -> T;
    fn get_mut(&mut self) -> &mut T;

    fn load(&self, order: Ordering) -> T;
    fn store(&self, value: T, order: Ordering);
    /// Stores `value`, returning the previous value.
    fn exchange(&self, value: T, order: Ordering) -> T;

    /// May fail spuriously under the lock-free strategy; call it in a loop.
    fn compare_exchange_weak(&self, current: T, new: T, order: Ordering) -> Result<T, T>;
    /// Never fails spuriously.
    fn compare_exchange_strong(&self, current: T, new: T, order: Ordering) -> Result<T, T>;

    fn fetch_add(&self, value: T, order: Ordering) -> T;
    fn fetch_sub(&self, value: T, order: Ordering) -> T;
    fn fetch_and(&self, value: T, order: Ordering) -> T;
    fn fetch_or(&self, value: T, order: Ordering) -> T;
    fn fetch_xor(&self, value: T, order: Ordering) -> T;

    fn compare_exchange(&self, current: T, new: T, order: Ordering) -> Result<T, T> {
        self.compare_exchange_strong(current, new, order)
    }

    /// Prefix increment: returns the new value.
    fn increment(&self, order: Ordering) -> T {
        self.fetch_add(T::ONE, order).wrapping_add(T::ONE)
    }

    /// Postfix increment: returns the old value.
    fn post_increment(&self, order: Ordering) -> T {
        self.fetch_add(T::ONE, order)
    }

    /// Prefix decrement: returns the new value.
    fn decrement(&self, order: Ordering) -> T {
        self.fetch_sub(T::ONE, order).wrapping_sub(T::ONE)
    }

    /// Postfix decrement: returns the old value.
    fn post_decrement(&self, order: Ordering) -> T {
        self.fetch_sub(T::ONE, order)
    }

    /// `+=` through a shared reference; returns the new value.
    fn add_fetch(&self, value: T, order: Ordering) -> T {
        self.fetch_add(value, order).wrapping_add(value)
    }

    fn sub_fetch(&self, value: T, order: Ordering) -> T {
        self.fetch_sub(value, order).wrapping_sub(value)
    }

    fn and_fetch(&self, value: T, order: Ordering) -> T {
        self.fetch_and(value, order) & value
    }

    fn or_fetch(&self, value: T, order: Ordering) -> T {
        self.fetch_or(value, order) | value
    }

    fn xor_fetch(&self, value: T, order: Ordering) -> T {
        self.fetch_xor(value, order) ^ value
    }
}

/// Operations every `AtomicFlag` strategy provides.
pub trait FlagOps {
    /// Sets the flag and returns whether it was already set.
    fn test_and_set(&self, order: Ordering) -> bool;
    fn clear(&self, order: Ordering);
    fn is_set(&self, order: Ordering) -> bool;
}

/// Compound assignment through exclusive access, shared by both strategies.
macro_rules! impl_compound_assign {
    ($value:ident) => {
        impl<T: $crate::atomic::AtomicInteger> core::ops::AddAssign<T> for $value<T> {
            fn add_assign(&mut self, rhs: T) {
                let slot = $crate::atomic::AtomicOps::get_mut(self);
                *slot = slot.wrapping_add(rhs);
            }
        }

        impl<T: $crate::atomic::AtomicInteger> core::ops::SubAssign<T> for $value<T> {
            fn sub_assign(&mut self, rhs: T) {
                let slot = $crate::atomic::AtomicOps::get_mut(self);
                *slot = slot.wrapping_sub(rhs);
            }
        }

        impl<T: $crate::atomic::AtomicInteger> core::ops::BitAndAssign<T> for $value<T> {
            fn bitand_assign(&mut self, rhs: T) {
                let slot = $crate::atomic::AtomicOps::get_mut(self);
                *slot = *slot & rhs;
            }
        }

        impl<T: $crate::atomic::AtomicInteger> core::ops::BitOrAssign<T> for $value<T> {
            fn bitor_assign(&mut self, rhs: T) {
                let slot = $crate::atomic::AtomicOps::get_mut(self);
                *slot = *slot | rhs;
            }
        }

        impl<T: $crate::atomic::AtomicInteger> core::ops::BitXorAssign<T> for $value<T> {
            fn bitxor_assign(&mut self, rhs: T) {
                let slot = $crate::atomic::AtomicOps::get_mut(self);
                *slot = *slot ^ rhs;
            }
        }
    };
}

pub(crate) use impl_compound_assign;

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<A: AtomicOps<u32>>() {
        let value = A::new(5);
        assert_eq!(value.post_increment(Ordering::Relaxed), 5);
        assert_eq!(value.increment(Ordering::Relaxed), 7);
        assert_eq!(value.post_decrement(Ordering::Relaxed), 7);
        assert_eq!(value.decrement(Ordering::Relaxed), 5);
        assert_eq!(value.add_fetch(10, Ordering::Relaxed), 15);
        assert_eq!(value.sub_fetch(3, Ordering::Relaxed), 12);
        assert_eq!(value.and_fetch(0b1010, Ordering::Relaxed), 0b1000);
        assert_eq!(value.or_fetch(0b0001, Ordering::Relaxed), 0b1001);
        assert_eq!(value.xor_fetch(0b1111, Ordering::Relaxed), 0b0110);
        assert_eq!(value.exchange(40, Ordering::AcqRel), 0b0110);
        assert_eq!(value.compare_exchange(41, 1, Ordering::SeqCst), Err(40));
        assert_eq!(value.compare_exchange(40, 1, Ordering::SeqCst), Ok(40));
        assert_eq!(value.load(Ordering::SeqCst), 1);
        assert!(value.is_lock_free());
    }

    #[test]
    fn both_strategies_share_derived_semantics() {
        exercise::<lockfree::AtomicValue<u32>>();
        exercise::<trivial::AtomicValue<u32>>();
    }

    #[test]
    fn increment_wraps_like_hardware() {
        let lf = lockfree::AtomicValue::new(u8::MAX);
        assert_eq!(lf.increment(Ordering::Relaxed), 0);
        let tv = trivial::AtomicValue::new(u8::MAX);
        assert_eq!(tv.increment(Ordering::Relaxed), 0);
        let signed = lockfree::AtomicValue::new(i16::MIN);
        assert_eq!(signed.decrement(Ordering::Relaxed), i16::MAX);
    }

    #[test]
    fn strategy_name_matches_feature() {
        if cfg!(feature = "single-threaded") {
            assert_eq!(STRATEGY, "trivial");
        } else {
            assert_eq!(STRATEGY, "lockfree");
        }
    }
}
