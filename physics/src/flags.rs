use num_traits::{One, PrimInt};

/// Trait implemented by flag enums stored in a [`BitmaskFlags`].
///
/// The enum's discriminant (via `#[repr(u8)]`) is the bit index.
/// The backing integer type is chosen via the associated `Storage`.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Plain bitmask container, generic over its primitive storage.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, tag: U) {
        self.bits = self.bits | tag.mask();
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, tag: U) {
        self.bits = self.bits & !tag.mask();
    }

    /// Add or remove `tag` depending on `on`.
    pub fn set<U: FlagBitmask<Storage = T>>(&mut self, tag: U, on: bool) {
        if on {
            self.add(tag);
        } else {
            self.remove(tag);
        }
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, tag: U) -> bool {
        (self.bits & tag.mask()) != T::zero()
    }
}

/// Declare a bitmask-backed enum and implement `FlagBitmask` for it.
#[macro_export]
macro_rules! define_bitmask_flags {
    ($(#[$meta:meta])* $name:ident, $storage:ty, { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::flags::FlagBitmask for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

define_bitmask_flags!(
    /// Rotation axis a rigidbody is not allowed to turn around.
    RotationLock, u8, {
        X,
        Y,
        Z,
    }
);

/// Per-axis rotation locks of a rigidbody.
pub type RotationLocks = BitmaskFlags<u8>;

impl RotationLocks {
    pub fn from_axes(x: bool, y: bool, z: bool) -> Self {
        let mut locks = Self::default();
        locks.set(RotationLock::X, x);
        locks.set(RotationLock::Y, y);
        locks.set(RotationLock::Z, z);
        locks
    }

    /// Which rotation axes remain free, in `(x, y, z)` order.
    pub fn enabled_rotations(&self) -> (bool, bool, bool) {
        (
            !self.has(RotationLock::X),
            !self.has(RotationLock::Y),
            !self.has(RotationLock::Z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_individual_axes() {
        let mut locks = RotationLocks::default();
        assert_eq!(locks.bits, 0);

        locks.set(RotationLock::Y, true);
        assert!(locks.has(RotationLock::Y));
        assert!(!locks.has(RotationLock::X));
        assert_eq!(locks.bits, 0b010);

        locks.set(RotationLock::Y, false);
        assert_eq!(locks, RotationLocks::default());
    }

    #[test]
    fn enabled_rotations_is_inverse_of_locks() {
        let locks = RotationLocks::from_axes(true, false, true);
        assert_eq!(locks.enabled_rotations(), (false, true, false));
    }
}
