use std::fmt;
use std::marker::PhantomData;

use crate::Bitable;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bitmask<T: Bitable>(pub u64, PhantomData<T>);

impl<T: Bitable> Bitmask<T> {
    /// Create a new bitmask from a slice of values.
    pub fn new(values: &[T]) -> Self {
        let bits = values.iter().fold(0, |acc, v| acc | v.bit());
        Self(bits, PhantomData)
    }

    /// Create an empty bitmask.
    pub const fn empty() -> Self {
        Self(0, PhantomData)
    }

    /// Create a new bitmask from a raw value.
    pub const fn from_value(value: u64) -> Self {
        Self(value, PhantomData)
    }

    /// Raw bits of the mask.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Check if the bitmask contains a specific value.
    #[inline]
    pub fn contains(&self, bit: T) -> bool {
        (self.0 & bit.bit()) != 0
    }

    /// Insert a value to the bitmask.
    #[inline]
    pub fn insert(&mut self, bit: T) {
        self.0 |= bit.bit();
    }

    /// Builder-style insert.
    #[inline]
    #[must_use]
    pub fn with(mut self, bit: T) -> Self {
        self.insert(bit);
        self
    }

    /// Remove a value from the bitmask.
    #[inline]
    pub fn remove(&mut self, bit: T) {
        self.0 &= !bit.bit();
    }

    /// Check if the bitmask is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if every bit of this mask is also set in `other`.
    #[inline]
    pub fn is_subset(&self, other: &Bitmask<T>) -> bool {
        self.0 & other.0 == self.0
    }

    /// Check if every bit of `other` is also set in this mask.
    #[inline]
    pub fn is_superset(&self, other: &Bitmask<T>) -> bool {
        other.is_subset(self)
    }

    /// Check if the two masks share at least one bit.
    #[inline]
    pub fn intersects(&self, other: &Bitmask<T>) -> bool {
        self.0 & other.0 != 0
    }

    /// Bits present in either mask.
    #[inline]
    #[must_use]
    pub fn union(&self, other: &Bitmask<T>) -> Self {
        Self(self.0 | other.0, PhantomData)
    }

    /// Count the number of bits set in the bitmask.
    #[inline]
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

impl<T: Bitable> Default for Bitmask<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Bitable> fmt::Debug for Bitmask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmask({:#b})", self.0)
    }
}

impl<T: Bitable> FromIterator<T> for Bitmask<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let bits = iter.into_iter().fold(0, |acc, v| acc | v.bit());
        Self(bits, PhantomData)
    }
}

#[cfg(test)]
mod tests {
    use super::Bitmask;
    use crate::Bitable;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Flag {
        Gamepad = 0,
        Joystick = 1,
        DpadAxes = 2,
        DpadButtons = 3,
    }

    impl Bitable for Flag {
        fn bit(&self) -> u64 {
            1u64 << (*self as u64)
        }

        fn index(&self) -> u32 {
            *self as u32
        }
    }

    #[test]
    fn empty_creates_no_bits_set() {
        let mask = Bitmask::<Flag>::empty();
        assert!(!mask.contains(Flag::Gamepad));
        assert!(!mask.contains(Flag::DpadButtons));
        assert_eq!(mask, Bitmask::default());
    }

    #[test]
    fn new_sets_bits_from_slice() {
        let mask = Bitmask::new(&[Flag::Gamepad, Flag::DpadAxes]);
        assert!(mask.contains(Flag::Gamepad));
        assert!(!mask.contains(Flag::Joystick));
        assert!(mask.contains(Flag::DpadAxes));
        assert_eq!(mask.count(), 2);
    }

    #[test]
    fn collect_and_with_agree() {
        let collected: Bitmask<Flag> =
            [Flag::Joystick, Flag::DpadButtons].into_iter().collect();
        let built = Bitmask::empty().with(Flag::Joystick).with(Flag::DpadButtons);
        assert_eq!(collected, built);
    }

    #[test]
    fn insert_and_remove_toggle_bits() {
        let mut mask = Bitmask::empty();
        mask.insert(Flag::Gamepad);
        mask.insert(Flag::Joystick);
        mask.remove(Flag::Gamepad);
        assert!(!mask.contains(Flag::Gamepad));
        assert!(mask.contains(Flag::Joystick));
        mask.remove(Flag::Joystick);
        assert!(mask.is_empty());
    }

    #[test]
    fn subset_and_intersection() {
        let empty = Bitmask::<Flag>::empty();
        let pad = Bitmask::new(&[Flag::Gamepad]);
        let pad_axes = Bitmask::new(&[Flag::Gamepad, Flag::DpadAxes]);
        let stick = Bitmask::new(&[Flag::Joystick]);

        assert!(empty.is_subset(&pad));
        assert!(pad.is_subset(&pad_axes));
        assert!(pad_axes.is_superset(&pad));
        assert!(!pad_axes.is_subset(&pad));

        assert!(pad.intersects(&pad_axes));
        assert!(!pad.intersects(&stick));
        assert!(!empty.intersects(&pad));
        assert_eq!(pad.union(&stick).count(), 2);
    }
}
