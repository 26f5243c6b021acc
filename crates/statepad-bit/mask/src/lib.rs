mod bitmask;
mod bits;

pub use bitmask::Bitmask;
pub use bits::{read_bits, write_bits, BitRangeError, MAX_BIT_WIDTH};

/// A value that occupies a single bit of a [`Bitmask`].
pub trait Bitable {
    fn bit(&self) -> u64;
    fn index(&self) -> u32;
}
