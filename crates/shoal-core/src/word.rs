//! 32-bit element kinds that can live in a shared word.

use std::fmt::Debug;

/// A value stored as one 32-bit shared word.
///
/// Every kind round-trips through its `u32` bit pattern, so the same
/// backing word can be read as any kind. `TAG` is the stable identifier
/// written into shared headers that record which kind a structure holds.
pub trait Word: Copy + PartialEq + Debug + Default + Send + Sync + 'static {
    /// Stable on-memory identifier of this kind.
    const TAG: u16;

    /// Reinterpret a raw word.
    fn from_bits(bits: u32) -> Self;

    /// The raw word for this value.
    fn to_bits(self) -> u32;
}

impl Word for u32 {
    const TAG: u16 = 0;

    #[inline]
    fn from_bits(bits: u32) -> Self {
        bits
    }

    #[inline]
    fn to_bits(self) -> u32 {
        self
    }
}

impl Word for i32 {
    const TAG: u16 = 1;

    #[inline]
    fn from_bits(bits: u32) -> Self {
        bits as i32
    }

    #[inline]
    fn to_bits(self) -> u32 {
        self as u32
    }
}

impl Word for f32 {
    const TAG: u16 = 2;

    #[inline]
    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }

    #[inline]
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }
}
