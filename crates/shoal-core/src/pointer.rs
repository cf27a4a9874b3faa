//! Packed 32-bit pointers into a multi-arena heap.
//!
//! Layout: bits `[0, 12)` hold the arena index, bits `[12, 32)` hold the
//! byte offset inside that arena. The raw value `0` is the null pointer;
//! since no allocation ever starts at offset 0 (the arena state block
//! lives there), no live allocation encodes to 0.
//!
//! Inputs are not validated in release builds: an arena index
//! `>= MAX_ARENAS` or an offset `>= MAX_BYTE_OFFSET` wraps silently.
//! Debug builds assert instead.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Bits reserved for the arena index.
pub const POSITION_BITS: u32 = 12;

/// Bits reserved for the byte offset.
pub const BYTE_OFFSET_BITS: u32 = 32 - POSITION_BITS;

/// Maximum number of arenas a heap can address.
pub const MAX_ARENAS: u32 = 1 << POSITION_BITS;

/// Exclusive upper bound of a byte offset (and so of an arena's size).
pub const MAX_BYTE_OFFSET: u32 = 1 << BYTE_OFFSET_BITS;

const POSITION_MASK: u32 = MAX_ARENAS - 1;

/// Pack an arena index and byte offset into one word.
#[inline]
pub fn encode(arena_index: u32, byte_offset: u32) -> u32 {
    debug_assert!(
        arena_index < MAX_ARENAS,
        "arena index {arena_index} exceeds {MAX_ARENAS}"
    );
    debug_assert!(
        byte_offset < MAX_BYTE_OFFSET,
        "byte offset {byte_offset} exceeds {MAX_BYTE_OFFSET}"
    );
    (arena_index & POSITION_MASK) | (byte_offset << POSITION_BITS)
}

/// Split a packed word into `(arena_index, byte_offset)`.
#[inline]
pub const fn decode(raw: u32) -> (u32, u32) {
    (raw & POSITION_MASK, raw >> POSITION_BITS)
}

/// A packed `(arena index, byte offset)` address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer(u32);

impl Pointer {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Pack `arena_index` and `byte_offset`.
    #[inline]
    pub fn new(arena_index: u32, byte_offset: u32) -> Self {
        Self(encode(arena_index, byte_offset))
    }

    /// Reinterpret a raw packed word.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw packed word.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index of the arena this pointer refers to.
    #[inline]
    pub const fn arena_index(self) -> u32 {
        decode(self.0).0
    }

    /// Byte offset inside the arena.
    #[inline]
    pub const fn byte_offset(self) -> u32 {
        decode(self.0).1
    }

    /// Whether this is the null pointer.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}:{:#x}", self.arena_index(), self.byte_offset())
        }
    }
}

impl From<u32> for Pointer {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Atomically load the pointer stored at `words[index]`.
#[inline]
pub fn load_pointer(words: &[AtomicU32], index: usize) -> Pointer {
    Pointer(words[index].load(Ordering::Acquire))
}

/// Atomically store `pointer` at `words[index]`.
#[inline]
pub fn store_pointer(words: &[AtomicU32], index: usize, pointer: Pointer) {
    words[index].store(pointer.0, Ordering::Release);
}

/// Replace the pointer at `words[index]` with `new` if it still equals
/// `current`. Returns whether the swap happened.
#[inline]
pub fn replace_pointer(words: &[AtomicU32], index: usize, new: Pointer, current: Pointer) -> bool {
    words[index]
        .compare_exchange(current.0, new.0, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}
