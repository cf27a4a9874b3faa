//! Arena configuration parameters.

use shoal_core::MAX_BYTE_OFFSET;

use crate::error::ArenaError;

/// Size of the in-region allocator state block, in bytes.
pub const STATE_BYTES: u32 = 8 * 4;

/// Size of a block header (`size`, `next`), in bytes.
pub const BLOCK_HEADER_BYTES: u32 = 2 * 4;

/// Configuration for one block allocator.
///
/// Validated at construction; everything but `size` and `start` is
/// written into the region's state block, so views that later attach to
/// the same region pick the values up from shared memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Region size in bytes. Must be a multiple of 4 and at most
    /// [`MAX_BYTE_OFFSET`].
    pub size: u32,
    /// Byte address of the state block. Must be a multiple of 4.
    pub start: u32,
    /// Exclusive end of the managed range. `None` = end of the region.
    pub end: Option<u32>,
    /// Block alignment in bytes. Power of two, at least 8.
    pub align: u32,
    /// Merge address-contiguous free blocks on free.
    ///
    /// Must be `false` when more than one thread uses the arena: a merge
    /// rewrites headers inside blocks another thread may still be reading.
    pub compact: bool,
    /// Carve the excess of a reused free block into a new free block.
    ///
    /// Same restriction as [`compact`](Self::compact).
    pub split: bool,
    /// Minimum excess, in bytes, before a block is split. Must exceed 8.
    pub min_split: u32,
}

impl ArenaConfig {
    /// Default region size: 4 KiB.
    pub const DEFAULT_SIZE: u32 = 0x1000;

    /// Default block alignment.
    pub const DEFAULT_ALIGN: u32 = 8;

    /// Default split threshold.
    pub const DEFAULT_MIN_SPLIT: u32 = 16;

    /// Single-threaded config of `size` bytes with compaction and splitting on.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            start: 0,
            end: None,
            align: Self::DEFAULT_ALIGN,
            compact: true,
            split: true,
            min_split: Self::DEFAULT_MIN_SPLIT,
        }
    }

    /// Config for an arena used by several threads at once: compaction
    /// and splitting off.
    pub fn shared(size: u32) -> Self {
        Self {
            compact: false,
            split: false,
            ..Self::new(size)
        }
    }

    /// End of the managed range after clamping to the region size.
    pub fn resolved_end(&self) -> u32 {
        self.end.map_or(self.size, |end| end.min(self.size))
    }

    /// First block address for this config's start and alignment.
    pub fn initial_top(&self) -> u32 {
        initial_top(self.start, self.align)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.align < 8 || !self.align.is_power_of_two() {
            return Err(ArenaError::InvalidAlignment { align: self.align });
        }
        if self.min_split <= BLOCK_HEADER_BYTES {
            return Err(ArenaError::InvalidMinSplit {
                min_split: self.min_split,
            });
        }
        if self.start % 4 != 0 {
            return Err(ArenaError::MisalignedStart { start: self.start });
        }
        if self.size % 4 != 0 {
            return Err(ArenaError::SizeNotWordMultiple { size: self.size });
        }
        if self.size > MAX_BYTE_OFFSET {
            return Err(ArenaError::SizeExceedsAddressSpace {
                size: self.size,
                max: MAX_BYTE_OFFSET,
            });
        }
        let top = self.initial_top();
        let end = self.resolved_end();
        if top >= end {
            return Err(ArenaError::InsufficientRange { top, end });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

/// Round `addr` up to a multiple of `align` (a power of two).
#[inline]
pub(crate) fn align_up(addr: u64, align: u32) -> u64 {
    let mask = u64::from(align) - 1;
    (addr + mask) & !mask
}

/// First block address: the first header placed after the state block so
/// that the data behind it is aligned.
pub(crate) fn initial_top(start: u32, align: u32) -> u32 {
    let data = align_up(
        u64::from(start) + u64::from(STATE_BYTES) + u64::from(BLOCK_HEADER_BYTES),
        align,
    );
    (data - u64::from(BLOCK_HEADER_BYTES)) as u32
}
