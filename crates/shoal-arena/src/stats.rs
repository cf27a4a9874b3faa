//! Allocator occupancy snapshots.

/// Count and total byte size of one block list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockListStats {
    /// Number of blocks in the list.
    pub count: u32,
    /// Sum of block sizes, headers included.
    pub size: u32,
}

/// Point-in-time view of an arena's bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Blocks waiting on the free list.
    pub free: BlockListStats,
    /// Blocks currently handed out.
    pub used: BlockListStats,
    /// Current bump pointer.
    pub top: u32,
    /// Bytes still obtainable: untouched space above `top` plus free blocks.
    pub available: u32,
    /// Byte length of the whole region.
    pub total: u32,
}

impl ArenaStats {
    /// Bytes not available for allocation (state block and headers included).
    pub fn used_bytes(&self) -> u32 {
        self.total - self.available
    }
}
