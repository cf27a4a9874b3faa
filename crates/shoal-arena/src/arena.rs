//! Block allocator over one shared region.
//!
//! All allocator state lives in the region itself, so any thread holding
//! the region's `Arc` can attach its own [`Arena`] view and allocate:
//!
//! ```text
//! start ─► ┌──────── state block (8 words) ────────┐
//!          │ free │ used │ top │ end │ align │ flags │ min_split │ lock │
//!          └───────────────────────────────────────┘
//! top₀  ─► ┌ size │ next ┐ data …   ┌ size │ next ┐ data …   … ◄─ top … end
//! ```
//!
//! Every block starts with a two-word header (`size` including the
//! header, `next` link of whichever list owns the block). The free list is
//! kept sorted by address; the used list is LIFO. Addresses handed out are
//! data addresses (`block + 8`); `0` means no allocation.
//!
//! Every mutation runs under the spinlock in the state block.
//! Deallocation scans the used list linearly to find the block.

use std::fmt;
use std::sync::Arc;

use shoal_core::lock::SpinLockGuard;
use shoal_core::region::{word_index, SharedRegion, WORD_BYTES};
use shoal_core::SpinLock;

use crate::config::{align_up, initial_top, ArenaConfig, BLOCK_HEADER_BYTES, STATE_BYTES};
use crate::error::ArenaError;
use crate::stats::{ArenaStats, BlockListStats};

const STATE_FREE: usize = 0;
const STATE_USED: usize = 1;
const STATE_TOP: usize = 2;
const STATE_END: usize = 3;
const STATE_ALIGN: usize = 4;
const STATE_FLAGS: usize = 5;
const STATE_MIN_SPLIT: usize = 6;
const STATE_LOCK: usize = 7;

const FLAG_COMPACT: u32 = 1 << 0;
const FLAG_SPLIT: u32 = 1 << 1;

const BLOCK_SIZE: usize = 0;
const BLOCK_NEXT: usize = 1;

/// Data address for a block address.
#[inline]
fn data_address(block: u32) -> u32 {
    if block == 0 {
        0
    } else {
        block + BLOCK_HEADER_BYTES
    }
}

/// Block address for a data address.
#[inline]
fn block_address(addr: u32) -> u32 {
    addr.saturating_sub(BLOCK_HEADER_BYTES)
}

/// A view of the block allocator inside one shared region.
///
/// Cheap to clone: a view is the region `Arc` plus the state anchor.
#[derive(Clone)]
pub struct Arena {
    region: Arc<SharedRegion>,
    start: u32,
    state: usize,
}

impl Arena {
    /// Allocate a fresh region and initialise an allocator in it.
    pub fn new(config: &ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let arena = Self {
            region: SharedRegion::new_shared(config.size),
            start: config.start,
            state: word_index(config.start),
        };
        let mut flags = 0;
        if config.compact {
            flags |= FLAG_COMPACT;
        }
        if config.split {
            flags |= FLAG_SPLIT;
        }
        arena.set_state(STATE_ALIGN, config.align);
        arena.set_state(STATE_FLAGS, flags);
        arena.set_state(STATE_MIN_SPLIT, config.min_split);
        arena.set_state(STATE_END, config.resolved_end());
        arena.set_state(STATE_TOP, config.initial_top());
        arena.set_state(STATE_FREE, 0);
        arena.set_state(STATE_USED, 0);
        arena.set_state(STATE_LOCK, 0);
        Ok(arena)
    }

    /// Attach to a region another view already initialised.
    ///
    /// No state is written; the allocator continues from whatever the
    /// region's state block holds.
    pub fn attach(region: Arc<SharedRegion>, start: u32) -> Result<Self, ArenaError> {
        if start % WORD_BYTES != 0 {
            return Err(ArenaError::MisalignedStart { start });
        }
        if u64::from(start) + u64::from(STATE_BYTES) > u64::from(region.byte_len()) {
            return Err(ArenaError::Uninitialized { start });
        }
        let arena = Self {
            region,
            start,
            state: word_index(start),
        };
        let align = arena.align();
        if align < 8 || !align.is_power_of_two() || arena.end() > arena.region.byte_len() {
            return Err(ArenaError::Uninitialized { start });
        }
        Ok(arena)
    }

    /// The shared region backing this arena.
    pub fn region(&self) -> &Arc<SharedRegion> {
        &self.region
    }

    /// Byte address of the state block.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Exclusive end of the managed range.
    pub fn end(&self) -> u32 {
        self.state(STATE_END)
    }

    /// Block alignment in bytes.
    pub fn align(&self) -> u32 {
        self.state(STATE_ALIGN)
    }

    /// Current bump pointer.
    pub fn top(&self) -> u32 {
        self.state(STATE_TOP)
    }

    /// Whether free blocks are merged on free.
    pub fn compacts(&self) -> bool {
        self.state(STATE_FLAGS) & FLAG_COMPACT != 0
    }

    /// Whether reused blocks are split.
    pub fn splits(&self) -> bool {
        self.state(STATE_FLAGS) & FLAG_SPLIT != 0
    }

    /// Minimum excess before a block is split.
    pub fn min_split(&self) -> u32 {
        self.state(STATE_MIN_SPLIT)
    }

    /// Data address the very first allocation of a fresh arena receives.
    pub fn first_data_address(&self) -> u32 {
        data_address(initial_top(self.start, self.align()))
    }

    /// Block size (header included) that a request of `bytes` occupies.
    ///
    /// `None` if no block of that size fits in this arena at all.
    pub fn padded_size(&self, bytes: u32) -> Option<u32> {
        let padded = align_up(u64::from(bytes) + u64::from(BLOCK_HEADER_BYTES), self.align());
        let room = u64::from(self.end()) - u64::from(initial_top(self.start, self.align()));
        (padded <= room).then_some(padded as u32)
    }

    // ── public allocation API ────────────────────────────────────

    /// Allocate `bytes`; returns the data address or `0` if there is no room.
    pub fn malloc(&self, bytes: u32) -> u32 {
        let _guard = self.lock();
        self.malloc_locked(bytes)
    }

    /// Allocate `bytes` and zero them.
    pub fn calloc(&self, bytes: u32) -> u32 {
        let addr = self.malloc(bytes);
        if addr != 0 {
            self.region
                .zero_words(word_index(addr), bytes.div_ceil(WORD_BYTES) as usize);
        }
        addr
    }

    /// Return the allocation at data address `addr` to the free list.
    ///
    /// Returns `false` if `addr` is not a live allocation of this arena.
    pub fn free(&self, addr: u32) -> bool {
        let _guard = self.lock();
        self.free_locked(addr)
    }

    /// Resize the allocation at `addr` to `bytes`.
    ///
    /// Shrinks in place, grows in place when the block is the top-most
    /// allocation, and otherwise moves the contents to a new block and
    /// frees the old one. Returns the (possibly new) data address, or `0`
    /// when `addr` is unknown or no block of the new size is available; on
    /// failure the original allocation is left untouched.
    pub fn realloc(&self, addr: u32, bytes: u32) -> u32 {
        if bytes == 0 {
            return 0;
        }
        let _guard = self.lock();
        let block = block_address(addr);
        if addr == 0 || !self.is_used_block(block) {
            return 0;
        }
        let Some(padded) = self.padded_size(bytes) else {
            return 0;
        };
        let size = self.block_size(block);
        let is_top = block + size >= self.top();

        if padded <= size {
            let excess = size - padded;
            if self.splits() && excess >= self.min_split() {
                self.split_block(block, padded, excess);
            } else if is_top {
                self.set_block_size(block, padded);
                self.set_state(STATE_TOP, block + padded);
            }
            return addr;
        }

        if is_top && block + padded <= self.end() {
            self.set_block_size(block, padded);
            self.set_state(STATE_TOP, block + padded);
            return addr;
        }

        let new_addr = self.malloc_locked(bytes);
        if new_addr == 0 {
            return 0;
        }
        let old_words = ((size - BLOCK_HEADER_BYTES) / WORD_BYTES) as usize;
        let new_words = bytes.div_ceil(WORD_BYTES) as usize;
        self.region.copy_words(
            word_index(addr),
            word_index(new_addr),
            old_words.min(new_words),
        );
        self.free_locked(addr);
        new_addr
    }

    /// Size in bytes (header included) of the live block at `addr`.
    pub fn bytes_for(&self, addr: u32) -> Option<u32> {
        let _guard = self.lock();
        let block = block_address(addr);
        (addr != 0 && self.is_used_block(block)).then(|| self.block_size(block))
    }

    /// Usable length in words of the live allocation at `addr`.
    pub fn data_len(&self, addr: u32) -> Option<u32> {
        self.bytes_for(addr)
            .map(|bytes| (bytes - BLOCK_HEADER_BYTES) / WORD_BYTES)
    }

    /// Drop every allocation and reset the bump pointer.
    pub fn free_all(&self) {
        let _guard = self.lock();
        self.set_state(STATE_FREE, 0);
        self.set_state(STATE_USED, 0);
        self.set_state(STATE_TOP, initial_top(self.start, self.align()));
    }

    /// Snapshot of the free/used lists and remaining space.
    pub fn stats(&self) -> ArenaStats {
        let _guard = self.lock();
        let free = self.list_stats(self.state(STATE_FREE));
        let used = self.list_stats(self.state(STATE_USED));
        let top = self.top();
        ArenaStats {
            free,
            used,
            top,
            available: self.end() - top + free.size,
            total: self.region.byte_len(),
        }
    }

    // ── locked internals ─────────────────────────────────────────

    fn lock(&self) -> SpinLockGuard<'_> {
        SpinLock::new(&self.region, self.state + STATE_LOCK).guard()
    }

    fn malloc_locked(&self, bytes: u32) -> u32 {
        if bytes == 0 {
            return 0;
        }
        let Some(padded) = self.padded_size(bytes) else {
            tracing::trace!(bytes, "request larger than arena");
            return 0;
        };
        let top = self.top();
        let mut block = self.state(STATE_FREE);
        let mut prev = 0;
        while block != 0 {
            let size = self.block_size(block);
            let is_top = block + size >= top;
            if is_top || size >= padded {
                return self.take_free_block(block, prev, size, padded, is_top);
            }
            prev = block;
            block = self.block_next(block);
        }

        let block = top;
        if u64::from(block) + u64::from(padded) > u64::from(self.end()) {
            tracing::trace!(bytes, top, "arena exhausted");
            return 0;
        }
        self.init_block(block, padded, self.state(STATE_USED));
        self.set_state(STATE_USED, block);
        self.set_state(STATE_TOP, block + padded);
        data_address(block)
    }

    /// Move a free block to the used list, resizing it when it borders
    /// `top` and splitting off the excess otherwise.
    fn take_free_block(&self, block: u32, prev: u32, size: u32, padded: u32, is_top: bool) -> u32 {
        if is_top && u64::from(block) + u64::from(padded) > u64::from(self.end()) {
            return 0;
        }
        if prev != 0 {
            self.unlink(prev, block);
        } else {
            self.set_state(STATE_FREE, self.block_next(block));
        }
        self.set_block_next(block, self.state(STATE_USED));
        self.set_state(STATE_USED, block);
        if is_top {
            self.set_block_size(block, padded);
            self.set_state(STATE_TOP, block + padded);
        } else if self.splits() {
            let excess = size - padded;
            if excess >= self.min_split() {
                self.split_block(block, padded, excess);
            }
        }
        data_address(block)
    }

    fn free_locked(&self, addr: u32) -> bool {
        if addr == 0 {
            return false;
        }
        let target = block_address(addr);
        let mut block = self.state(STATE_USED);
        let mut prev = 0;
        while block != 0 {
            if block == target {
                if prev != 0 {
                    self.unlink(prev, block);
                } else {
                    self.set_state(STATE_USED, self.block_next(block));
                }
                self.insert_free(block);
                if self.compacts() {
                    self.compact();
                }
                return true;
            }
            prev = block;
            block = self.block_next(block);
        }
        false
    }

    fn is_used_block(&self, target: u32) -> bool {
        let mut block = self.state(STATE_USED);
        while block != 0 {
            if block == target {
                return true;
            }
            block = self.block_next(block);
        }
        false
    }

    /// Shrink `block` to `size` and push the `excess` tail onto the free list.
    fn split_block(&self, block: u32, size: u32, excess: u32) {
        self.set_block_size(block, size);
        self.insert_free(self.init_block(block + size, excess, 0));
        if self.compacts() {
            self.compact();
        }
    }

    /// Insert into the free list, keeping it sorted by address.
    fn insert_free(&self, block: u32) {
        let mut ptr = self.state(STATE_FREE);
        let mut prev = 0;
        while ptr != 0 && block > ptr {
            prev = ptr;
            ptr = self.block_next(ptr);
        }
        if prev != 0 {
            self.set_block_next(prev, block);
        } else {
            self.set_state(STATE_FREE, block);
        }
        self.set_block_next(block, ptr);
    }

    /// Fuse runs of address-contiguous free blocks and hand a free run
    /// that reaches `top` back to the bump region.
    fn compact(&self) {
        let mut block = self.state(STATE_FREE);
        let mut prev = 0;
        while block != 0 {
            let mut scan_prev = block;
            let mut scan = self.block_next(block);
            while scan != 0 && scan_prev + self.block_size(scan_prev) == scan {
                scan_prev = scan;
                scan = self.block_next(scan);
            }
            if scan_prev != block {
                let merged = scan_prev - block + self.block_size(scan_prev);
                self.set_block_size(block, merged);
                let next = self.block_next(scan_prev);
                let mut absorbed = self.block_next(block);
                while absorbed != 0 && absorbed != next {
                    let following = self.block_next(absorbed);
                    self.set_block_next(absorbed, 0);
                    absorbed = following;
                }
                self.set_block_next(block, next);
            }
            if block + self.block_size(block) >= self.top() {
                self.set_state(STATE_TOP, block);
                if prev != 0 {
                    self.unlink(prev, block);
                } else {
                    self.set_state(STATE_FREE, self.block_next(block));
                }
                // The list is address-sorted, so nothing lies past top.
                return;
            }
            prev = block;
            block = self.block_next(block);
        }
    }

    fn list_stats(&self, mut block: u32) -> BlockListStats {
        let mut stats = BlockListStats::default();
        let end = self.end();
        while block != 0 {
            if block >= end {
                tracing::error!(block, end, "block list runs past the end of the arena");
                break;
            }
            stats.count += 1;
            stats.size += self.block_size(block);
            block = self.block_next(block);
        }
        stats
    }

    // ── raw word access ──────────────────────────────────────────

    #[inline]
    fn state(&self, field: usize) -> u32 {
        self.region.load(self.state + field)
    }

    #[inline]
    fn set_state(&self, field: usize, value: u32) {
        self.region.store(self.state + field, value);
    }

    #[inline]
    fn block_size(&self, block: u32) -> u32 {
        self.region.load(word_index(block) + BLOCK_SIZE)
    }

    #[inline]
    fn set_block_size(&self, block: u32, size: u32) {
        self.region.store(word_index(block) + BLOCK_SIZE, size);
    }

    #[inline]
    fn block_next(&self, block: u32) -> u32 {
        self.region.load(word_index(block) + BLOCK_NEXT)
    }

    #[inline]
    fn set_block_next(&self, block: u32, next: u32) {
        self.region.store(word_index(block) + BLOCK_NEXT, next);
    }

    fn init_block(&self, block: u32, size: u32, next: u32) -> u32 {
        self.set_block_size(block, size);
        self.set_block_next(block, next);
        block
    }

    fn unlink(&self, prev: u32, block: u32) {
        self.set_block_next(prev, self.block_next(block));
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("start", &self.start)
            .field("top", &self.top())
            .field("end", &self.end())
            .field("compact", &self.compacts())
            .field("split", &self.splits())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(size: u32) -> Arena {
        Arena::new(&ArenaConfig::new(size)).unwrap()
    }

    #[test]
    fn first_allocation_lands_after_state_block() {
        let a = arena(256);
        assert_eq!(a.first_data_address(), 40);
        assert_eq!(a.malloc(4), 40);
        assert_eq!(a.top(), 48);
    }

    #[test]
    fn sequential_allocations_bump_top() {
        let a = arena(256);
        let x = a.malloc(40);
        let y = a.malloc(40);
        assert_eq!(y - x, 48);
        assert_eq!(a.top(), 32 + 96);
    }

    #[test]
    fn zero_sized_request_is_null() {
        let a = arena(256);
        assert_eq!(a.malloc(0), 0);
        assert_eq!(a.top(), 32);
    }

    #[test]
    fn exhaustion_returns_null() {
        let a = arena(128);
        assert_ne!(a.malloc(80), 0);
        assert_eq!(a.malloc(8), 0);
        assert_eq!(a.malloc(10_000), 0);
    }

    #[test]
    fn free_unknown_address_is_rejected() {
        let a = arena(256);
        let x = a.malloc(16);
        assert!(!a.free(x + 8));
        assert!(!a.free(0));
        assert!(a.free(x));
        assert!(!a.free(x));
    }

    #[test]
    fn freeing_top_block_retracts_top() {
        let a = arena(256);
        let x = a.malloc(16);
        let y = a.malloc(16);
        let top = a.top();
        assert!(a.free(y));
        assert!(a.top() < top);
        assert!(a.free(x));
        assert_eq!(a.top(), 32);
        assert_eq!(a.stats().free.count, 0);
    }

    #[test]
    fn freed_block_is_reused() {
        let a = arena(512);
        let x = a.malloc(40);
        let _y = a.malloc(40);
        assert!(a.free(x));
        assert_eq!(a.malloc(40), x);
    }

    #[test]
    fn large_free_block_is_split() {
        let a = arena(512);
        let big = a.malloc(120);
        let _guard = a.malloc(8);
        assert!(a.free(big));
        let small = a.malloc(8);
        assert_eq!(small, big);
        let stats = a.stats();
        assert_eq!(stats.free.count, 1);
        assert_eq!(stats.free.size, 128 - 16);
    }

    #[test]
    fn without_split_whole_block_is_reused() {
        let config = ArenaConfig {
            split: false,
            ..ArenaConfig::new(512)
        };
        let a = Arena::new(&config).unwrap();
        let big = a.malloc(120);
        let _guard = a.malloc(8);
        assert!(a.free(big));
        assert_eq!(a.malloc(8), big);
        assert_eq!(a.bytes_for(big), Some(128));
        assert_eq!(a.stats().free.count, 0);
    }

    #[test]
    fn adjacent_free_blocks_are_merged() {
        let a = arena(512);
        let x = a.malloc(16);
        let y = a.malloc(16);
        let _z = a.malloc(16);
        assert!(a.free(x));
        assert!(a.free(y));
        let stats = a.stats();
        assert_eq!(stats.free.count, 1);
        assert_eq!(stats.free.size, 48);
    }

    #[test]
    fn without_compaction_free_blocks_stay_separate() {
        let a = Arena::new(&ArenaConfig::shared(512)).unwrap();
        let x = a.malloc(16);
        let y = a.malloc(16);
        let _z = a.malloc(16);
        assert!(a.free(x));
        assert!(a.free(y));
        assert_eq!(a.stats().free.count, 2);
    }

    #[test]
    fn free_list_stays_sorted() {
        let a = Arena::new(&ArenaConfig::shared(1024)).unwrap();
        let blocks: Vec<u32> = (0..6).map(|_| a.malloc(16)).collect();
        for &b in [blocks[4], blocks[0], blocks[2]].iter() {
            assert!(a.free(b));
        }
        // Reuse is first-fit in address order.
        assert_eq!(a.malloc(16), blocks[0]);
        assert_eq!(a.malloc(16), blocks[2]);
        assert_eq!(a.malloc(16), blocks[4]);
    }

    #[test]
    fn calloc_zeroes_reused_memory() {
        let a = arena(256);
        let x = a.malloc(16);
        let _keep = a.malloc(16);
        for i in 0..4 {
            a.region().store(word_index(x) + i, 0xdead_beef);
        }
        assert!(a.free(x));
        let y = a.calloc(16);
        assert_eq!(y, x);
        assert!((0..4).all(|i| a.region().load(word_index(y) + i) == 0));
    }

    #[test]
    fn data_len_reports_usable_words() {
        let a = arena(512);
        let x = a.malloc(40);
        let y = a.malloc(16);
        let z = a.malloc(32);
        assert_eq!(a.data_len(x), Some(10));
        assert_eq!(a.data_len(y), Some(4));
        assert_eq!(a.data_len(z), Some(8));
        assert!(a.free(y));
        assert_eq!(a.data_len(y), None);
    }

    #[test]
    fn realloc_shrinks_in_place() {
        let a = arena(512);
        let x = a.malloc(120);
        let _keep = a.malloc(8);
        assert_eq!(a.realloc(x, 16), x);
        assert_eq!(a.bytes_for(x), Some(24));
        assert_eq!(a.stats().free.count, 1);
    }

    #[test]
    fn realloc_grows_top_block_in_place() {
        let a = arena(512);
        let x = a.malloc(16);
        a.region().store(word_index(x), 77);
        assert_eq!(a.realloc(x, 64), x);
        assert_eq!(a.bytes_for(x), Some(72));
        assert_eq!(a.top(), word_aligned_end(x, 72));
        assert_eq!(a.region().load(word_index(x)), 77);
    }

    fn word_aligned_end(addr: u32, size: u32) -> u32 {
        addr - BLOCK_HEADER_BYTES + size
    }

    #[test]
    fn realloc_moves_and_copies() {
        let a = arena(512);
        let x = a.malloc(16);
        let _blocker = a.malloc(16);
        for i in 0..4 {
            a.region().store(word_index(x) + i, i as u32 + 1);
        }
        let y = a.realloc(x, 64);
        assert_ne!(y, 0);
        assert_ne!(y, x);
        assert_eq!(
            (0..4).map(|i| a.region().load(word_index(y) + i)).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(a.bytes_for(x), None);
    }

    #[test]
    fn realloc_failure_keeps_original() {
        let a = arena(128);
        let x = a.malloc(16);
        let _blocker = a.malloc(16);
        assert_eq!(a.realloc(x, 200), 0);
        assert_eq!(a.bytes_for(x), Some(24));
    }

    #[test]
    fn free_all_resets() {
        let a = arena(256);
        a.malloc(16);
        a.malloc(32);
        a.free_all();
        let stats = a.stats();
        assert_eq!(stats.used.count, 0);
        assert_eq!(stats.top, 32);
        assert_eq!(a.malloc(4), 40);
    }

    #[test]
    fn attach_sees_same_state() {
        let a = arena(256);
        let x = a.malloc(16);
        let b = Arena::attach(Arc::clone(a.region()), 0).unwrap();
        assert_eq!(b.bytes_for(x), Some(24));
        let y = b.malloc(16);
        assert_eq!(a.bytes_for(y), Some(24));
        assert!(a.free(y));
        assert_eq!(b.stats(), a.stats());
    }

    #[test]
    fn attach_rejects_blank_region() {
        let region = SharedRegion::new_shared(256);
        assert_eq!(
            Arena::attach(region, 0).unwrap_err(),
            ArenaError::Uninitialized { start: 0 }
        );
    }

    #[test]
    fn nonzero_start_offsets_everything() {
        let config = ArenaConfig {
            start: 64,
            ..ArenaConfig::new(512)
        };
        let a = Arena::new(&config).unwrap();
        assert_eq!(a.first_data_address(), 104);
        assert_eq!(a.malloc(8), 104);
        let b = Arena::attach(Arc::clone(a.region()), 64).unwrap();
        assert_eq!(b.top(), a.top());
    }
}
