//! Heap configuration parameters.

use shoal_arena::{ArenaConfig, ArenaError, BLOCK_HEADER_BYTES};
use shoal_core::MAX_ARENAS;

use crate::error::HeapError;
use crate::heap::METADATA_WORDS;

/// Configuration for a [`Heap`](crate::Heap).
///
/// Every arena the heap ever creates, at construction or on growth,
/// uses the same size and block policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Size of each arena in bytes. At most 2^20.
    pub arena_size: u32,
    /// Arenas created up front. At least 1.
    pub initial_arenas: u32,
    /// Block alignment in bytes.
    pub align: u32,
    /// Merge contiguous free blocks. Turn off when threads share the heap.
    pub compact: bool,
    /// Split reused blocks. Turn off when threads share the heap.
    pub split: bool,
    /// Minimum excess before a block is split.
    pub min_split: u32,
}

impl HeapConfig {
    /// Default arena size: 8 KiB.
    pub const DEFAULT_ARENA_SIZE: u32 = 8_192;

    /// Single-threaded heap of `arena_size` byte arenas.
    pub fn new(arena_size: u32) -> Self {
        Self {
            arena_size,
            initial_arenas: 1,
            align: ArenaConfig::DEFAULT_ALIGN,
            compact: true,
            split: true,
            min_split: ArenaConfig::DEFAULT_MIN_SPLIT,
        }
    }

    /// Heap whose arenas are safe to share between threads: compaction
    /// and splitting off.
    pub fn concurrent(arena_size: u32) -> Self {
        Self {
            compact: false,
            split: false,
            ..Self::new(arena_size)
        }
    }

    /// The per-arena config derived from this heap config.
    pub fn arena_config(&self) -> ArenaConfig {
        ArenaConfig {
            size: self.arena_size,
            start: 0,
            end: None,
            align: self.align,
            compact: self.compact,
            split: self.split,
            min_split: self.min_split,
        }
    }

    /// Check structural invariants, including room for the metadata block.
    pub fn validate(&self) -> Result<(), HeapError> {
        let arena = self.arena_config();
        arena.validate()?;
        if self.initial_arenas == 0 || self.initial_arenas > MAX_ARENAS {
            return Err(HeapError::InvalidInitialArenas {
                count: self.initial_arenas,
                max: MAX_ARENAS,
            });
        }
        let top = arena.initial_top();
        let metadata_block = (METADATA_WORDS * 4 + BLOCK_HEADER_BYTES).next_multiple_of(self.align);
        if top + metadata_block > arena.resolved_end() {
            return Err(ArenaError::InsufficientRange {
                top,
                end: arena.resolved_end(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ARENA_SIZE)
    }
}
