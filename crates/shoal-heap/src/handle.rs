//! Allocation handles and shareable locations.

use std::fmt;

use shoal_arena::Arena;
use shoal_core::region::{word_index, WORD_BYTES};
use shoal_core::Pointer;

use crate::error::HeapError;
use crate::heap::Heap;
use crate::view::WordView;

/// Where an allocation lives: plain data any thread can carry to its own
/// heap view and resolve there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SharedLocation {
    /// Arena index inside the heap.
    pub arena_index: u32,
    /// Byte offset of the first data word inside the arena.
    pub byte_offset: u32,
}

impl SharedLocation {
    /// Packed pointer form of this location.
    pub fn pointer(&self) -> Pointer {
        Pointer::new(self.arena_index, self.byte_offset)
    }
}

impl From<Pointer> for SharedLocation {
    fn from(pointer: Pointer) -> Self {
        Self {
            arena_index: pointer.arena_index(),
            byte_offset: pointer.byte_offset(),
        }
    }
}

/// A live allocation inside a [`Heap`].
///
/// The handle only names the memory; it does not own it. Freeing is
/// explicit, and any other handle or pointer to the same block becomes
/// dangling once it is freed.
#[derive(Clone)]
pub struct Allocation<'h> {
    heap: &'h Heap,
    arena: Arena,
    arena_index: u32,
    byte_offset: u32,
    len: u32,
}

impl<'h> Allocation<'h> {
    pub(crate) fn new(
        heap: &'h Heap,
        arena: Arena,
        arena_index: u32,
        byte_offset: u32,
        len: u32,
    ) -> Self {
        Self {
            heap,
            arena,
            arena_index,
            byte_offset,
            len,
        }
    }

    /// The heap this allocation came from.
    pub fn heap(&self) -> &'h Heap {
        self.heap
    }

    /// Arena index of the allocation.
    pub fn arena_index(&self) -> u32 {
        self.arena_index
    }

    /// Byte offset of the first data word.
    pub fn byte_offset(&self) -> u32 {
        self.byte_offset
    }

    /// Length in words.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the handle covers no words.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed pointer to the allocation.
    pub fn pointer(&self) -> Pointer {
        Pointer::new(self.arena_index, self.byte_offset)
    }

    /// Shareable location of the allocation.
    pub fn location(&self) -> SharedLocation {
        SharedLocation {
            arena_index: self.arena_index,
            byte_offset: self.byte_offset,
        }
    }

    /// Every word of the allocation.
    pub fn view(&self) -> WordView<'_> {
        WordView::new(
            self.arena.region(),
            word_index(self.byte_offset),
            self.len as usize,
        )
    }

    /// `len` words starting `offset` words into the allocation.
    ///
    /// Overruns are errors in debug builds. Release builds log a warning
    /// and hand out the view anyway.
    pub fn sub_view(&self, offset: u32, len: u32) -> Result<WordView<'_>, HeapError> {
        self.check_bounds(offset, len)?;
        Ok(WordView::new(
            self.arena.region(),
            word_index(self.byte_offset) + offset as usize,
            len as usize,
        ))
    }

    /// Location of the word `offset` words into the allocation, for
    /// passing a sub-range to another thread.
    pub fn sub_location(&self, offset: u32, len: u32) -> Result<SharedLocation, HeapError> {
        self.check_bounds(offset, len)?;
        Ok(SharedLocation {
            arena_index: self.arena_index,
            byte_offset: self.byte_offset + offset * WORD_BYTES,
        })
    }

    /// Load word `index`.
    pub fn load(&self, index: usize) -> u32 {
        self.view().load(index)
    }

    /// Store `value` at word `index`.
    pub fn store(&self, index: usize, value: u32) {
        self.view().store(index, value);
    }

    /// Return the block to its arena. Returns `false` if it was already
    /// freed.
    pub fn free(self) -> bool {
        self.arena.free(self.byte_offset)
    }

    fn check_bounds(&self, offset: u32, len: u32) -> Result<(), HeapError> {
        let end = u64::from(offset) + u64::from(len);
        if end <= u64::from(self.len) {
            return Ok(());
        }
        if cfg!(debug_assertions) {
            return Err(HeapError::OutOfBounds {
                offset,
                len,
                available: self.len,
            });
        }
        tracing::warn!(
            pointer = %self.pointer(),
            offset,
            len,
            available = self.len,
            "view overruns its allocation"
        );
        Ok(())
    }
}

impl fmt::Debug for Allocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("pointer", &format_args!("{}", self.pointer()))
            .field("len", &self.len)
            .finish()
    }
}
