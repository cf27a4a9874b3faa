//! Benchmark profiles for the Shoal shared memory heap.
//!
//! - [`fragmented_arena`]: an arena with every other block freed
//! - [`populated_list`]: a list of `n` sequential values

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use shoal_arena::{Arena, ArenaConfig, ArenaError};
use shoal_heap::Heap;
use shoal_list::{ListError, SharedList};

/// Arena size used by the profiles: the largest an arena may be.
pub const PROFILE_ARENA_SIZE: u32 = 1 << 20;

/// A single-threaded arena holding `blocks` allocations of `bytes`, every
/// other one freed once all are in place, so each hole is pinned between
/// live blocks and the free list is as long as it gets.
///
/// Compaction is off; it would merge the holes back away.
pub fn fragmented_arena(blocks: u32, bytes: u32) -> Result<(Arena, Vec<u32>), ArenaError> {
    let config = ArenaConfig {
        compact: false,
        ..ArenaConfig::new(PROFILE_ARENA_SIZE)
    };
    let arena = Arena::new(&config)?;
    let addrs: Vec<u32> = (0..blocks)
        .map(|_| arena.malloc(bytes))
        .take_while(|&addr| addr != 0)
        .collect();
    let mut live = Vec::with_capacity(addrs.len() / 2);
    for (i, addr) in addrs.into_iter().enumerate() {
        if i % 2 == 0 {
            arena.free(addr);
        } else {
            live.push(addr);
        }
    }
    Ok((arena, live))
}

/// A list holding `0..n`.
pub fn populated_list(heap: &Heap, n: u32) -> Result<SharedList<'_, u32>, ListError> {
    let list = SharedList::new(heap)?;
    for value in 0..n {
        list.push(value)?;
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_heap::HeapConfig;

    #[test]
    fn fragmented_arena_keeps_every_hole() {
        let (arena, live) = fragmented_arena(2_048, 48).unwrap();
        let stats = arena.stats();
        assert_eq!(live.len(), 1_024);
        assert_eq!(stats.free.count, 1_024);
        assert_eq!(stats.used.count, 1_024);
    }

    #[test]
    fn populated_list_holds_sequence() {
        let heap = Heap::new(HeapConfig::default()).unwrap();
        let list = populated_list(&heap, 5).unwrap();
        assert_eq!(list.values().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
