//! List inserts from a heap view that has not attached every arena yet.

use std::sync::Arc;

use shoal_heap::{Heap, HeapConfig, HeapError};
use shoal_list::{ListError, SharedList};
use shoal_test_utils::init_tracing;

/// Fill arena 0 with two-word blocks, the size of a one-word node.
fn fill_first_arena(heap: &Heap) {
    loop {
        let block = heap.allocate(2).unwrap();
        if block.arena_index() != 0 {
            assert!(block.free());
            return;
        }
    }
}

#[test]
fn insert_from_lagging_view_leaves_list_intact() {
    init_tracing();
    let owner = Heap::new(HeapConfig::new(200)).unwrap();
    let lagging = Heap::attach(owner.topology()).unwrap();
    let list = SharedList::<u32>::new(&owner).unwrap();
    fill_first_arena(&owner);

    list.push(1).unwrap();
    assert_eq!(list.iter().next().unwrap().unwrap().pointer().arena_index(), 1);

    let behind = SharedList::<u32>::open(&lagging, list.shared_memory()).unwrap();
    assert_eq!(
        behind.push(2).unwrap_err(),
        ListError::Heap(HeapError::MissingArena { index: 1 })
    );
    // The node it allocated went back to the arena it grew.
    assert_eq!(lagging.arena(2).unwrap().stats().used.count, 0);

    assert_eq!(list.len(), 1);
    assert_eq!(list.values().unwrap(), vec![1]);
    list.push(3).unwrap();
    assert_eq!(list.values().unwrap(), vec![1, 3]);

    let region = Arc::clone(owner.arena(1).unwrap().region());
    assert!(lagging.add_shared_arena(1, region).unwrap());
    behind.push(4).unwrap();
    assert_eq!(behind.values().unwrap(), vec![1, 3, 4]);
    assert_eq!(list.values().unwrap(), vec![1, 3, 4]);
    assert_eq!(list.len(), 3);
}

#[test]
fn lagging_view_appends_to_empty_list() {
    init_tracing();
    let owner = Heap::new(HeapConfig::new(200)).unwrap();
    let lagging = Heap::attach(owner.topology()).unwrap();
    let list = SharedList::<u32>::new(&owner).unwrap();
    fill_first_arena(&owner);

    // An empty list has no tail to resolve, so the lagging view links
    // its node straight from the header.
    let behind = SharedList::<u32>::open(&lagging, list.shared_memory()).unwrap();
    behind.push(7).unwrap();
    assert_eq!(behind.values().unwrap(), vec![7]);
    assert_eq!(list.len(), 1);
}
