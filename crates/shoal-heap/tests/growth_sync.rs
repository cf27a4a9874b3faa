//! Growth propagation between heap views, across threads.

use std::sync::Arc;
use std::thread;

use shoal_core::Pointer;
use shoal_heap::{Heap, HeapConfig, HeapError, SharedLocation};
use shoal_test_utils::{init_tracing, linked_views};

#[test]
fn scenario_a_growth_on_third_allocation() {
    init_tracing();
    let heap = Heap::new(HeapConfig::new(200)).unwrap();
    heap.allocate(10).unwrap();
    heap.allocate(10).unwrap();
    assert_eq!(heap.arena_count(), 1);
    heap.allocate(20).unwrap();
    assert_eq!(heap.arena_count(), 2);
}

#[test]
fn attached_view_grows_and_owner_follows() {
    init_tracing();
    let views = linked_views(HeapConfig::new(200), 2).unwrap();
    let (owner, copy) = (&views[0], &views[1]);

    // Fill arena 0 from the owner, then force growth from the copy.
    owner.allocate(30).unwrap();
    let grown = copy.allocate(30).unwrap();
    assert_eq!(grown.arena_index(), 1);
    assert_eq!(owner.arena_count(), 2);
    assert_eq!(copy.arena_count(), 2);
    assert_eq!(owner.shared_arena_count(), 2);

    grown.view().fill(0xabcd);
    let seen = owner.resolve(grown.location()).unwrap();
    assert_eq!(seen.view().to_vec()[..30], [0xabcd; 30]);
}

#[test]
fn unsynchronised_view_skips_and_reports_holes() {
    init_tracing();
    let owner = Heap::new(HeapConfig::new(200)).unwrap();
    let lagging = Heap::attach(owner.topology()).unwrap();

    owner.allocate(30).unwrap();
    let far = owner.allocate(30).unwrap();
    assert_eq!(far.arena_index(), 1);
    assert_eq!(
        lagging.resolve(far.location()).unwrap_err(),
        HeapError::MissingArena { index: 1 }
    );

    // The lagging view claims the next free index instead of reusing 1.
    let own = lagging.allocate(40).unwrap();
    assert_eq!(own.arena_index(), 2);
    assert!(lagging.arena(1).is_none());
    assert_eq!(lagging.arena_count(), 2);
    assert_eq!(owner.shared_arena_count(), 3);

    let region = Arc::clone(owner.arena(1).unwrap().region());
    assert!(lagging.add_shared_arena(1, region).unwrap());
    assert_eq!(lagging.resolve(far.location()).unwrap().pointer(), far.pointer());
}

#[test]
fn locations_cross_threads() {
    init_tracing();
    let views = linked_views(HeapConfig::concurrent(4096), 2).unwrap();
    let allocation = views[0].allocate(8).unwrap();
    allocation.view().copy_from(&[1u32, 2, 3, 4, 5, 6, 7, 8]);
    let location = allocation.location();

    let reader = Arc::clone(&views[1]);
    let sum = thread::spawn(move || {
        let seen = reader.resolve_sized(location, 8).unwrap();
        seen.view().to_vec().iter().sum::<u32>()
    })
    .join()
    .unwrap();
    assert_eq!(sum, 36);
}

#[test]
fn sub_view_bounds() {
    let heap = Heap::new(HeapConfig::default()).unwrap();
    let allocation = heap.allocate(8).unwrap();
    let tail = allocation.sub_view(6, 2).unwrap();
    tail.store(1, 99);
    assert_eq!(allocation.load(7), 99);

    let location = allocation.sub_location(4, 4).unwrap();
    assert_eq!(location.byte_offset, allocation.byte_offset() + 16);
    assert_eq!(heap.resolve_sized(location, 4).unwrap().load(3), 99);

    if cfg!(debug_assertions) {
        assert_eq!(
            allocation.sub_view(6, 3).unwrap_err(),
            HeapError::OutOfBounds {
                offset: 6,
                len: 3,
                available: 8
            }
        );
    }
}

#[test]
fn pointer_and_location_agree() {
    let heap = Heap::new(HeapConfig::default()).unwrap();
    let allocation = heap.allocate(2).unwrap();
    let pointer: Pointer = allocation.pointer();
    assert_eq!(SharedLocation::from(pointer), allocation.location());
    let resolved = heap.resolve_pointer(pointer).unwrap();
    assert_eq!(resolved.byte_offset(), allocation.byte_offset());
    if cfg!(debug_assertions) {
        assert_eq!(resolved.len(), 2);
    }
}

#[test]
fn concurrent_growth_converges() {
    init_tracing();
    let views = linked_views(HeapConfig::concurrent(512), 4).unwrap();

    let handles: Vec<_> = views
        .iter()
        .enumerate()
        .map(|(t, view)| {
            let view = Arc::clone(view);
            thread::spawn(move || {
                let mut locations = Vec::new();
                for i in 0..100u32 {
                    let allocation = view.allocate(16).unwrap();
                    allocation.view().fill(t as u32 * 1_000 + i);
                    locations.push((allocation.location(), t as u32 * 1_000 + i));
                }
                locations
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let expected = views[0].shared_arena_count();
    for view in &views {
        assert_eq!(view.arena_count(), expected);
        for (location, tag) in &all {
            let seen = view.resolve_sized(*location, 16).unwrap();
            assert_eq!(seen.view().to_vec(), vec![*tag; 16]);
        }
    }
}
