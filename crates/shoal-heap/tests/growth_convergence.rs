//! Two linked views converge on one arena set whatever the allocation mix.

use proptest::prelude::*;
use shoal_heap::HeapConfig;
use shoal_test_utils::linked_views;

proptest! {
    #[test]
    fn linked_views_converge(ops in prop::collection::vec((any::<bool>(), 1u32..40), 1..60)) {
        let views = linked_views(HeapConfig::new(256), 2).unwrap();
        for (on_owner, words) in ops {
            let view = if on_owner { &views[0] } else { &views[1] };
            let allocation = view.allocate(words).unwrap();
            prop_assert!(views[0].resolve(allocation.location()).is_ok());
            prop_assert!(views[1].resolve(allocation.location()).is_ok());
        }
        let shared = views[0].shared_arena_count();
        prop_assert_eq!(views[0].arena_count(), shared);
        prop_assert_eq!(views[1].arena_count(), shared);
        prop_assert_eq!(views[0].topology().len(), views[1].topology().len());
    }
}
