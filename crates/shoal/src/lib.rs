//! Shoal: a shared memory heap for threads.
//!
//! This is the facade crate that re-exports the public API from all Shoal
//! sub-crates. For most users, adding `shoal` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use shoal::prelude::*;
//! use std::sync::Arc;
//!
//! // One heap, plus a second view of it that follows its growth.
//! let heap = Arc::new(Heap::new(HeapConfig::concurrent(4096)).unwrap());
//! let peer = Arc::new(Heap::attach(heap.topology()).unwrap());
//! heap.forward_growth_to(&peer);
//!
//! let list = SharedList::<u32>::new(&heap).unwrap();
//! list.push(7).unwrap();
//!
//! let memory = list.shared_memory();
//! let handle = std::thread::spawn(move || {
//!     let list = SharedList::<u32>::open(&peer, memory).unwrap();
//!     list.push(8).unwrap();
//!     list.len()
//! });
//! assert_eq!(handle.join().unwrap(), 2);
//! assert_eq!(list.values().unwrap(), vec![7, 8]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`primitives`] | `shoal-core` | Shared regions, packed pointers, locks, word kinds |
//! | [`arena`] | `shoal-arena` | Block allocator over one region |
//! | [`heap`] | `shoal-heap` | Growable multi-arena heap and allocation handles |
//! | [`list`] | `shoal-list` | Concurrent linked list |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shared regions, packed pointers, lock primitives and word kinds
/// (`shoal-core`).
pub use shoal_core as primitives;

/// Block allocator over a single shared region (`shoal-arena`).
///
/// Most users go through [`heap::Heap`] instead; use [`arena::Arena`]
/// directly to manage one fixed region.
pub use shoal_arena as arena;

/// Growable multi-arena heap (`shoal-heap`).
pub use shoal_heap as heap;

/// Concurrent linked list (`shoal-list`).
pub use shoal_list as list;

/// Common imports for typical Shoal usage.
///
/// ```rust
/// use shoal::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use shoal_core::{Pointer, RwLock, SharedRegion, SpinLock, Word};

    // Heap
    pub use shoal_heap::{
        Allocation, GrowthEvent, Heap, HeapConfig, HeapTopology, SharedLocation, WordView,
    };

    // List
    pub use shoal_list::{ListConfig, SharedList, SharedListMemory};

    // Errors
    pub use shoal_arena::ArenaError;
    pub use shoal_heap::HeapError;
    pub use shoal_list::ListError;
}
