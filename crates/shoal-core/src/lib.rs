//! Shared-memory substrate for Shoal heaps.
//!
//! Everything higher layers build on lives here:
//!
//! ```text
//! SharedRegion (Arc-shared AtomicU32 words + wait queue)
//! ├── Pointer codec (arena index | byte offset << 12)
//! ├── SpinLock / RwLock (CAS state machines over region words)
//! └── Word (u32 / i32 / f32 views of one shared word)
//! ```
//!
//! The crate is free of `unsafe`: shared memory is only ever touched
//! through atomic word operations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod lock;
pub mod pointer;
pub mod region;
pub mod word;

pub use lock::{ReadGuard, RwLock, SpinLock, SpinLockGuard, WriteGuard};
pub use pointer::{Pointer, MAX_ARENAS, MAX_BYTE_OFFSET};
pub use region::{SharedRegion, WaitStrategy};
pub use word::Word;
