//! Growable multi-arena heap for Shoal.
//!
//! A [`Heap`] strings fixed-size arenas together behind packed 32-bit
//! [`Pointer`](shoal_core::Pointer)s and grows by one arena whenever no
//! arena can satisfy a request. Several threads can hold views of the
//! same heap: each view allocates into the shared arenas directly, and
//! new arenas reach peer views through [`GrowthEvent`]s.
//!
//! Allocations come back as [`Allocation`] handles whose [`WordView`]s
//! read and write the shared words atomically. A handle's
//! [`SharedLocation`] (or its pointer) is plain data that another view
//! resolves back into a handle with [`Heap::resolve`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod growth;
pub mod handle;
pub mod heap;
pub mod view;

pub use config::HeapConfig;
pub use error::HeapError;
pub use growth::{GrowthEvent, GrowthListener};
pub use handle::{Allocation, SharedLocation};
pub use heap::{Heap, HeapTopology, MemoryUsage};
pub use view::WordView;
