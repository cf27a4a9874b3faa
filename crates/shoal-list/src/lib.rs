//! Concurrent linked list for Shoal heaps.
//!
//! [`SharedList`] is a singly linked list whose header and nodes live in
//! a [`Heap`](shoal_heap::Heap). Any number of threads, each with its own
//! heap view, can insert at once; deletion during traversal
//! ([`Cursor::delete_current`]) must be serialised by the caller.
//!
//! Node payloads are fixed-width runs of a [`Word`](shoal_core::Word)
//! kind (`u32`, `i32` or `f32`), recorded in the list header so other
//! views can [`open`](SharedList::open) the list with the right kind.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod cursor;
pub mod error;
pub mod list;

pub use config::ListConfig;
pub use cursor::{Cursor, Iter, Node};
pub use error::ListError;
pub use list::{SharedList, SharedListMemory, HEADER_WORDS};
