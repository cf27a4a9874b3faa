//! Block allocator over a single shared Shoal region.
//!
//! An [`Arena`] manages one fixed-size [`SharedRegion`] as a malloc/free
//! pool: an address-sorted free list, a LIFO used list, a bump pointer
//! for never-used space, and optional splitting and compaction. The
//! allocator keeps its entire state inside the region, so every thread
//! that holds the region can attach a view and allocate.
//!
//! # Sharing
//!
//! Compaction and splitting rewrite block headers inside memory that
//! another thread may still be reading. Arenas used by several threads
//! must be configured with both turned off ([`ArenaConfig::shared`]).
//!
//! [`SharedRegion`]: shoal_core::SharedRegion

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod stats;

pub use arena::Arena;
pub use config::{ArenaConfig, BLOCK_HEADER_BYTES, STATE_BYTES};
pub use error::ArenaError;
pub use stats::{ArenaStats, BlockListStats};
