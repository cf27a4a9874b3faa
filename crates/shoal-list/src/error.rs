//! List error types.

use std::error::Error;
use std::fmt;

use shoal_heap::HeapError;

/// Errors raised by list construction and mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListError {
    /// Allocation or pointer resolution failed.
    Heap(HeapError),
    /// More values than a node holds.
    PayloadTooWide {
        /// Values passed to insert.
        len: usize,
        /// Payload words per node.
        width: u32,
    },
    /// The shared header records a different element kind.
    ElementKindMismatch {
        /// Tag of the element kind requested.
        expected: u16,
        /// Tag found in the header.
        found: u16,
    },
    /// Node width must be in `1..=u16::MAX`.
    InvalidWidth {
        /// The rejected width.
        width: u32,
    },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heap(e) => write!(f, "heap error: {e}"),
            Self::PayloadTooWide { len, width } => {
                write!(f, "cannot insert {len} values into a list of width {width}")
            }
            Self::ElementKindMismatch { expected, found } => {
                write!(f, "list holds element kind {found}, expected {expected}")
            }
            Self::InvalidWidth { width } => {
                write!(f, "invalid node width {width}: must be in 1..={}", u16::MAX)
            }
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Heap(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeapError> for ListError {
    fn from(e: HeapError) -> Self {
        Self::Heap(e)
    }
}
