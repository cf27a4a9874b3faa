//! Heap error types.

use std::error::Error;
use std::fmt;

use shoal_arena::ArenaError;

/// Errors raised by heap construction, growth and handle resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// Arena configuration or attachment failed.
    Arena(ArenaError),
    /// `initial_arenas` is zero or beyond the addressable arena count.
    InvalidInitialArenas {
        /// The rejected count.
        count: u32,
        /// Largest allowed count.
        max: u32,
    },
    /// Every arena index a pointer can encode is taken.
    ArenaIndexExhausted {
        /// Number of addressable arenas.
        max: u32,
    },
    /// Allocation of zero words.
    ZeroSizedRequest,
    /// The request cannot fit in a single arena, even an empty one.
    RequestTooLarge {
        /// Requested length in words.
        words: u32,
        /// Size of each arena in bytes.
        arena_size: u32,
    },
    /// The null pointer does not name an allocation.
    NullPointer,
    /// This view has no arena at the given index (not yet synchronised).
    MissingArena {
        /// The arena index that was looked up.
        index: u32,
    },
    /// A view request overruns its backing allocation.
    OutOfBounds {
        /// First word of the requested view.
        offset: u32,
        /// Requested length in words.
        len: u32,
        /// Words actually available.
        available: u32,
    },
    /// A topology without its first arena cannot be attached.
    EmptyTopology,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(e) => write!(f, "arena error: {e}"),
            Self::InvalidInitialArenas { count, max } => {
                write!(f, "invalid initial arena count {count}: must be in 1..={max}")
            }
            Self::ArenaIndexExhausted { max } => {
                write!(f, "cannot add an arena: all {max} arena indices are in use")
            }
            Self::ZeroSizedRequest => write!(f, "cannot allocate zero words"),
            Self::RequestTooLarge { words, arena_size } => {
                write!(
                    f,
                    "cannot allocate {words} words: larger than a {arena_size} byte arena"
                )
            }
            Self::NullPointer => write!(f, "cannot resolve the null pointer"),
            Self::MissingArena { index } => {
                write!(f, "arena {index} is not attached to this heap view")
            }
            Self::OutOfBounds {
                offset,
                len,
                available,
            } => {
                write!(
                    f,
                    "view {offset}..{} overruns allocation of {available} words",
                    u64::from(*offset) + u64::from(*len)
                )
            }
            Self::EmptyTopology => write!(f, "heap topology has no first arena"),
        }
    }
}

impl Error for HeapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for HeapError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_display_widens_end() {
        let e = HeapError::OutOfBounds {
            offset: u32::MAX,
            len: 2,
            available: 4,
        };
        assert_eq!(
            e.to_string(),
            "view 4294967295..4294967297 overruns allocation of 4 words"
        );
    }

    #[test]
    fn arena_errors_keep_their_source() {
        let e = HeapError::from(ArenaError::SizeNotWordMultiple { size: 7 });
        assert!(e.source().is_some());
        assert!(HeapError::NullPointer.source().is_none());
    }
}
