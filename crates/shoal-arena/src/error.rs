//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors raised while configuring or attaching an arena.
///
/// Running out of space is not an error: `malloc` reports it with a null
/// address so callers can try another arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// Alignment is not a power of two or is below 8 bytes.
    InvalidAlignment {
        /// The rejected alignment.
        align: u32,
    },
    /// Minimum split threshold does not exceed the block header size.
    InvalidMinSplit {
        /// The rejected threshold.
        min_split: u32,
    },
    /// The state block anchor is not word aligned.
    MisalignedStart {
        /// The rejected start address.
        start: u32,
    },
    /// Region size is not a whole number of 32-bit words.
    SizeNotWordMultiple {
        /// The rejected size in bytes.
        size: u32,
    },
    /// Region size cannot be addressed by a packed pointer's byte offset.
    SizeExceedsAddressSpace {
        /// The rejected size in bytes.
        size: u32,
        /// Largest addressable arena size in bytes.
        max: u32,
    },
    /// The state block leaves no room for any allocation.
    InsufficientRange {
        /// First address available for blocks.
        top: u32,
        /// End of the managed range.
        end: u32,
    },
    /// Attaching to a region whose state block was never initialised.
    Uninitialized {
        /// Anchor address that was inspected.
        start: u32,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAlignment { align } => {
                write!(f, "invalid alignment {align}: must be a power of two >= 8")
            }
            Self::InvalidMinSplit { min_split } => {
                write!(f, "invalid min split threshold {min_split}: must exceed 8")
            }
            Self::MisalignedStart { start } => {
                write!(f, "arena start {start:#x} is not a multiple of 4")
            }
            Self::SizeNotWordMultiple { size } => {
                write!(f, "arena size {size} is not a multiple of 4")
            }
            Self::SizeExceedsAddressSpace { size, max } => {
                write!(
                    f,
                    "arena size {size} exceeds the {max} bytes a pointer can address"
                )
            }
            Self::InsufficientRange { top, end } => {
                write!(f, "insufficient address range ({top:#x} - {end:#x})")
            }
            Self::Uninitialized { start } => {
                write!(f, "no arena state initialised at {start:#x}")
            }
        }
    }
}

impl Error for ArenaError {}
