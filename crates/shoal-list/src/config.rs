//! List configuration.

use shoal_heap::SharedLocation;

use crate::error::ListError;

/// Configuration for a new [`SharedList`](crate::SharedList).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListConfig {
    /// Payload words per node.
    pub width: u32,
    /// Pre-allocated block of at least
    /// [`HEADER_WORDS`](crate::list::HEADER_WORDS) words to hold the
    /// list header, instead of allocating one.
    pub init_with: Option<SharedLocation>,
}

impl ListConfig {
    /// Default payload width.
    pub const DEFAULT_WIDTH: u32 = 1;

    /// Largest width the header can record.
    pub const MAX_WIDTH: u32 = u16::MAX as u32;

    /// Config for nodes of `width` payload words.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            init_with: None,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ListError> {
        if self.width == 0 || self.width > Self::MAX_WIDTH {
            return Err(ListError::InvalidWidth { width: self.width });
        }
        Ok(())
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH)
    }
}
