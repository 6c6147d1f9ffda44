#![forbid(unsafe_code)]

//! Node identifiers.

use std::fmt;

/// Handle to a node inside a [`Document`](crate::Document).
///
/// An ID is an arena slot plus the slot's generation. Disposing a node bumps
/// the generation, so stale IDs never alias a node that reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// The document root. Always connected, never disposed.
    pub const ROOT: Self = Self {
        index: 0,
        generation: 0,
    };

    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self {
            index: u32::try_from(index).unwrap_or(u32::MAX),
            generation,
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }

    /// Get the raw slot value.
    #[inline]
    pub const fn id(self) -> u32 {
        self.index
    }

    /// How many times the slot was reused before this node.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}
