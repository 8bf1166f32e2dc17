//! Basic blocks.

use std::fmt;

use crate::graph::{BlockLabel, NodeId};

/// Index of a sealed block within its unit's [`Graph`](crate::graph::Graph).
///
/// Blocks are numbered in the order they are sealed; block 0 is the entry block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    /// The entry block of every unit.
    pub const ENTRY: BlockId = BlockId(0);

    /// Creates a block id from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A sealed basic block: an entry marker, an ordering chain and exactly one terminator.
///
/// The block owns its terminator; every other node of the block is reachable from the
/// terminator through ordering and value dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    label: BlockLabel,
    entry: NodeId,
    terminator: NodeId,
}

impl BasicBlock {
    pub(crate) fn new(label: BlockLabel, entry: NodeId, terminator: NodeId) -> Self {
        Self {
            label,
            entry,
            terminator,
        }
    }

    /// The label this block was begun with.
    #[must_use]
    pub fn label(&self) -> &BlockLabel {
        &self.label
    }

    /// The block entry marker.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// The terminator that sealed this block.
    #[must_use]
    pub const fn terminator(&self) -> NodeId {
        self.terminator
    }
}
