//! Forward-referenceable block labels.
//!
//! A [`BlockLabel`] is created before the block it names exists, handed to any number of
//! terminators as a successor, and bound exactly once when that block is sealed. Clones
//! share the same binding, so a terminator built before the target block observes the
//! binding made afterwards.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
};

use crate::{graph::BlockId, Error, Result};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

struct LabelInner {
    serial: u64,
    target: OnceLock<BlockId>,
}

/// A shared, resolve-once reference to a basic block.
///
/// Equality and hashing are by identity: two labels are equal only if one is a clone of
/// the other.
#[derive(Clone)]
pub struct BlockLabel(Arc<LabelInner>);

impl BlockLabel {
    /// Creates a fresh, unresolved label.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(LabelInner {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            target: OnceLock::new(),
        }))
    }

    /// Process-unique serial number, used in diagnostics and printed graphs.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.0.serial
    }

    /// Returns `true` once the label has been bound.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0.target.get().is_some()
    }

    /// Returns the block this label is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedLabel`] if the label has not been bound yet.
    pub fn target(&self) -> Result<BlockId> {
        self.0
            .target
            .get()
            .copied()
            .ok_or(Error::UnresolvedLabel(self.0.serial))
    }

    /// Binds the label to `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelAlreadyResolved`] if the label is already bound, even to the
    /// same block.
    pub fn resolve(&self, block: BlockId) -> Result<()> {
        self.0
            .target
            .set(block)
            .map_err(|_| Error::LabelAlreadyResolved(self.0.serial))
    }
}

impl Default for BlockLabel {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for BlockLabel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for BlockLabel {}

impl Hash for BlockLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.serial.hash(state);
    }
}

impl fmt::Debug for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.target.get() {
            Some(block) => write!(f, "L{} -> {}", self.0.serial, block),
            None => write!(f, "L{} -> ?", self.0.serial),
        }
    }
}

impl fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.target.get() {
            Some(block) => write!(f, "{block}"),
            None => write!(f, "L{}", self.0.serial),
        }
    }
}
