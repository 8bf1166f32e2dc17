//! Block terminators.
//!
//! Every sealed block ends in exactly one terminator. Successors are exposed by index so
//! that control-flow consumers can walk any terminator uniformly:
//!
//! | Terminator      | Successors                                   |
//! |-----------------|----------------------------------------------|
//! | `Return`, `Throw`, `Unreachable` | none                        |
//! | `Goto`          | the target                                   |
//! | `If`            | 0 = true target, 1 = false target            |
//! | `Switch`        | the case targets in key order, then default  |
//! | `Try`           | 0 = resume, 1 = exception handler            |
//!
//! A `Try` wraps a triable operation. Its ordering dependency is that operation, which
//! must have been the head of the block's ordering chain when the `Try` was appended.

use std::fmt;

use crate::{
    graph::{BlockLabel, NodeId},
    Error, Result,
};

/// A control transfer ending a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump
    Goto(BlockLabel),
    /// Two-way conditional branch
    If {
        /// Boolean condition
        condition: NodeId,
        /// Taken when the condition holds
        if_true: BlockLabel,
        /// Taken otherwise
        if_false: BlockLabel,
    },
    /// Multi-way branch on an integer
    Switch {
        /// Integer selector
        value: NodeId,
        /// Case keys, parallel to `targets`
        keys: Vec<i64>,
        /// Case targets
        targets: Vec<BlockLabel>,
        /// Taken when no key matches
        default: BlockLabel,
    },
    /// Return from the unit, with a value unless the unit is void
    Return(Option<NodeId>),
    /// Raise the given exception object
    Throw(NodeId),
    /// Exception-raising control transfer around a triable operation
    Try {
        /// The wrapped operation
        operation: NodeId,
        /// Continuation when the operation completes normally
        resume: BlockLabel,
        /// Continuation when the operation raises
        handler: BlockLabel,
    },
    /// Control never reaches the end of the block
    Unreachable,
}

impl Terminator {
    /// Number of successor blocks.
    #[must_use]
    pub fn successor_count(&self) -> usize {
        match self {
            Self::Return(_) | Self::Throw(_) | Self::Unreachable => 0,
            Self::Goto(_) => 1,
            Self::If { .. } | Self::Try { .. } => 2,
            Self::Switch { targets, .. } => targets.len() + 1,
        }
    }

    /// The successor label at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= successor_count()`.
    pub fn successor(&self, index: usize) -> Result<&BlockLabel> {
        let found = match (self, index) {
            (Self::Goto(target), 0) => Some(target),
            (Self::If { if_true, .. }, 0) => Some(if_true),
            (Self::If { if_false, .. }, 1) => Some(if_false),
            (Self::Try { resume, .. }, 0) => Some(resume),
            (Self::Try { handler, .. }, 1) => Some(handler),
            (Self::Switch {
                targets, default, ..
            }, _) => {
                if index < targets.len() {
                    targets.get(index)
                } else if index == targets.len() {
                    Some(default)
                } else {
                    None
                }
            }
            _ => None,
        };
        found.ok_or(Error::IndexOutOfBounds {
            index,
            count: self.successor_count(),
        })
    }

    /// Iterates over all successor labels in index order.
    pub fn successors(&self) -> impl Iterator<Item = &BlockLabel> + '_ {
        (0..self.successor_count()).filter_map(move |i| self.successor(i).ok())
    }

    pub(crate) fn push_dependencies(&self, out: &mut Vec<NodeId>) {
        match self {
            Self::If { condition, .. } => out.push(*condition),
            Self::Switch { value, .. } => out.push(*value),
            Self::Return(Some(value)) | Self::Throw(value) => out.push(*value),
            Self::Goto(_) | Self::Return(None) | Self::Try { .. } | Self::Unreachable => {}
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goto(target) => write!(f, "goto {target}"),
            Self::If {
                condition,
                if_true,
                if_false,
            } => write!(f, "if {condition} then {if_true} else {if_false}"),
            Self::Switch {
                value,
                keys,
                targets,
                default,
            } => {
                write!(f, "switch {value} [")?;
                for (key, target) in keys.iter().zip(targets) {
                    write!(f, "{key}: {target}, ")?;
                }
                write!(f, "default: {default}]")
            }
            Self::Return(Some(value)) => write!(f, "return {value}"),
            Self::Return(None) => f.write_str("return"),
            Self::Throw(value) => write!(f, "throw {value}"),
            Self::Try {
                operation,
                resume,
                handler,
            } => write!(f, "try {operation} resume {resume} catch {handler}"),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}
