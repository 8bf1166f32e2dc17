//! Graph nodes and their dependency edges.
//!
//! A [`Node`] is immutable once appended to the [`NodeStore`](crate::graph::NodeStore).
//! It has two kinds of outgoing edges:
//!
//! - at most one *ordering dependency*, linking side-effecting nodes of a block into a
//!   chain that starts at the block entry and ends at the terminator,
//! - any number of *value dependencies*, the operands it consumes.
//!
//! Both are exposed by count and index, so consumers can walk nodes without matching on
//! every operation.

use std::{fmt, sync::Arc};

use crate::{
    graph::{Action, BlockLabel, NodeVisitor, Terminator, Value},
    types::ExecutableElement,
    Error, Result,
};

/// Stable index of a node in the session's node store.
///
/// Ids are dense and allocated in append order, which gives the total order used to
/// canonicalize commutative operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a node id from a raw index.
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Debug provenance carried by every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// The executable element whose graph the node was built for
    pub element: Arc<ExecutableElement>,
    /// Source line, 0 if unknown
    pub line: u32,
    /// Bytecode index, -1 for synthesized nodes
    pub bci: i32,
    /// The invocation node this node was inlined through, if any
    pub call_site: Option<NodeId>,
}

impl Provenance {
    /// Provenance at the start of `element`, with no location information.
    #[must_use]
    pub fn new(element: Arc<ExecutableElement>) -> Self {
        Self {
            element,
            line: 0,
            bci: -1,
            call_site: None,
        }
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Entry marker of the block begun with the label
    Entry(BlockLabel),
    /// A value-producing computation
    Value(Value),
    /// A side-effecting operation without a result
    Action(Action),
    /// The terminator of a block
    Terminator(Terminator),
}

/// A node of the program graph.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    dependency: Option<NodeId>,
    provenance: Provenance,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, dependency: Option<NodeId>, provenance: Provenance) -> Self {
        Self {
            kind,
            dependency,
            provenance,
        }
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Debug provenance.
    #[must_use]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// The enclosing executable element.
    #[must_use]
    pub fn element(&self) -> &Arc<ExecutableElement> {
        &self.provenance.element
    }

    /// Source line.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.provenance.line
    }

    /// Bytecode index.
    #[must_use]
    pub fn bci(&self) -> i32 {
        self.provenance.bci
    }

    /// Originating call site.
    #[must_use]
    pub fn call_site(&self) -> Option<NodeId> {
        self.provenance.call_site
    }

    /// The value, if this node produces one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The action, if this node is one.
    #[must_use]
    pub fn as_action(&self) -> Option<&Action> {
        match &self.kind {
            NodeKind::Action(action) => Some(action),
            _ => None,
        }
    }

    /// The terminator, if this node is one.
    #[must_use]
    pub fn as_terminator(&self) -> Option<&Terminator> {
        match &self.kind {
            NodeKind::Terminator(terminator) => Some(terminator),
            _ => None,
        }
    }

    /// Returns `true` if the node may be wrapped by a `try` terminator.
    #[must_use]
    pub fn is_triable(&self) -> bool {
        match &self.kind {
            NodeKind::Value(value) => value.is_triable(),
            NodeKind::Action(action) => action.is_triable(),
            _ => false,
        }
    }

    /// Number of ordering dependencies (0 or 1).
    #[must_use]
    pub fn ordering_dependency_count(&self) -> usize {
        usize::from(self.dependency.is_some())
    }

    /// The ordering dependency at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= ordering_dependency_count()`.
    pub fn ordering_dependency(&self, index: usize) -> Result<NodeId> {
        match (index, self.dependency) {
            (0, Some(dependency)) => Ok(dependency),
            _ => Err(Error::IndexOutOfBounds {
                index,
                count: self.ordering_dependency_count(),
            }),
        }
    }

    /// All value dependencies in operand order.
    #[must_use]
    pub fn value_dependencies(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Entry(_) => {}
            NodeKind::Value(value) => value.push_dependencies(&mut out),
            NodeKind::Action(action) => action.push_dependencies(&mut out),
            NodeKind::Terminator(terminator) => terminator.push_dependencies(&mut out),
        }
        out
    }

    /// Number of value dependencies.
    #[must_use]
    pub fn value_dependency_count(&self) -> usize {
        self.value_dependencies().len()
    }

    /// The value dependency at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= value_dependency_count()`.
    pub fn value_dependency(&self, index: usize) -> Result<NodeId> {
        let dependencies = self.value_dependencies();
        dependencies
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                index,
                count: dependencies.len(),
            })
    }

    /// Dispatches to the visitor method matching this node's kind.
    pub fn accept<P, R, V>(&self, visitor: &mut V, param: &mut P) -> R
    where
        V: NodeVisitor<P, R> + ?Sized,
    {
        match &self.kind {
            NodeKind::Entry(label) => visitor.visit_entry(param, self, label),
            NodeKind::Value(value) => visitor.visit_value(param, self, value),
            NodeKind::Action(action) => visitor.visit_action(param, self, action),
            NodeKind::Terminator(terminator) => visitor.visit_terminator(param, self, terminator),
        }
    }
}
