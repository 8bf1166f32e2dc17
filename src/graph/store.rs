//! Session-wide node arena and hash-consing table.
//!
//! All nodes of a compilation session live in one append-only arena, addressed by
//! [`NodeId`]. Pure values are additionally recorded in a concurrent interning table keyed
//! by the structural [`Value`], so that any number of units compiling in parallel agree on
//! a single canonical node per key.
//!
//! # Thread Safety
//!
//! [`NodeStore`] is `Send + Sync`; every method takes `&self`. The arena is a
//! `boxcar::Vec` (lock-free append, stable addresses) and the interning table a
//! `DashMap` whose `entry` API guarantees that a key is populated exactly once even when
//! several threads race to intern it.
//!
//! # Provable Relations
//!
//! The `is_def_*` queries answer "is this relation known to hold at compile time". A
//! `false` answer means "unknown", never "known not to hold".

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    graph::{Literal, Node, NodeId, NodeKind, Provenance, Value, ValueOp},
    types::ValueType,
    Error, Result,
};

/// Append-only node arena with an interning table for pure values.
#[derive(Debug)]
pub struct NodeStore {
    nodes: boxcar::Vec<Node>,
    interned: DashMap<Value, NodeId>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: boxcar::Vec::new(),
            interned: DashMap::new(),
        }
    }

    /// Total number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.count()
    }

    /// Returns `true` if no node was appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.count() == 0
    }

    /// Number of distinct interned values.
    #[must_use]
    pub fn interned_count(&self) -> usize {
        self.interned.len()
    }

    /// Returns the node with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if the id is not in the arena.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(Error::InvalidNode(id))
    }

    /// Returns the value produced by the node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] for unknown ids and [`Error::NotAValue`] for nodes
    /// that produce no value.
    pub fn value(&self, id: NodeId) -> Result<&Value> {
        self.get(id)?.as_value().ok_or(Error::NotAValue(id))
    }

    /// Returns the static type of the value produced by the node.
    ///
    /// # Errors
    ///
    /// Same as [`NodeStore::value`].
    pub fn value_type(&self, id: NodeId) -> Result<&ValueType> {
        Ok(self.value(id)?.ty())
    }

    /// Returns the literal produced by the node, if it is a literal.
    #[must_use]
    pub fn literal(&self, id: NodeId) -> Option<&Literal> {
        self.value(id).ok().and_then(Value::as_literal)
    }

    /// Appends a node that is not interned and returns its new id.
    pub(crate) fn append(&self, node: Node) -> NodeId {
        NodeId::new(self.nodes.push(node))
    }

    /// Returns the canonical node for a pure value, appending it on first use.
    ///
    /// The provenance of the canonical node is that of its first construction.
    pub(crate) fn intern(&self, value: Value, provenance: Provenance) -> NodeId {
        if let Some(existing) = self.interned.get(&value) {
            return *existing;
        }
        match self.interned.entry(value) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let node = Node::new(NodeKind::Value(entry.key().clone()), None, provenance);
                let id = self.append(node);
                entry.insert(id);
                id
            }
        }
    }

    /// Looks up the canonical node of a pure value without creating it.
    #[must_use]
    pub fn lookup(&self, value: &Value) -> Option<NodeId> {
        self.interned.get(value).map(|entry| *entry)
    }

    /// Returns `true` if the value is provably not NaN: any non-float value, or a float
    /// literal that is not NaN.
    #[must_use]
    pub fn is_def_not_nan(&self, id: NodeId) -> bool {
        let Ok(value) = self.value(id) else {
            return false;
        };
        if !value.ty().is_float() {
            return true;
        }
        value.as_literal().is_some_and(|literal| !literal.is_nan())
    }

    /// Returns `true` if the value is provably NaN.
    #[must_use]
    pub fn is_def_nan(&self, id: NodeId) -> bool {
        self.literal(id).is_some_and(Literal::is_nan)
    }

    /// Returns `true` if both values are provably equal: the same canonical node, and not
    /// possibly NaN (NaN is unequal to itself).
    #[must_use]
    pub fn is_def_eq(&self, a: NodeId, b: NodeId) -> bool {
        a == b && self.is_def_not_nan(a)
    }

    /// Returns `true` if both values are provably different.
    #[must_use]
    pub fn is_def_ne(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let (Ok(left), Ok(right)) = (self.value(a), self.value(b)) else {
            return false;
        };
        let is_null = |value: &Value| value.as_literal().is_some_and(Literal::is_null);
        if (left.is_allocation() && (is_null(right) || right.is_allocation()))
            || (right.is_allocation() && is_null(left))
        {
            return true;
        }
        match (left.as_literal(), right.as_literal()) {
            (Some(Literal::Int { ty: lt, value: l }), Some(Literal::Int { ty: rt, value: r })) => {
                lt == rt && l != r
            }
            (Some(Literal::Bool(l)), Some(Literal::Bool(r))) => l != r,
            (Some(l @ Literal::Float { .. }), Some(r @ Literal::Float { .. })) => {
                match (l.as_float(), r.as_float()) {
                    (Some(l), Some(r)) => !l.is_nan() && !r.is_nan() && l != r,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Returns `true` if `a < b` provably holds.
    #[must_use]
    pub fn is_def_lt(&self, a: NodeId, b: NodeId) -> bool {
        self.compare_literals(a, b)
            .is_some_and(|ordering| ordering == std::cmp::Ordering::Less)
    }

    /// Returns `true` if `a > b` provably holds.
    #[must_use]
    pub fn is_def_gt(&self, a: NodeId, b: NodeId) -> bool {
        self.is_def_lt(b, a)
    }

    /// Returns `true` if `a <= b` provably holds.
    #[must_use]
    pub fn is_def_le(&self, a: NodeId, b: NodeId) -> bool {
        self.is_def_eq(a, b) || self.is_def_lt(a, b)
    }

    /// Returns `true` if `a >= b` provably holds.
    #[must_use]
    pub fn is_def_ge(&self, a: NodeId, b: NodeId) -> bool {
        self.is_def_eq(a, b) || self.is_def_gt(a, b)
    }

    fn compare_literals(&self, a: NodeId, b: NodeId) -> Option<std::cmp::Ordering> {
        let (left, right) = (self.literal(a)?, self.literal(b)?);
        match (left, right) {
            (Literal::Int { ty: lt, value: l }, Literal::Int { ty: rt, value: r }) if lt == rt => {
                match lt {
                    ValueType::Unsigned(_) => Some((*l as u64).cmp(&(*r as u64))),
                    _ => Some(l.cmp(r)),
                }
            }
            (Literal::Float { ty: lt, .. }, Literal::Float { ty: rt, .. }) if lt == rt => {
                left.as_float()?.partial_cmp(&right.as_float()?)
            }
            _ => None,
        }
    }

    /// Returns `true` if the node is an allocation whose class is `class_name`.
    #[must_use]
    pub fn is_allocation_of(&self, id: NodeId, class_name: &str) -> bool {
        matches!(
            self.value(id).map(Value::op),
            Ok(ValueOp::New(class)) if class.name() == class_name
        )
    }
}
