//! The program graph.
//!
//! The graph is the intermediate representation every later compilation stage consumes.
//! It is a set of immutable nodes connected by explicit, typed dependency edges and
//! grouped into basic blocks:
//!
//! ```text
//!   entry ──▶ load ──▶ store ──▶ invoke ──▶ try
//!    (ordering chain: side effects in program order)    │
//!             ▲          ▲                              ├─ 0: resume block
//!             │ value    │ value                        └─ 1: handler block
//!           param      add(param, 1)
//! ```
//!
//! # Key Components
//!
//! - [`Node`] / [`NodeId`] - Immutable nodes in the session arena and their stable ids
//! - [`Value`] / [`ValueOp`] - Typed, hash-consable computations
//! - [`Action`] - Side-effecting operations without a result
//! - [`Terminator`] - Block-ending control transfers, including [`Terminator::Try`]
//! - [`BlockLabel`] / [`BasicBlock`] / [`BlockId`] - Forward-referenceable blocks
//! - [`NodeStore`] - The arena and the hash-consing table
//! - [`Graph`] - The finished graph of one unit
//! - [`NodeVisitor`] / [`GraphPrinter`] - Match-based traversal
//!
//! Nodes are never created directly; the [`builder`](crate::builder) pipeline is the
//! only way to append them.

mod action;
mod block;
mod label;
mod node;
mod store;
mod terminator;
mod unit;
mod value;
mod visitor;

pub use action::Action;
pub use block::{BasicBlock, BlockId};
pub use label::BlockLabel;
pub use node::{Node, NodeId, NodeKind, Provenance};
pub use store::NodeStore;
pub use terminator::Terminator;
pub use unit::Graph;
pub use value::{
    AccessMode, BinaryOp, CallFlags, CastKind, DispatchKind, Literal, UnaryOp, Value, ValueHandle,
    ValueOp,
};
pub use visitor::{GraphPrinter, NodeVisitor, PrintState};
