// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # aotgraph
//!
//! The program graph of an ahead-of-time compiler for a managed, object-oriented bytecode
//! language, and the composable pipeline that builds and rewrites it.
//!
//! Every compiled method, constructor or class initializer (a *unit*) is turned into a
//! [`graph::Graph`]: basic blocks whose nodes are connected by two kinds of edges.
//! *Value dependencies* say which values an operation consumes; *ordering dependencies*
//! chain the side effects of a block into program order. Pure values are hash-consed, so
//! the same computation is represented by the same node everywhere in the session.
//!
//! ## Features
//!
//! - **Hash-consed values** - Structurally equal pure values share one node, across units and threads
//! - **Explicit ordering** - Side effects form a per-block dependency chain instead of an instruction list
//! - **Composable construction** - Rewriting passes are delegating builders stacked over a base builder
//! - **Parallel units** - Units compile concurrently against one shared, lock-free session context
//! - **Whole-program phase** - Program-wide passes run once every unit has been built
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use aotgraph::prelude::*;
//!
//! let ctx = Arc::new(CompilationContext::new(
//!     Arc::new(ClassRegistry::new()),
//!     CompilerConfig::default(),
//! ));
//! let element = Arc::new(ExecutableElement::method(
//!     "app/Math",
//!     "answer",
//!     MethodDescriptor::void(),
//!     ValueType::I32,
//!     Modifiers::STATIC,
//! ));
//!
//! let mut builder = BuilderPipeline::standard().build(&ctx, element);
//! builder.begin(&BlockLabel::new())?;
//! let six = builder.int_literal(ValueType::I32, 6)?;
//! let seven = builder.int_literal(ValueType::I32, 7)?;
//! let answer = builder.mul(six, seven)?;
//! builder.return_(Some(answer))?;
//!
//! let graph = builder.finish()?;
//! assert_eq!(graph.blocks().len(), 1);
//! # Ok::<(), aotgraph::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`types`] - Classes, members, descriptors and value types consumed by the graph
//! - [`graph`] - Nodes, blocks, labels, the node store and graph utilities
//! - [`builder`] - The builder trait, the base builder and pipelines of passes
//! - [`passes`] - Resolution, cast folding, native constants, lowering, type ids
//! - [`compiler`] - Parallel unit scheduling and whole-program passes
//! - [`context`] - The session state shared by all units
//! - [`config`] - Session and target configuration
//! - [`events`] - Rewrite events and diagnostics
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`] with the crate's [`Error`] type. Errors
//! describe malformed graph construction and fail the unit being built;
//! [`Error::BlockTerminated`] is the one control signal, raised when a pass ends the
//! current block early (see [`builder::build_block`]).
//!
//! ## Thread Safety
//!
//! [`context::CompilationContext`] is `Send + Sync` and meant to be shared through an
//! `Arc`. Builders are not: each unit is built by a single thread from start to finish.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use aotgraph::prelude::*;
///
/// let label = BlockLabel::new();
/// assert!(!label.is_resolved());
/// ```
pub mod prelude;

/// Graph construction through stacks of delegating builders.
pub mod builder;

/// Parallel compilation of units and whole-program passes.
pub mod compiler;

/// Session configuration and target properties.
pub mod config;

/// The shared session context.
pub mod context;

/// Rewrite events and diagnostics.
pub mod events;

/// The program graph data model.
///
/// Nodes live in a session-wide [`graph::NodeStore`] and are addressed by
/// [`graph::NodeId`]. A [`graph::Graph`] is the finished graph of one unit: its blocks in
/// the order they were sealed and the nodes built for it.
pub mod graph;

/// Builder passes and whole-program passes.
pub mod passes;

/// The class and member model consumed by graph construction.
pub mod types;

/// `aotgraph` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `aotgraph` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the
/// individual variants.
pub use error::Error;
