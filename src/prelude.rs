//! # aotgraph Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the aotgraph library. Import this module to get quick access to everything needed
//! to set up a session, build graphs and run passes.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all aotgraph operations
pub use crate::Error;

/// The result type used throughout aotgraph
pub use crate::Result;

// ================================================================================================
// Session
// ================================================================================================

/// Session configuration
pub use crate::config::{CompilerConfig, Cpu, TargetConfig};

/// Shared session state
pub use crate::context::CompilationContext;

/// Events and diagnostics
pub use crate::events::{Event, EventKind, EventLog, Location};

// ================================================================================================
// Program Model
// ================================================================================================

/// Classes, members and descriptors
pub use crate::types::{
    Annotation, BaseTypeDescriptor, ClassContext, ClassRegistry, ClassType,
    ClassTypeDescriptor, ElementKind, ExecutableElement, FieldElement, MethodDescriptor,
    Modifiers, TypeDescriptor,
};

/// Value types
pub use crate::types::{FunctionType, ReferenceType, ValueType};

// ================================================================================================
// Graph
// ================================================================================================

/// Nodes and their identities
pub use crate::graph::{Node, NodeId, NodeKind, NodeStore, Provenance};

/// Blocks and finished graphs
pub use crate::graph::{BasicBlock, BlockId, BlockLabel, Graph};

/// Node payloads
pub use crate::graph::{
    AccessMode, Action, BinaryOp, CallFlags, CastKind, DispatchKind, Literal, Terminator,
    UnaryOp, Value, ValueHandle, ValueOp,
};

/// Graph traversal
pub use crate::graph::{GraphPrinter, NodeVisitor};

// ================================================================================================
// Construction
// ================================================================================================

/// Builder trait, helpers and pipelines
pub use crate::builder::{
    build_block, BaseBuilder, BuilderPipeline, GraphBuilder, GraphBuilderExt, PassConstructor,
};

/// Builder passes
pub use crate::passes::{
    ConstantDefiningBuilder, ConstantProbe, InstanceOfCheckCastBuilder, MemberResolvingBuilder,
    NativeConstants, TargetLoweringBuilder,
};

// ================================================================================================
// Whole Program
// ================================================================================================

/// Scheduling and whole-program passes
pub use crate::compiler::{CompiledProgram, UnitScheduler, UnitTranslator, WholeProgramPass};

/// Type ids
pub use crate::passes::{TypeIdAssigner, TypeIdRange, TypeIds};
