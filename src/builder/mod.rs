//! The graph construction surface and its delegation mechanism.
//!
//! [`GraphBuilder`] is the only way nodes enter a graph. A compilation unit is built by a
//! stack of builders: zero or more rewriting passes on top of a [`BaseBuilder`] that
//! validates and appends. Each pass holds exactly one inner builder, its *delegate*, and
//! every trait method defaults to forwarding the call to the delegate unchanged. A pass
//! overrides only the operations it rewrites:
//!
//! ```rust,ignore
//! impl GraphBuilder for NegateLowering {
//!     fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
//!         Some(self.next.as_mut())
//!     }
//!
//!     fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId> {
//!         if op != UnaryOp::Negate {
//!             return self.next("unary")?.unary(op, input);
//!         }
//!         let zero = self.literal(Literal::int(ValueType::I32, 0))?;
//!         self.sub(zero, input)
//!     }
//! }
//! ```
//!
//! Inside an override, `self.next(..)?.op(..)` continues below the pass, while
//! `self.op(..)` re-enters the pass itself (and anything it overrides). A pass never sees
//! the passes above it.
//!
//! # Early termination
//!
//! A pass that ends the current block on its own (for example by throwing a linkage
//! error in place of an unresolvable invocation) returns
//! [`Error::BlockTerminated`](crate::Error::BlockTerminated). The signal propagates to
//! the translator, which must stop building that block; [`build_block`] does this.

mod base;
mod pipeline;

pub use base::BaseBuilder;
pub use pipeline::{BuilderPipeline, PassConstructor};

use std::sync::Arc;

use crate::{
    events::Location,
    graph::{
        AccessMode, BinaryOp, BlockId, BlockLabel, CallFlags, CastKind, DispatchKind, Graph,
        Literal, NodeId, UnaryOp, ValueHandle,
    },
    types::{
        ClassType, ClassTypeDescriptor, ExecutableElement, MethodDescriptor, ReferenceType,
        TypeDescriptor, ValueType,
    },
    Error, Result,
};

/// The graph construction interface.
///
/// Every operation except [`GraphBuilder::delegate`] has a default implementation that
/// forwards to the delegate. A builder without a delegate must override every operation
/// it supports; the others fail with [`Error::NoDelegate`].
///
/// Value operations return the id of the (possibly pre-existing, interned) value node.
/// Actions return the id of the action node. Terminators return the id of the block they
/// sealed.
pub trait GraphBuilder {
    /// The builder this one forwards to, `None` for the base of a stack.
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder>;

    /// The delegate, or [`Error::NoDelegate`] naming the operation that needed it.
    fn next(&mut self, op: &'static str) -> Result<&mut dyn GraphBuilder> {
        self.delegate().ok_or(Error::NoDelegate(op))
    }

    // ── Context ─────────────────────────────────────────────────────────

    /// The element the unit is built for.
    fn current_element(&mut self) -> Result<Arc<ExecutableElement>> {
        self.next("current_element")?.current_element()
    }

    /// The current source location, stamped on every appended node.
    fn location(&mut self) -> Result<Location> {
        self.next("location")?.location()
    }

    /// Sets the source line and bytecode index for subsequently appended nodes.
    fn set_location(&mut self, line: u32, bci: i32) -> Result<()> {
        self.next("set_location")?.set_location(line, bci)
    }

    /// Sets the originating call site for subsequently appended nodes.
    fn set_call_site(&mut self, call_site: Option<NodeId>) -> Result<()> {
        self.next("set_call_site")?.set_call_site(call_site)
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// Begins the block named by `label` and returns its entry node.
    fn begin(&mut self, label: &BlockLabel) -> Result<NodeId> {
        self.next("begin")?.begin(label)
    }

    /// Completes the unit and returns its graph.
    fn finish(&mut self) -> Result<Graph> {
        self.next("finish")?.finish()
    }

    // ── Values ──────────────────────────────────────────────────────────

    /// A literal constant.
    fn literal(&mut self, literal: Literal) -> Result<NodeId> {
        self.next("literal")?.literal(literal)
    }

    /// The `index`-th parameter of the unit.
    fn parameter(&mut self, index: u32, ty: ValueType) -> Result<NodeId> {
        self.next("parameter")?.parameter(index, ty)
    }

    /// A binary operation; commutative operands are put in canonical order.
    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.next("binary")?.binary(op, lhs, rhs)
    }

    /// A unary operation.
    fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId> {
        self.next("unary")?.unary(op, input)
    }

    /// Selects `if_true` or `if_false` without control flow.
    fn select(&mut self, condition: NodeId, if_true: NodeId, if_false: NodeId) -> Result<NodeId> {
        self.next("select")?.select(condition, if_true, if_false)
    }

    /// Converts `input` to `ty`.
    fn cast(&mut self, kind: CastKind, input: NodeId, ty: ValueType) -> Result<NodeId> {
        self.next("cast")?.cast(kind, input, ty)
    }

    /// Reference narrowing that needs no runtime check.
    fn narrow(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        self.next("narrow")?.narrow(input, target)
    }

    /// Tests whether `input` is an instance of `target`.
    fn instance_of(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        self.next("instance_of")?.instance_of(input, target)
    }

    /// Casts `input` to `target`, raising on failure.
    fn check_cast(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        self.next("check_cast")?.check_cast(input, target)
    }

    /// Allocates an instance of `class`.
    fn new_(&mut self, class: Arc<ClassType>) -> Result<NodeId> {
        self.next("new")?.new_(class)
    }

    /// Allocates an array of the given (array) reference type.
    fn new_array(&mut self, array_type: ReferenceType, length: NodeId) -> Result<NodeId> {
        self.next("new_array")?.new_array(array_type, length)
    }

    /// Reads the location named by `handle`.
    fn load(&mut self, handle: ValueHandle, mode: AccessMode) -> Result<NodeId> {
        self.next("load")?.load(handle, mode)
    }

    /// Calls a native function pointer or symbol.
    fn call_function(
        &mut self,
        function: NodeId,
        args: Vec<NodeId>,
        flags: CallFlags,
    ) -> Result<NodeId> {
        self.next("call_function")?.call_function(function, args, flags)
    }

    /// Invokes a static method and returns its result.
    fn invoke_value_static(
        &mut self,
        target: Arc<ExecutableElement>,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_value_static")?
            .invoke_value_static(target, args)
    }

    /// Invokes an instance method and returns its result.
    fn invoke_value_instance(
        &mut self,
        kind: DispatchKind,
        target: Arc<ExecutableElement>,
        receiver: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_value_instance")?
            .invoke_value_instance(kind, target, receiver, args)
    }

    /// Runs a constructor on `receiver` and returns the initialized object.
    fn invoke_constructor(
        &mut self,
        receiver: NodeId,
        target: Arc<ExecutableElement>,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_constructor")?
            .invoke_constructor(receiver, target, args)
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Writes `value` to the location named by `handle`.
    fn store(&mut self, handle: ValueHandle, value: NodeId, mode: AccessMode) -> Result<NodeId> {
        self.next("store")?.store(handle, value, mode)
    }

    /// A memory fence.
    fn fence(&mut self, mode: AccessMode) -> Result<NodeId> {
        self.next("fence")?.fence(mode)
    }

    /// Acquires the monitor of `object`.
    fn monitor_enter(&mut self, object: NodeId) -> Result<NodeId> {
        self.next("monitor_enter")?.monitor_enter(object)
    }

    /// Releases the monitor of `object`.
    fn monitor_exit(&mut self, object: NodeId) -> Result<NodeId> {
        self.next("monitor_exit")?.monitor_exit(object)
    }

    /// Invokes a static method for its side effects.
    fn invoke_static(&mut self, target: Arc<ExecutableElement>, args: Vec<NodeId>) -> Result<NodeId> {
        self.next("invoke_static")?.invoke_static(target, args)
    }

    /// Invokes an instance method for its side effects.
    fn invoke_instance(
        &mut self,
        kind: DispatchKind,
        target: Arc<ExecutableElement>,
        receiver: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_instance")?
            .invoke_instance(kind, target, receiver, args)
    }

    /// Returns the current head of the ordering chain without appending anything.
    ///
    /// Passes return it in place of an action they suppress.
    fn nop(&mut self) -> Result<NodeId> {
        self.next("nop")?.nop()
    }

    // ── Terminators ─────────────────────────────────────────────────────

    /// Ends the block with an unconditional jump.
    fn goto(&mut self, target: &BlockLabel) -> Result<BlockId> {
        self.next("goto")?.goto(target)
    }

    /// Ends the block with a two-way branch.
    fn if_(&mut self, condition: NodeId, if_true: &BlockLabel, if_false: &BlockLabel) -> Result<BlockId> {
        self.next("if")?.if_(condition, if_true, if_false)
    }

    /// Ends the block with a multi-way branch; `keys` and `targets` are parallel.
    fn switch(
        &mut self,
        value: NodeId,
        keys: Vec<i64>,
        targets: Vec<BlockLabel>,
        default: &BlockLabel,
    ) -> Result<BlockId> {
        self.next("switch")?.switch(value, keys, targets, default)
    }

    /// Ends the block by returning from the unit.
    fn return_(&mut self, value: Option<NodeId>) -> Result<BlockId> {
        self.next("return")?.return_(value)
    }

    /// Ends the block by raising `exception`.
    fn throw(&mut self, exception: NodeId) -> Result<BlockId> {
        self.next("throw")?.throw(exception)
    }

    /// Wraps the triable `operation`, which must be the current ordering-chain head.
    fn try_(&mut self, operation: NodeId, resume: &BlockLabel, handler: &BlockLabel) -> Result<BlockId> {
        self.next("try")?.try_(operation, resume, handler)
    }

    /// Ends a block that control never leaves.
    fn unreachable(&mut self) -> Result<BlockId> {
        self.next("unreachable")?.unreachable()
    }

    // ── Symbolic references ─────────────────────────────────────────────

    /// Allocates an instance of a class named by descriptor.
    fn new_symbolic(&mut self, class: &ClassTypeDescriptor) -> Result<NodeId> {
        self.next("new_symbolic")?.new_symbolic(class)
    }

    /// Invokes a static method named by descriptor.
    ///
    /// Once resolved, a method returning `void` becomes an action; any other method
    /// becomes a value.
    fn invoke_static_symbolic(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &MethodDescriptor,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_static_symbolic")?
            .invoke_static_symbolic(owner, name, descriptor, args)
    }

    /// Invokes an instance method named by descriptor, with the same result rule as
    /// [`GraphBuilder::invoke_static_symbolic`].
    fn invoke_instance_symbolic(
        &mut self,
        kind: DispatchKind,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &MethodDescriptor,
        receiver: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_instance_symbolic")?
            .invoke_instance_symbolic(kind, owner, name, descriptor, receiver, args)
    }

    /// Runs a constructor named by descriptor.
    fn invoke_constructor_symbolic(
        &mut self,
        receiver: NodeId,
        owner: &TypeDescriptor,
        descriptor: &MethodDescriptor,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.next("invoke_constructor_symbolic")?
            .invoke_constructor_symbolic(receiver, owner, descriptor, args)
    }

    /// Names a static field by descriptor.
    fn static_field_symbolic(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> Result<ValueHandle> {
        self.next("static_field_symbolic")?
            .static_field_symbolic(owner, name, descriptor)
    }

    /// Names an instance field by descriptor.
    fn instance_field_symbolic(
        &mut self,
        instance: NodeId,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> Result<ValueHandle> {
        self.next("instance_field_symbolic")?
            .instance_field_symbolic(instance, owner, name, descriptor)
    }

    /// Casts to a type named by descriptor.
    fn check_cast_symbolic(&mut self, input: NodeId, target: &TypeDescriptor) -> Result<NodeId> {
        self.next("check_cast_symbolic")?
            .check_cast_symbolic(input, target)
    }

    /// Tests against a type named by descriptor.
    fn instance_of_symbolic(&mut self, input: NodeId, target: &TypeDescriptor) -> Result<NodeId> {
        self.next("instance_of_symbolic")?
            .instance_of_symbolic(input, target)
    }
}

/// Shorthands over [`GraphBuilder`], available on every builder and on `dyn GraphBuilder`.
pub trait GraphBuilderExt: GraphBuilder {
    /// `lhs + rhs`
    fn add(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    /// `lhs - rhs`
    fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    /// `lhs * rhs`
    fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    /// `lhs == rhs`
    fn is_eq(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::CmpEq, lhs, rhs)
    }

    /// `lhs != rhs`
    fn is_ne(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::CmpNe, lhs, rhs)
    }

    /// `lhs < rhs`
    fn is_lt(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::CmpLt, lhs, rhs)
    }

    /// `lhs > rhs`
    fn is_gt(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::CmpGt, lhs, rhs)
    }

    /// `min(lhs, rhs)`
    fn min(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::Min, lhs, rhs)
    }

    /// `max(lhs, rhs)`
    fn max(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.binary(BinaryOp::Max, lhs, rhs)
    }

    /// `-input`
    fn negate(&mut self, input: NodeId) -> Result<NodeId> {
        self.unary(UnaryOp::Negate, input)
    }

    /// An integer literal.
    fn int_literal(&mut self, ty: ValueType, value: i64) -> Result<NodeId> {
        self.literal(Literal::int(ty, value))
    }

    /// A boolean literal.
    fn bool_literal(&mut self, value: bool) -> Result<NodeId> {
        self.literal(Literal::Bool(value))
    }

    /// The null literal of a reference type.
    fn null_literal(&mut self, target: ReferenceType) -> Result<NodeId> {
        self.literal(Literal::Null(ValueType::Reference(target.as_nullable())))
    }
}

impl<T: GraphBuilder + ?Sized> GraphBuilderExt for T {}

/// Builds one block: begins `label`, runs `body`, and absorbs early termination.
///
/// `body` is expected to end the block with a terminator. If an operation inside `body`
/// returns [`Error::BlockTerminated`], the block was already sealed by a pass and the
/// remaining source instructions are skipped.
///
/// # Errors
///
/// Returns any error from `begin` or `body` other than the early-termination signal.
pub fn build_block<F>(builder: &mut dyn GraphBuilder, label: &BlockLabel, body: F) -> Result<()>
where
    F: FnOnce(&mut dyn GraphBuilder) -> Result<()>,
{
    builder.begin(label)?;
    match body(builder) {
        Err(Error::BlockTerminated(_)) | Ok(()) => Ok(()),
        Err(e) => Err(e),
    }
}
