//! The innermost builder: validates every call and appends nodes to the session store.

use std::{
    collections::{HashMap, HashSet},
    mem,
    sync::Arc,
};

use crate::{
    builder::GraphBuilder,
    context::CompilationContext,
    events::Location,
    graph::{
        AccessMode, Action, BasicBlock, BinaryOp, BlockId, BlockLabel, CallFlags, CastKind,
        DispatchKind, Graph, Literal, Node, NodeId, NodeKind, Provenance, Terminator, UnaryOp,
        Value, ValueHandle, ValueOp,
    },
    types::{
        ClassType, ClassTypeDescriptor, ExecutableElement, MethodDescriptor, ReferenceType,
        TypeDescriptor, ValueType,
    },
    Error, Result,
};

/// Construction state of the unit.
#[derive(Debug)]
enum State {
    /// A block is open; `head` is the tail of its ordering chain.
    Building {
        label: BlockLabel,
        entry: NodeId,
        head: NodeId,
    },
    /// No block is open.
    Sealed,
    /// `finish` succeeded.
    Complete,
}

/// The base of every builder stack.
///
/// Pure values are interned in the session's [`NodeStore`](crate::graph::NodeStore).
/// Values with identity and all actions are appended fresh and linked into the ordering
/// chain of the open block. A terminator seals the block and binds its label to the next
/// [`BlockId`], so the first block sealed is [`BlockId::ENTRY`].
///
/// Symbolic operations are rejected with [`Error::UnresolvedReference`]; a resolving pass
/// must rewrite them before they reach this builder.
pub struct BaseBuilder {
    context: Arc<CompilationContext>,
    element: Arc<ExecutableElement>,
    state: State,
    blocks: Vec<BasicBlock>,
    nodes: Vec<NodeId>,
    seen: HashSet<NodeId>,
    successors: Vec<BlockLabel>,
    parameters: HashMap<u32, NodeId>,
    line: u32,
    bci: i32,
    call_site: Option<NodeId>,
}

impl BaseBuilder {
    /// Creates the base builder for one unit.
    #[must_use]
    pub fn new(context: Arc<CompilationContext>, element: Arc<ExecutableElement>) -> Self {
        Self {
            context,
            element,
            state: State::Sealed,
            blocks: Vec::new(),
            nodes: Vec::new(),
            seen: HashSet::new(),
            successors: Vec::new(),
            parameters: HashMap::new(),
            line: 0,
            bci: -1,
            call_site: None,
        }
    }

    fn provenance(&self) -> Provenance {
        Provenance {
            element: self.element.clone(),
            line: self.line,
            bci: self.bci,
            call_site: self.call_site,
        }
    }

    fn head(&self) -> Result<NodeId> {
        match &self.state {
            State::Building { head, .. } => Ok(*head),
            State::Sealed | State::Complete => Err(Error::NoCurrentBlock),
        }
    }

    fn set_head(&mut self, id: NodeId) {
        if let State::Building { head, .. } = &mut self.state {
            *head = id;
        }
    }

    fn record(&mut self, id: NodeId) {
        if self.seen.insert(id) {
            self.nodes.push(id);
        }
    }

    fn value_type(&self, id: NodeId) -> Result<ValueType> {
        Ok(self.context.store().value_type(id)?.clone())
    }

    fn check_values(&self, ids: &[NodeId]) -> Result<()> {
        let store = self.context.store();
        for id in ids {
            store.value(*id)?;
        }
        Ok(())
    }

    fn append_value(&mut self, value: Value) -> Result<NodeId> {
        let head = self.head()?;
        let mut operands = Vec::new();
        value.push_dependencies(&mut operands);
        self.check_values(&operands)?;

        let provenance = self.provenance();
        let ordered = value.is_ordered();
        let store = self.context.store();
        let id = if ordered {
            store.append(Node::new(NodeKind::Value(value), Some(head), provenance))
        } else if value.has_identity() {
            store.append(Node::new(NodeKind::Value(value), None, provenance))
        } else {
            store.intern(value, provenance)
        };
        if ordered {
            self.set_head(id);
        }
        self.record(id);
        Ok(id)
    }

    fn append_action(&mut self, action: Action) -> Result<NodeId> {
        let head = self.head()?;
        let mut operands = Vec::new();
        action.push_dependencies(&mut operands);
        self.check_values(&operands)?;

        let node = Node::new(NodeKind::Action(action), Some(head), self.provenance());
        let id = self.context.store().append(node);
        self.set_head(id);
        self.record(id);
        Ok(id)
    }

    fn seal(&mut self, terminator: Terminator) -> Result<BlockId> {
        let State::Building { label, entry, head } = &self.state else {
            return Err(Error::NoCurrentBlock);
        };
        let (label, entry, head) = (label.clone(), *entry, *head);

        let mut operands = Vec::new();
        terminator.push_dependencies(&mut operands);
        self.check_values(&operands)?;

        let block = BlockId::new(self.blocks.len());
        label.resolve(block)?;
        self.successors.extend(terminator.successors().cloned());

        let node = Node::new(NodeKind::Terminator(terminator), Some(head), self.provenance());
        let id = self.context.store().append(node);
        self.record(id);
        self.blocks.push(BasicBlock::new(label, entry, id));
        self.state = State::Sealed;
        Ok(block)
    }

    fn return_type_of(&self, function: NodeId) -> Result<ValueType> {
        match self.value_type(function)? {
            ValueType::Function(function) => Ok(function.ret.clone()),
            ValueType::Pointer(pointee) => match *pointee {
                ValueType::Function(function) => Ok(function.ret),
                other => Err(malformed_error!("Call through non-function pointer {}*", other)),
            },
            other => Err(malformed_error!("Call of non-function value of type {}", other)),
        }
    }
}

impl GraphBuilder for BaseBuilder {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        None
    }

    fn current_element(&mut self) -> Result<Arc<ExecutableElement>> {
        Ok(self.element.clone())
    }

    fn location(&mut self) -> Result<Location> {
        Ok(Location {
            element: self.element.clone(),
            line: self.line,
            bci: self.bci,
        })
    }

    fn set_location(&mut self, line: u32, bci: i32) -> Result<()> {
        self.line = line;
        self.bci = bci;
        Ok(())
    }

    fn set_call_site(&mut self, call_site: Option<NodeId>) -> Result<()> {
        self.call_site = call_site;
        Ok(())
    }

    fn begin(&mut self, label: &BlockLabel) -> Result<NodeId> {
        match &self.state {
            State::Building { label: open, .. } => return Err(Error::BlockInProgress(open.serial())),
            State::Complete => return Err(malformed_error!("Unit {} is already complete", self.element)),
            State::Sealed => {}
        }
        if label.is_resolved() {
            return Err(Error::LabelAlreadyResolved(label.serial()));
        }

        let node = Node::new(NodeKind::Entry(label.clone()), None, self.provenance());
        let entry = self.context.store().append(node);
        self.record(entry);
        self.state = State::Building {
            label: label.clone(),
            entry,
            head: entry,
        };
        Ok(entry)
    }

    fn finish(&mut self) -> Result<Graph> {
        match &self.state {
            State::Building { label, .. } => return Err(Error::BlockInProgress(label.serial())),
            State::Complete => return Err(malformed_error!("Unit {} is already complete", self.element)),
            State::Sealed => {}
        }
        if self.blocks.is_empty() {
            return Err(Error::IncompleteUnit(format!("{} has no blocks", self.element)));
        }
        if let Some(dangling) = self.successors.iter().find(|label| !label.is_resolved()) {
            return Err(Error::IncompleteUnit(format!(
                "{} branches to {} which was never built",
                self.element, dangling
            )));
        }

        self.state = State::Complete;
        self.seen.clear();
        self.successors.clear();
        Ok(Graph::new(
            self.element.clone(),
            mem::take(&mut self.blocks),
            mem::take(&mut self.nodes),
        ))
    }

    // ── Values ──────────────────────────────────────────────────────────

    fn literal(&mut self, literal: Literal) -> Result<NodeId> {
        self.append_value(Value::literal(literal))
    }

    fn parameter(&mut self, index: u32, ty: ValueType) -> Result<NodeId> {
        self.head()?;
        if let Some(existing) = self.parameters.get(&index) {
            if self.context.store().value_type(*existing)? != &ty {
                return Err(malformed_error!(
                    "Parameter {} of {} requested with conflicting types",
                    index,
                    self.element
                ));
            }
            return Ok(*existing);
        }
        let id = self.append_value(Value::new(ValueOp::Parameter(index), ty))?;
        self.parameters.insert(index, id);
        Ok(id)
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let (lhs, rhs) = if op.is_commutative() && rhs < lhs {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };
        self.check_values(&[lhs, rhs])?;
        let ty = if op.is_comparison() {
            ValueType::Bool
        } else {
            self.value_type(lhs)?
        };
        self.append_value(Value::new(ValueOp::Binary { op, lhs, rhs }, ty))
    }

    fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId> {
        let ty = self.value_type(input)?;
        self.append_value(Value::new(ValueOp::Unary { op, input }, ty))
    }

    fn select(&mut self, condition: NodeId, if_true: NodeId, if_false: NodeId) -> Result<NodeId> {
        let ty = self.value_type(if_true)?;
        self.append_value(Value::new(
            ValueOp::Select {
                condition,
                if_true,
                if_false,
            },
            ty,
        ))
    }

    fn cast(&mut self, kind: CastKind, input: NodeId, ty: ValueType) -> Result<NodeId> {
        self.append_value(Value::new(ValueOp::Cast { kind, input }, ty))
    }

    fn narrow(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        let nullable = self
            .value_type(input)?
            .as_reference()
            .is_some_and(ReferenceType::is_nullable);
        let target = if nullable { target.as_nullable() } else { target };
        self.append_value(Value::new(
            ValueOp::Cast {
                kind: CastKind::Narrow,
                input,
            },
            ValueType::Reference(target),
        ))
    }

    fn instance_of(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        self.append_value(Value::new(
            ValueOp::InstanceOf { input, target },
            ValueType::Bool,
        ))
    }

    fn check_cast(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        let nullable = self
            .value_type(input)?
            .as_reference()
            .map_or(true, ReferenceType::is_nullable);
        let ty = if nullable {
            target.as_nullable()
        } else {
            target.clone()
        };
        self.append_value(Value::new(
            ValueOp::CheckCast { input, target },
            ValueType::Reference(ty),
        ))
    }

    fn new_(&mut self, class: Arc<ClassType>) -> Result<NodeId> {
        let ty = ValueType::reference(class.clone());
        self.append_value(Value::new(ValueOp::New(class), ty))
    }

    fn new_array(&mut self, array_type: ReferenceType, length: NodeId) -> Result<NodeId> {
        if array_type.dimensions() == 0 {
            return Err(malformed_error!(
                "Array allocation of non-array type {}",
                array_type
            ));
        }
        self.append_value(Value::new(
            ValueOp::NewArray { length },
            ValueType::Reference(array_type),
        ))
    }

    fn load(&mut self, handle: ValueHandle, mode: AccessMode) -> Result<NodeId> {
        let ty = handle.value_type().clone();
        self.append_value(Value::new(ValueOp::Load { handle, mode }, ty))
    }

    fn call_function(
        &mut self,
        function: NodeId,
        args: Vec<NodeId>,
        flags: CallFlags,
    ) -> Result<NodeId> {
        let ty = self.return_type_of(function)?;
        self.append_value(Value::new(
            ValueOp::CallFunction {
                function,
                args,
                flags,
            },
            ty,
        ))
    }

    fn invoke_value_static(
        &mut self,
        target: Arc<ExecutableElement>,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        let ty = target.return_type().clone();
        self.append_value(Value::new(ValueOp::InvokeStatic { target, args }, ty))
    }

    fn invoke_value_instance(
        &mut self,
        kind: DispatchKind,
        target: Arc<ExecutableElement>,
        receiver: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        let ty = target.return_type().clone();
        self.append_value(Value::new(
            ValueOp::InvokeInstance {
                kind,
                target,
                receiver,
                args,
            },
            ty,
        ))
    }

    fn invoke_constructor(
        &mut self,
        receiver: NodeId,
        target: Arc<ExecutableElement>,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        let ty = self.value_type(receiver)?;
        self.append_value(Value::new(
            ValueOp::InvokeConstructor {
                target,
                receiver,
                args,
            },
            ty,
        ))
    }

    // ── Actions ─────────────────────────────────────────────────────────

    fn store(&mut self, handle: ValueHandle, value: NodeId, mode: AccessMode) -> Result<NodeId> {
        self.append_action(Action::Store {
            handle,
            value,
            mode,
        })
    }

    fn fence(&mut self, mode: AccessMode) -> Result<NodeId> {
        self.append_action(Action::Fence(mode))
    }

    fn monitor_enter(&mut self, object: NodeId) -> Result<NodeId> {
        self.append_action(Action::MonitorEnter(object))
    }

    fn monitor_exit(&mut self, object: NodeId) -> Result<NodeId> {
        self.append_action(Action::MonitorExit(object))
    }

    fn invoke_static(&mut self, target: Arc<ExecutableElement>, args: Vec<NodeId>) -> Result<NodeId> {
        self.append_action(Action::InvokeStatic { target, args })
    }

    fn invoke_instance(
        &mut self,
        kind: DispatchKind,
        target: Arc<ExecutableElement>,
        receiver: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.append_action(Action::InvokeInstance {
            kind,
            target,
            receiver,
            args,
        })
    }

    fn nop(&mut self) -> Result<NodeId> {
        self.head()
    }

    // ── Terminators ─────────────────────────────────────────────────────

    fn goto(&mut self, target: &BlockLabel) -> Result<BlockId> {
        self.seal(Terminator::Goto(target.clone()))
    }

    fn if_(&mut self, condition: NodeId, if_true: &BlockLabel, if_false: &BlockLabel) -> Result<BlockId> {
        self.seal(Terminator::If {
            condition,
            if_true: if_true.clone(),
            if_false: if_false.clone(),
        })
    }

    fn switch(
        &mut self,
        value: NodeId,
        keys: Vec<i64>,
        targets: Vec<BlockLabel>,
        default: &BlockLabel,
    ) -> Result<BlockId> {
        if keys.len() != targets.len() {
            return Err(malformed_error!(
                "Switch has {} keys but {} targets",
                keys.len(),
                targets.len()
            ));
        }
        self.seal(Terminator::Switch {
            value,
            keys,
            targets,
            default: default.clone(),
        })
    }

    fn return_(&mut self, value: Option<NodeId>) -> Result<BlockId> {
        self.seal(Terminator::Return(value))
    }

    fn throw(&mut self, exception: NodeId) -> Result<BlockId> {
        self.seal(Terminator::Throw(exception))
    }

    fn try_(&mut self, operation: NodeId, resume: &BlockLabel, handler: &BlockLabel) -> Result<BlockId> {
        if self.head()? != operation || !self.context.store().get(operation)?.is_triable() {
            return Err(Error::NotTriable(operation));
        }
        self.seal(Terminator::Try {
            operation,
            resume: resume.clone(),
            handler: handler.clone(),
        })
    }

    fn unreachable(&mut self) -> Result<BlockId> {
        self.seal(Terminator::Unreachable)
    }

    // ── Symbolic references ─────────────────────────────────────────────

    fn new_symbolic(&mut self, class: &ClassTypeDescriptor) -> Result<NodeId> {
        Err(Error::UnresolvedReference(class.internal_name()))
    }

    fn invoke_static_symbolic(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        _descriptor: &MethodDescriptor,
        _args: Vec<NodeId>,
    ) -> Result<NodeId> {
        Err(Error::UnresolvedReference(format!("{owner}.{name}")))
    }

    fn invoke_instance_symbolic(
        &mut self,
        _kind: DispatchKind,
        owner: &TypeDescriptor,
        name: &str,
        _descriptor: &MethodDescriptor,
        _receiver: NodeId,
        _args: Vec<NodeId>,
    ) -> Result<NodeId> {
        Err(Error::UnresolvedReference(format!("{owner}.{name}")))
    }

    fn invoke_constructor_symbolic(
        &mut self,
        _receiver: NodeId,
        owner: &TypeDescriptor,
        _descriptor: &MethodDescriptor,
        _args: Vec<NodeId>,
    ) -> Result<NodeId> {
        Err(Error::UnresolvedReference(format!("{owner}.<init>")))
    }

    fn static_field_symbolic(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        _descriptor: &TypeDescriptor,
    ) -> Result<ValueHandle> {
        Err(Error::UnresolvedReference(format!("{owner}.{name}")))
    }

    fn instance_field_symbolic(
        &mut self,
        _instance: NodeId,
        owner: &TypeDescriptor,
        name: &str,
        _descriptor: &TypeDescriptor,
    ) -> Result<ValueHandle> {
        Err(Error::UnresolvedReference(format!("{owner}.{name}")))
    }

    fn check_cast_symbolic(&mut self, _input: NodeId, target: &TypeDescriptor) -> Result<NodeId> {
        Err(Error::UnresolvedReference(target.to_string()))
    }

    fn instance_of_symbolic(&mut self, _input: NodeId, target: &TypeDescriptor) -> Result<NodeId> {
        Err(Error::UnresolvedReference(target.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{build_block, GraphBuilderExt},
        config::CompilerConfig,
        types::{ClassRegistry, Modifiers},
    };

    fn context() -> Arc<CompilationContext> {
        Arc::new(CompilationContext::new(
            Arc::new(ClassRegistry::new()),
            CompilerConfig::default(),
        ))
    }

    fn element() -> Arc<ExecutableElement> {
        Arc::new(ExecutableElement::method(
            "app/Main",
            "run",
            MethodDescriptor::void(),
            ValueType::Void,
            Modifiers::STATIC,
        ))
    }

    fn builder(ctx: &Arc<CompilationContext>) -> BaseBuilder {
        BaseBuilder::new(ctx.clone(), element())
    }

    fn side_effect() -> Arc<ExecutableElement> {
        Arc::new(ExecutableElement::method(
            "app/Main",
            "log",
            MethodDescriptor::void(),
            ValueType::Void,
            Modifiers::STATIC,
        ))
    }

    #[test]
    fn test_append_without_block_fails() {
        let ctx = context();
        let mut b = builder(&ctx);
        assert_eq!(b.literal(Literal::Bool(true)), Err(Error::NoCurrentBlock));
        assert_eq!(b.return_(None), Err(Error::NoCurrentBlock));
    }

    #[test]
    fn test_append_after_seal_fails() {
        let ctx = context();
        let mut b = builder(&ctx);
        b.begin(&BlockLabel::new()).unwrap();
        b.return_(None).unwrap();
        assert_eq!(b.fence(AccessMode::SeqCst), Err(Error::NoCurrentBlock));
        assert_eq!(b.nop(), Err(Error::NoCurrentBlock));
    }

    #[test]
    fn test_double_begin_fails() {
        let ctx = context();
        let mut b = builder(&ctx);
        let first = BlockLabel::new();
        b.begin(&first).unwrap();
        assert_eq!(
            b.begin(&BlockLabel::new()),
            Err(Error::BlockInProgress(first.serial()))
        );
    }

    #[test]
    fn test_begin_resolved_label_fails() {
        let ctx = context();
        let mut b = builder(&ctx);
        let label = BlockLabel::new();
        b.begin(&label).unwrap();
        b.return_(None).unwrap();
        assert_eq!(b.begin(&label), Err(Error::LabelAlreadyResolved(label.serial())));
    }

    #[test]
    fn test_labels_resolve_in_seal_order() {
        let ctx = context();
        let mut b = builder(&ctx);
        let entry = BlockLabel::new();
        let next = BlockLabel::new();

        b.begin(&entry).unwrap();
        assert!(next.target().is_err());
        assert_eq!(b.goto(&next).unwrap(), BlockId::ENTRY);
        assert!(next.target().is_err());

        b.begin(&next).unwrap();
        let block = b.return_(None).unwrap();
        assert_eq!(next.target().unwrap(), block);

        let graph = b.finish().unwrap();
        assert_eq!(graph.blocks().len(), 2);
        assert_eq!(
            graph.successors(ctx.store(), BlockId::ENTRY).unwrap(),
            vec![block]
        );
    }

    #[test]
    fn test_commutative_operands_canonicalized() {
        let ctx = context();
        let mut b = builder(&ctx);
        b.begin(&BlockLabel::new()).unwrap();
        let x = b.parameter(0, ValueType::I32).unwrap();
        let y = b.parameter(1, ValueType::I32).unwrap();

        assert_eq!(b.add(x, y).unwrap(), b.add(y, x).unwrap());
        assert_ne!(b.sub(x, y).unwrap(), b.sub(y, x).unwrap());
        assert_eq!(
            b.binary(BinaryOp::CmpEq, y, x).unwrap(),
            b.is_eq(x, y).unwrap()
        );
    }

    #[test]
    fn test_parameters_cached_per_index() {
        let ctx = context();
        let mut b = builder(&ctx);
        let entry = b.begin(&BlockLabel::new()).unwrap();
        let first = b.parameter(0, ValueType::I64).unwrap();
        assert_eq!(b.parameter(0, ValueType::I64).unwrap(), first);
        assert!(b.parameter(0, ValueType::F32).is_err());

        // parameters take no part in the ordering chain
        assert_eq!(b.nop().unwrap(), entry);
        assert_eq!(ctx.store().get(first).unwrap().ordering_dependency_count(), 0);
    }

    #[test]
    fn test_allocations_are_distinct() {
        let ctx = context();
        let mut b = builder(&ctx);
        let class = ClassType::builder("app/Thing").build();
        b.begin(&BlockLabel::new()).unwrap();
        let first = b.new_(class.clone()).unwrap();
        let second = b.new_(class).unwrap();

        assert_ne!(first, second);
        assert!(!ctx.store().is_def_eq(first, second));
        assert!(ctx.store().is_def_ne(first, second));
        assert_eq!(b.nop().unwrap(), second);
        assert_eq!(
            ctx.store().get(second).unwrap().ordering_dependency(0).unwrap(),
            first
        );
    }

    #[test]
    fn test_try_reports_resume_and_handler() {
        let ctx = context();
        let mut b = builder(&ctx);
        let (resume, handler) = (BlockLabel::new(), BlockLabel::new());

        b.begin(&BlockLabel::new()).unwrap();
        let call = b.invoke_static(side_effect(), vec![]).unwrap();
        assert_eq!(b.try_(call, &resume, &handler).unwrap(), BlockId::ENTRY);

        // the handler label may be referenced before its block exists
        assert!(handler.target().is_err());
        b.begin(&resume).unwrap();
        b.return_(None).unwrap();
        b.begin(&handler).unwrap();
        b.unreachable().unwrap();
        assert_eq!(handler.target().unwrap(), BlockId::new(2));

        let graph = b.finish().unwrap();
        let node = ctx
            .store()
            .get(graph.block(BlockId::ENTRY).unwrap().terminator())
            .unwrap();
        let terminator = node.as_terminator().unwrap();
        assert_eq!(terminator.successor_count(), 2);
        assert_eq!(terminator.successor(0).unwrap(), &resume);
        assert_eq!(terminator.successor(1).unwrap(), &handler);
        assert_eq!(node.ordering_dependency(0).unwrap(), call);
        assert_eq!(
            graph.successors(ctx.store(), BlockId::ENTRY).unwrap(),
            vec![BlockId::new(1), BlockId::new(2)]
        );
    }

    #[test]
    fn test_try_requires_triable_head() {
        let ctx = context();
        let mut b = builder(&ctx);
        let (resume, handler) = (BlockLabel::new(), BlockLabel::new());
        b.begin(&BlockLabel::new()).unwrap();

        let fence = b.fence(AccessMode::SeqCst).unwrap();
        assert_eq!(b.try_(fence, &resume, &handler), Err(Error::NotTriable(fence)));

        let call = b.invoke_static(side_effect(), vec![]).unwrap();
        b.fence(AccessMode::Release).unwrap();
        assert_eq!(b.try_(call, &resume, &handler), Err(Error::NotTriable(call)));
    }

    #[test]
    fn test_try_rejects_interned_call() {
        let ctx = context();
        let mut b = builder(&ctx);
        let (resume, handler) = (BlockLabel::new(), BlockLabel::new());
        b.begin(&BlockLabel::new()).unwrap();

        let pure = Arc::new(ExecutableElement::method(
            "app/Math",
            "abs",
            MethodDescriptor::void(),
            ValueType::I32,
            Modifiers::STATIC | Modifiers::NO_SIDE_EFFECTS,
        ));
        let call = b.invoke_value_static(pure, vec![]).unwrap();
        assert!(!ctx.store().get(call).unwrap().is_triable());
        assert_eq!(b.try_(call, &resume, &handler), Err(Error::NotTriable(call)));

        let current = Arc::new(ExecutableElement::method(
            "app/Clock",
            "now",
            MethodDescriptor::void(),
            ValueType::I64,
            Modifiers::STATIC,
        ));
        let call = b.invoke_value_static(current, vec![]).unwrap();
        assert!(ctx.store().get(call).unwrap().is_triable());
        assert_eq!(b.try_(call, &resume, &handler).unwrap(), BlockId::ENTRY);
    }

    #[test]
    fn test_dce_keeps_unconsumed_store() {
        let ctx = context();
        let mut b = builder(&ctx);
        let class = ClassType::builder("app/Box").build();
        let field = Arc::new(crate::types::FieldElement::new(
            "app/Box",
            "value",
            TypeDescriptor::Base(crate::types::BaseTypeDescriptor::Int),
            ValueType::I32,
            Modifiers::empty(),
        ));

        b.begin(&BlockLabel::new()).unwrap();
        let object = b.new_(class).unwrap();
        let one = b.int_literal(ValueType::I32, 1).unwrap();
        let unused = b.int_literal(ValueType::I32, 99).unwrap();
        let store = b
            .store(
                ValueHandle::InstanceField {
                    field,
                    instance: object,
                },
                one,
                AccessMode::Plain,
            )
            .unwrap();
        b.return_(None).unwrap();

        let mut graph = b.finish().unwrap();
        assert_eq!(graph.eliminate_dead_code(ctx.store()).unwrap(), 1);
        assert!(graph.contains(store));
        assert!(graph.contains(one));
        assert!(!graph.contains(unused));
    }

    #[test]
    fn test_finish_rejects_unbuilt_successor() {
        let ctx = context();
        let mut b = builder(&ctx);
        b.begin(&BlockLabel::new()).unwrap();
        b.goto(&BlockLabel::new()).unwrap();
        assert!(matches!(b.finish(), Err(Error::IncompleteUnit(_))));
    }

    #[test]
    fn test_finish_rejects_open_block() {
        let ctx = context();
        let mut b = builder(&ctx);
        let label = BlockLabel::new();
        assert!(matches!(b.finish(), Err(Error::IncompleteUnit(_))));
        b.begin(&label).unwrap();
        assert_eq!(b.finish().unwrap_err(), Error::BlockInProgress(label.serial()));
    }

    #[test]
    fn test_symbolic_reference_rejected() {
        let ctx = context();
        let mut b = builder(&ctx);
        b.begin(&BlockLabel::new()).unwrap();
        let err = b
            .invoke_static_symbolic(
                &TypeDescriptor::class("app/Util"),
                "help",
                &MethodDescriptor::void(),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(_)));
    }

    #[test]
    fn test_build_block_absorbs_termination() {
        let ctx = context();
        let mut b = builder(&ctx);
        let label = BlockLabel::new();
        build_block(&mut b, &label, |b| {
            b.return_(None)?;
            Err(Error::BlockTerminated(BlockId::ENTRY))
        })
        .unwrap();
        assert!(label.is_resolved());
    }

    #[test]
    fn test_provenance_follows_location() {
        let ctx = context();
        let mut b = builder(&ctx);
        b.begin(&BlockLabel::new()).unwrap();
        b.set_location(12, 4).unwrap();
        let fence = b.fence(AccessMode::Acquire).unwrap();
        let node = ctx.store().get(fence).unwrap();
        assert_eq!(node.line(), 12);
        assert_eq!(node.bci(), 4);
        assert_eq!(b.location().unwrap().line, 12);
    }
}
