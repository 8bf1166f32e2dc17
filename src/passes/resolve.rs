//! Member reference resolution.
//!
//! Turns the symbolic, descriptor-based operations emitted by the translator into
//! operations on resolved classes, methods and fields. A reference that cannot be
//! resolved does not fail the unit: the current block is ended with a thrown linkage
//! error, exactly as the running program would observe it, and the builder returns
//! [`Error::BlockTerminated`] so the translator skips the rest of the block.

use std::sync::Arc;

use crate::{
    builder::GraphBuilder,
    context::CompilationContext,
    events::EventKind,
    graph::{CastKind, DispatchKind, Literal, NodeId, ValueHandle},
    passes::record_rewrite,
    types::{
        ClassContext, ClassType, ClassTypeDescriptor, ExecutableElement, FieldElement,
        MethodDescriptor, TypeDescriptor, ValueType, ROOT_CLASS,
    },
    Error, Result,
};

const PASS: &str = "resolve";

/// Thrown when a method or constructor reference cannot be resolved.
pub const NO_SUCH_METHOD_ERROR: &str = "java/lang/NoSuchMethodError";
/// Thrown when a field reference cannot be resolved.
pub const NO_SUCH_FIELD_ERROR: &str = "java/lang/NoSuchFieldError";
/// Thrown when a class reference cannot be resolved.
pub const NO_CLASS_DEF_FOUND_ERROR: &str = "java/lang/NoClassDefFoundError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Linkage {
    Method,
    Field,
    Class,
}

/// The linkage error classes, looked up once per session.
#[derive(Debug)]
pub struct LinkageErrors {
    no_such_method: Option<Arc<ClassType>>,
    no_such_field: Option<Arc<ClassType>>,
    no_class_def: Option<Arc<ClassType>>,
}

impl LinkageErrors {
    fn load(classes: &dyn ClassContext) -> Self {
        Self {
            no_such_method: classes.find_defined_type(NO_SUCH_METHOD_ERROR),
            no_such_field: classes.find_defined_type(NO_SUCH_FIELD_ERROR),
            no_class_def: classes.find_defined_type(NO_CLASS_DEF_FOUND_ERROR),
        }
    }

    fn get(&self, linkage: Linkage) -> (&'static str, Option<&Arc<ClassType>>) {
        match linkage {
            Linkage::Method => (NO_SUCH_METHOD_ERROR, self.no_such_method.as_ref()),
            Linkage::Field => (NO_SUCH_FIELD_ERROR, self.no_such_field.as_ref()),
            Linkage::Class => (NO_CLASS_DEF_FOUND_ERROR, self.no_class_def.as_ref()),
        }
    }
}

/// Resolves symbolic member references against the session's [`ClassContext`].
pub struct MemberResolvingBuilder {
    context: Arc<CompilationContext>,
    next: Box<dyn GraphBuilder>,
}

impl MemberResolvingBuilder {
    /// Wraps `next`.
    #[must_use]
    pub fn new(context: Arc<CompilationContext>, next: Box<dyn GraphBuilder>) -> Self {
        Self { context, next }
    }

    /// Ends the current block by throwing the linkage error for `linkage`.
    ///
    /// Always returns an error: [`Error::BlockTerminated`] once the block is sealed, or
    /// whatever error prevented sealing it.
    fn terminate<T>(&mut self, linkage: Linkage, member: &str) -> Result<T> {
        let context = self.context.clone();
        let errors =
            context.compute_attachment_if_absent(|| LinkageErrors::load(context.classes()))?;
        let (name, class) = errors.get(linkage);
        let location = self.location()?;
        context
            .events
            .record(EventKind::LinkageErrorThrown)
            .at(location.clone())
            .pass(PASS)
            .message(format!("{name}: {member}"));

        let constructor = class.and_then(|class| {
            class
                .resolve_constructor(&MethodDescriptor::void())
                .map(|ctor| (class.clone(), ctor))
        });
        let block = match constructor {
            Some((class, ctor)) => {
                let exception = self.new_(class)?;
                let exception = self.invoke_constructor(exception, ctor, Vec::new())?;
                self.throw(exception)?
            }
            None => {
                context.error(location, format!("Linkage error class {name} is not defined"));
                self.unreachable()?
            }
        };
        Err(Error::BlockTerminated(block))
    }

    fn owner_class(
        &mut self,
        owner: &TypeDescriptor,
        linkage: Linkage,
        what: &str,
    ) -> Result<Arc<ClassType>> {
        let Some(descriptor) = owner.as_class() else {
            let location = self.location()?;
            self.context.error(
                location,
                format!("Resolve {what} on a non-class type `{owner}` (did you forget a pass?)"),
            );
            return self.terminate(linkage, &owner.to_string());
        };
        match self.find_class(descriptor) {
            Some(class) => Ok(class),
            None => self.terminate(Linkage::Class, &descriptor.internal_name()),
        }
    }

    fn find_class(&self, descriptor: &ClassTypeDescriptor) -> Option<Arc<ClassType>> {
        self.context
            .classes()
            .find_defined_type(&descriptor.internal_name())
    }

    fn resolve_method(
        &mut self,
        kind: DispatchKind,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &MethodDescriptor,
    ) -> Result<Arc<ExecutableElement>> {
        let class = self.owner_class(owner, Linkage::Method, "method")?;
        let found = match kind {
            DispatchKind::Exact | DispatchKind::Virtual => class.resolve_method(name, descriptor),
            DispatchKind::Interface => {
                let root = self
                    .context
                    .classes()
                    .find_defined_type(ROOT_CLASS)
                    .unwrap_or_else(|| class.clone());
                class.resolve_interface_method(name, descriptor, &root)
            }
        };
        match found {
            Some(method) => {
                let context = self.context.clone();
                record_rewrite(self, &context, EventKind::ReferenceResolved, PASS, || {
                    format!("{owner}.{name}{descriptor} -> {method}")
                })?;
                Ok(method)
            }
            None => self.terminate(Linkage::Method, &format!("{owner}.{name}{descriptor}")),
        }
    }

    fn resolve_field(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> Result<Arc<FieldElement>> {
        let class = self.owner_class(owner, Linkage::Field, "field")?;
        match class.resolve_field(name, descriptor) {
            Some(field) => Ok(field),
            None => self.terminate(Linkage::Field, &format!("{owner}.{name}:{descriptor}")),
        }
    }
}

impl GraphBuilder for MemberResolvingBuilder {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        Some(self.next.as_mut())
    }

    fn new_symbolic(&mut self, class: &ClassTypeDescriptor) -> Result<NodeId> {
        match self.find_class(class) {
            Some(resolved) => self.new_(resolved),
            None => self.terminate(Linkage::Class, &class.internal_name()),
        }
    }

    fn invoke_static_symbolic(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &MethodDescriptor,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        let target = self.resolve_method(DispatchKind::Exact, owner, name, descriptor)?;
        if *target.return_type() == ValueType::Void {
            self.invoke_static(target, args)
        } else {
            self.invoke_value_static(target, args)
        }
    }

    fn invoke_instance_symbolic(
        &mut self,
        kind: DispatchKind,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &MethodDescriptor,
        receiver: NodeId,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        let target = self.resolve_method(kind, owner, name, descriptor)?;
        if *target.return_type() == ValueType::Void {
            self.invoke_instance(kind, target, receiver, args)
        } else {
            self.invoke_value_instance(kind, target, receiver, args)
        }
    }

    fn invoke_constructor_symbolic(
        &mut self,
        receiver: NodeId,
        owner: &TypeDescriptor,
        descriptor: &MethodDescriptor,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        let class = self.owner_class(owner, Linkage::Method, "constructor")?;
        match class.resolve_constructor(descriptor) {
            Some(ctor) => self.invoke_constructor(receiver, ctor, args),
            None => self.terminate(Linkage::Method, &format!("{owner}.<init>{descriptor}")),
        }
    }

    fn static_field_symbolic(
        &mut self,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> Result<ValueHandle> {
        let field = self.resolve_field(owner, name, descriptor)?;
        Ok(ValueHandle::StaticField(field))
    }

    fn instance_field_symbolic(
        &mut self,
        instance: NodeId,
        owner: &TypeDescriptor,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> Result<ValueHandle> {
        let field = self.resolve_field(owner, name, descriptor)?;
        Ok(ValueHandle::InstanceField { field, instance })
    }

    fn check_cast_symbolic(&mut self, input: NodeId, target: &TypeDescriptor) -> Result<NodeId> {
        let Some(cast_type) = self.context.classes().resolve_type(target) else {
            return self.terminate(Linkage::Class, &target.to_string());
        };
        // placeholders may not be castable, but stay placeholders of the new type
        match self.context.store().literal(input) {
            Some(Literal::Constant(_)) => return self.literal(Literal::Constant(cast_type)),
            Some(Literal::Undefined(_)) => return self.literal(Literal::Undefined(cast_type)),
            _ => {}
        }

        let input_type = self.context.store().value_type(input)?.clone();
        let pointer_bits = self.context.config().target.pointer_bits;
        match cast_type {
            ValueType::Reference(reference) => self.check_cast(input, reference),
            word if word.is_word() => {
                let narrower = match (word.min_bits(pointer_bits), input_type.min_bits(pointer_bits)) {
                    (Some(to), Some(from)) => to < from,
                    _ => false,
                };
                let kind = if narrower {
                    CastKind::Truncate
                } else {
                    CastKind::Bitcast
                };
                self.cast(kind, input, word)
            }
            ValueType::Array { .. } if matches!(input_type, ValueType::Pointer(_)) => Ok(input),
            other => Err(malformed_error!(
                "Cannot check-cast a value of type {} to {}",
                input_type,
                other
            )),
        }
    }

    fn instance_of_symbolic(&mut self, input: NodeId, target: &TypeDescriptor) -> Result<NodeId> {
        match self.context.classes().resolve_type(target) {
            Some(ValueType::Reference(reference)) => self.instance_of(input, reference),
            Some(other) => Err(malformed_error!("instanceof against non-reference type {}", other)),
            None => self.terminate(Linkage::Class, &target.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::build_block,
        config::CompilerConfig,
        graph::{AccessMode, BlockId, BlockLabel, Terminator, ValueOp},
        passes::testing::{context_with, single},
        types::{BaseTypeDescriptor, ClassRegistry, Modifiers},
    };

    fn exception(registry: &ClassRegistry, name: &str) {
        let class = ClassType::builder(name)
            .extends(registry.root().clone())
            .constructor(ExecutableElement::constructor(name, MethodDescriptor::void()))
            .build();
        registry.define(class);
    }

    fn registry() -> ClassRegistry {
        let registry = ClassRegistry::new();
        exception(&registry, NO_SUCH_METHOD_ERROR);
        exception(&registry, NO_SUCH_FIELD_ERROR);
        exception(&registry, NO_CLASS_DEF_FOUND_ERROR);

        let base = ClassType::builder("app/Base")
            .extends(registry.root().clone())
            .method(ExecutableElement::method(
                "app/Base",
                "size",
                MethodDescriptor::new(vec![], TypeDescriptor::Base(BaseTypeDescriptor::Int)),
                ValueType::I32,
                Modifiers::empty(),
            ))
            .build();
        let derived = ClassType::builder("app/Derived")
            .extends(registry.define(base))
            .field(FieldElement::new(
                "app/Derived",
                "count",
                TypeDescriptor::Base(BaseTypeDescriptor::Int),
                ValueType::I32,
                Modifiers::STATIC,
            ))
            .build();
        registry.define(derived);
        registry
    }

    fn resolving(ctx: &Arc<CompilationContext>) -> Box<dyn GraphBuilder> {
        single(ctx, |ctx, next| Box::new(MemberResolvingBuilder::new(ctx, next)))
    }

    /// Ordering chain of a block, from its terminator back to its entry.
    fn chain(ctx: &CompilationContext, terminator: NodeId) -> Vec<NodeId> {
        let mut out = vec![terminator];
        let mut current = terminator;
        while let Ok(previous) = ctx.store().get(current).unwrap().ordering_dependency(0) {
            out.push(previous);
            current = previous;
        }
        out
    }

    #[test]
    fn test_missing_method_throws_no_such_method_error() {
        let ctx = context_with(registry(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        let label = BlockLabel::new();

        build_block(b.as_mut(), &label, |b| {
            b.invoke_static_symbolic(
                &TypeDescriptor::class("app/Derived"),
                "missing",
                &MethodDescriptor::void(),
                vec![],
            )?;
            b.fence(AccessMode::SeqCst)?;
            b.return_(None)?;
            Ok(())
        })
        .unwrap();

        let graph = b.finish().unwrap();
        let terminator = graph.block(BlockId::ENTRY).unwrap().terminator();
        let Some(Terminator::Throw(thrown)) = ctx.store().get(terminator).unwrap().as_terminator()
        else {
            panic!("block must end in a throw");
        };
        let ValueOp::InvokeConstructor { receiver, .. } = ctx.store().value(*thrown).unwrap().op()
        else {
            panic!("thrown value must be a constructed exception");
        };
        assert!(ctx.store().is_allocation_of(*receiver, NO_SUCH_METHOD_ERROR));

        // entry, new, constructor, throw: nothing after the failed invocation
        assert_eq!(chain(&ctx, terminator).len(), 4);
        assert!(ctx.events.has(EventKind::LinkageErrorThrown));
        assert!(ctx.events.errors().next().is_none());
    }

    #[test]
    fn test_method_resolved_through_superclass() {
        let ctx = context_with(registry(), CompilerConfig::default().with_rewrite_events());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let derived = ctx.classes().find_defined_type("app/Derived").unwrap();
        let receiver = b
            .parameter(0, ValueType::Reference(derived.reference().as_nullable()))
            .unwrap();
        let size = b
            .invoke_instance_symbolic(
                DispatchKind::Virtual,
                &TypeDescriptor::class("app/Derived"),
                "size",
                &MethodDescriptor::new(vec![], TypeDescriptor::Base(BaseTypeDescriptor::Int)),
                receiver,
                vec![],
            )
            .unwrap();

        let ValueOp::InvokeInstance { target, .. } = ctx.store().value(size).unwrap().op() else {
            panic!("expected a value invocation");
        };
        assert_eq!(target.owner(), "app/Base");
        assert_eq!(ctx.store().value_type(size).unwrap(), &ValueType::I32);
        assert_eq!(ctx.events.count_kind(EventKind::ReferenceResolved), 1);
    }

    #[test]
    fn test_non_class_owner_reports_error() {
        let ctx = context_with(registry(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let result = b.invoke_static_symbolic(
            &TypeDescriptor::Base(BaseTypeDescriptor::Int),
            "valueOf",
            &MethodDescriptor::void(),
            vec![],
        );
        assert!(matches!(result, Err(Error::BlockTerminated(_))));
        assert_eq!(ctx.events.errors().count(), 1);
        assert_eq!(b.nop(), Err(Error::NoCurrentBlock));
    }

    #[test]
    fn test_fields_resolve_to_handles() {
        let ctx = context_with(registry(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let owner = TypeDescriptor::class("app/Derived");
        let int = TypeDescriptor::Base(BaseTypeDescriptor::Int);
        let handle = b.static_field_symbolic(&owner, "count", &int).unwrap();
        assert_eq!(handle.field().unwrap().name(), "count");

        let missing = b.static_field_symbolic(&owner, "absent", &int);
        assert!(matches!(missing, Err(Error::BlockTerminated(_))));
        assert_eq!(ctx.events.count_kind(EventKind::LinkageErrorThrown), 1);
    }

    #[test]
    fn test_unknown_class_throws_no_class_def_found() {
        let ctx = context_with(registry(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let result = b.new_symbolic(&ClassTypeDescriptor::new("app", "Ghost"));
        let Err(Error::BlockTerminated(block)) = result else {
            panic!("expected early termination");
        };
        let graph = b.finish().unwrap();
        let terminator = graph.block(block).unwrap().terminator();
        let Some(Terminator::Throw(thrown)) = ctx.store().get(terminator).unwrap().as_terminator()
        else {
            panic!("block must end in a throw");
        };
        let ValueOp::InvokeConstructor { receiver, .. } = ctx.store().value(*thrown).unwrap().op()
        else {
            panic!("thrown value must be a constructed exception");
        };
        assert!(ctx.store().is_allocation_of(*receiver, NO_CLASS_DEF_FOUND_ERROR));
    }

    #[test]
    fn test_missing_linkage_class_ends_unreachable() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let result = b.new_symbolic(&ClassTypeDescriptor::new("app", "Ghost"));
        assert!(matches!(result, Err(Error::BlockTerminated(_))));
        let graph = b.finish().unwrap();
        let terminator = graph.block(BlockId::ENTRY).unwrap().terminator();
        assert_eq!(
            ctx.store().get(terminator).unwrap().as_terminator(),
            Some(&Terminator::Unreachable)
        );
        assert_eq!(ctx.events.errors().count(), 1);
    }

    #[test]
    fn test_word_check_cast_truncates_or_bitcasts() {
        let ctx = context_with(registry(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let wide = b.parameter(0, ValueType::I64).unwrap();
        let int = TypeDescriptor::Base(BaseTypeDescriptor::Int);
        let narrowed = b.check_cast_symbolic(wide, &int).unwrap();
        assert!(matches!(
            ctx.store().value(narrowed).unwrap().op(),
            ValueOp::Cast { kind: CastKind::Truncate, .. }
        ));

        let float = b.parameter(1, ValueType::F32).unwrap();
        let bits = b.check_cast_symbolic(float, &int).unwrap();
        assert!(matches!(
            ctx.store().value(bits).unwrap().op(),
            ValueOp::Cast { kind: CastKind::Bitcast, .. }
        ));
    }

    #[test]
    fn test_constant_placeholder_survives_check_cast() {
        let ctx = context_with(registry(), CompilerConfig::default());
        let mut b = resolving(&ctx);
        b.begin(&BlockLabel::new()).unwrap();

        let placeholder = b.literal(Literal::Constant(ValueType::Poison)).unwrap();
        let cast = b.check_cast_symbolic(placeholder, &TypeDescriptor::class("app/Base")).unwrap();
        assert!(matches!(
            ctx.store().literal(cast),
            Some(Literal::Constant(ValueType::Reference(_)))
        ));
    }
}
