//! Native compile-time constants and class initializer registration.
//!
//! Native code exposes constants (macro values, enumerators, `sizeof` results) to the
//! program through static final fields initialized from the marker call
//! `CNative.constant()`:
//!
//! ```text
//! static final int EAGAIN = constant();
//! ```
//!
//! The [`ConstantDefiningBuilder`] replaces the marker call with a placeholder literal and
//! turns the store of that placeholder into a registration with [`NativeConstants`]. The
//! actual value is obtained from a [`ConstantProbe`] the first time it is asked for.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::{
    builder::GraphBuilder,
    context::CompilationContext,
    events::{EventKind, Location},
    graph::{AccessMode, Literal, NodeId, ValueHandle, ValueOp},
    passes::record_rewrite,
    types::{ElementKind, ExecutableElement, FieldElement, ValueType},
    Result,
};

const PASS: &str = "native";

/// Internal name of the class declaring the native marker methods.
pub const NATIVE_CLASS: &str = "aot/runtime/CNative";

const NATIVE_PACKAGE: &str = "aot/runtime";
const NATIVE_CLASS_NAME: &str = "CNative";
const NAME_ANNOTATION: &str = "CNative$name";

/// Determines the value of a native constant, typically by compiling a probe program
/// against the target's headers.
pub trait ConstantProbe: Send + Sync {
    /// Probes the constant `name` for a field of type `ty`.
    ///
    /// Returns `Ok(None)` if the constant is not defined on the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe could not be run. The constant is then treated as
    /// undefined.
    fn probe(&self, name: &str, ty: &ValueType, location: &Location) -> Result<Option<Literal>>;
}

struct PendingConstant {
    name: String,
    ty: ValueType,
    location: Location,
    value: OnceLock<Literal>,
}

/// Session registry of native constants, stored as a context attachment.
#[derive(Default)]
pub struct NativeConstants {
    probe: OnceLock<Arc<dyn ConstantProbe>>,
    constants: DashMap<Arc<FieldElement>, Arc<PendingConstant>>,
}

impl NativeConstants {
    /// Returns the registry of `context`, creating it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the attachment slot holds another type.
    pub fn get(context: &CompilationContext) -> Result<Arc<Self>> {
        context.compute_attachment_if_absent(Self::default)
    }

    /// Installs the probe used to evaluate constants. Returns `false` if one is already
    /// installed.
    ///
    /// Without a probe every constant evaluates to `undefined`.
    pub fn set_probe(&self, probe: Arc<dyn ConstantProbe>) -> bool {
        self.probe.set(probe).is_ok()
    }

    /// Registers `field` as a native constant. Returns `true` on first registration.
    ///
    /// The probed name is the value of the field's `CNative$name` annotation, or the field
    /// name if it has none.
    pub fn register(&self, field: &Arc<FieldElement>, location: Location) -> bool {
        if self.constants.contains_key(field.as_ref()) {
            return false;
        }
        let mut added = false;
        self.constants.entry(field.clone()).or_insert_with(|| {
            added = true;
            Arc::new(PendingConstant {
                name: constant_name(field),
                ty: field.ty().clone(),
                location,
                value: OnceLock::new(),
            })
        });
        added
    }

    /// Returns `true` if `field` is a registered constant.
    #[must_use]
    pub fn is_registered(&self, field: &FieldElement) -> bool {
        self.constants.contains_key(field)
    }

    /// Number of registered constants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Returns `true` if no constant is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// The value of a registered constant, probing it on first access.
    ///
    /// A constant the probe reports as undefined, or that cannot be probed, has the
    /// value [`Literal::Undefined`] of the field's type.
    #[must_use]
    pub fn value(&self, field: &FieldElement) -> Option<Literal> {
        let pending = self.constants.get(field)?.value().clone();
        let value = pending.value.get_or_init(|| {
            let probed = self
                .probe
                .get()
                .map(|probe| probe.probe(&pending.name, &pending.ty, &pending.location));
            match probed {
                Some(Ok(Some(literal))) => literal,
                _ => Literal::Undefined(pending.ty.clone()),
            }
        });
        Some(value.clone())
    }
}

fn constant_name(field: &FieldElement) -> String {
    field
        .annotations()
        .iter()
        .find(|annotation| {
            annotation.descriptor.package() == NATIVE_PACKAGE
                && annotation.descriptor.class_name() == NAME_ANNOTATION
        })
        .and_then(|annotation| annotation.string_value("value"))
        .unwrap_or_else(|| field.name())
        .to_string()
}

/// Handles native constant definitions and registers class initializers.
///
/// - Building a class initializer registers it.
/// - A load of a really-final static field registers the initializer of the field's
///   class, since the field's value may be a constant defined there.
/// - `CNative.constant()` becomes a [`Literal::Constant`] placeholder.
/// - Storing a placeholder (possibly through casts) to a static final field registers the
///   field with [`NativeConstants`] and writes nothing. Storing it anywhere else is
///   reported as an error.
pub struct ConstantDefiningBuilder {
    context: Arc<CompilationContext>,
    next: Box<dyn GraphBuilder>,
}

impl ConstantDefiningBuilder {
    /// Wraps `next`, registering the unit's element if it is a class initializer.
    #[must_use]
    pub fn new(context: Arc<CompilationContext>, mut next: Box<dyn GraphBuilder>) -> Self {
        if let Ok(element) = next.current_element() {
            if element.kind() == ElementKind::Initializer {
                register_initializer(&context, &element);
            }
        }
        Self { context, next }
    }

    /// Strips casts off `value`.
    fn uncast(&self, mut value: NodeId) -> Result<NodeId> {
        loop {
            match self.context.store().value(value)?.op() {
                ValueOp::Cast { input, .. } | ValueOp::CheckCast { input, .. } => value = *input,
                _ => return Ok(value),
            }
        }
    }
}

fn register_initializer(context: &CompilationContext, initializer: &Arc<ExecutableElement>) {
    if context.register_initializer(initializer) && context.config().record_rewrites {
        context
            .events
            .record(EventKind::InitializerRegistered)
            .element(initializer.clone())
            .pass(PASS)
            .message(initializer.to_string());
    }
}

impl GraphBuilder for ConstantDefiningBuilder {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        Some(self.next.as_mut())
    }

    fn load(&mut self, handle: ValueHandle, mode: AccessMode) -> Result<NodeId> {
        if let ValueHandle::StaticField(field) = &handle {
            if field.is_really_final() {
                let initializer = self
                    .context
                    .classes()
                    .find_defined_type(field.owner())
                    .and_then(|class| class.initializer().cloned());
                if let Some(initializer) = initializer {
                    register_initializer(&self.context, &initializer);
                }
            }
        }
        self.next("load")?.load(handle, mode)
    }

    fn store(&mut self, handle: ValueHandle, value: NodeId, mode: AccessMode) -> Result<NodeId> {
        let stored = self.uncast(value)?;
        let is_constant = self
            .context
            .store()
            .literal(stored)
            .is_some_and(Literal::is_constant_placeholder);
        if !is_constant {
            return self.next("store")?.store(handle, value, mode);
        }

        let location = self.location()?;
        match handle {
            ValueHandle::StaticField(field) if field.is_really_final() => {
                let constants = NativeConstants::get(&self.context)?;
                if constants.register(&field, location) {
                    let context = self.context.clone();
                    record_rewrite(self, &context, EventKind::ConstantDefined, PASS, || {
                        field.to_string()
                    })?;
                }
            }
            _ => self
                .context
                .error(location, "Compilation constants must be static final fields"),
        }
        self.nop()
    }

    fn invoke_value_static(
        &mut self,
        target: Arc<ExecutableElement>,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        if target.owner_is(NATIVE_PACKAGE, NATIVE_CLASS_NAME) && target.name() == "constant" {
            // the type is only known once the placeholder is cast
            return self.literal(Literal::Constant(ValueType::Poison));
        }
        self.next("invoke_value_static")?
            .invoke_value_static(target, args)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        builder::BuilderPipeline,
        config::CompilerConfig,
        graph::{Action, BlockLabel, CastKind},
        passes::testing::{context_with, single},
        types::{
            Annotation, BaseTypeDescriptor, ClassRegistry, ClassType, ClassTypeDescriptor,
            MethodDescriptor, Modifiers, TypeDescriptor,
        },
    };

    fn constant_marker() -> Arc<ExecutableElement> {
        Arc::new(ExecutableElement::method(
            NATIVE_CLASS,
            "constant",
            MethodDescriptor::new(Vec::new(), TypeDescriptor::class("java/lang/Object")),
            ValueType::reference(ClassRegistry::new().root().clone()),
            Modifiers::STATIC | Modifiers::NATIVE,
        ))
    }

    fn static_field(name: &str, modifiers: Modifiers) -> Arc<FieldElement> {
        Arc::new(FieldElement::new(
            "app/Errno",
            name,
            TypeDescriptor::Base(BaseTypeDescriptor::Int),
            ValueType::I32,
            modifiers,
        ))
    }

    fn defining(ctx: &Arc<CompilationContext>) -> Box<dyn GraphBuilder> {
        let mut builder = single(ctx, |ctx, next| Box::new(ConstantDefiningBuilder::new(ctx, next)));
        builder.begin(&BlockLabel::new()).unwrap();
        builder
    }

    /// Stores the marker call's result, cast to `int`, into `field`.
    fn define(b: &mut dyn GraphBuilder, field: Arc<FieldElement>) -> NodeId {
        let marker = b.invoke_value_static(constant_marker(), Vec::new()).unwrap();
        let value = b.cast(CastKind::Bitcast, marker, ValueType::I32).unwrap();
        b.store(ValueHandle::StaticField(field), value, AccessMode::Plain)
            .unwrap()
    }

    struct CountingProbe {
        calls: AtomicUsize,
    }

    impl ConstantProbe for CountingProbe {
        fn probe(&self, name: &str, ty: &ValueType, _: &Location) -> Result<Option<Literal>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "EAGAIN" => Ok(Some(Literal::int(ty.clone(), 11))),
                "EBROKEN" => Err(malformed_error!("probe compiler failed")),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_marker_call_is_placeholder() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default());
        let mut b = defining(&ctx);
        let marker = b.invoke_value_static(constant_marker(), Vec::new()).unwrap();
        assert_eq!(
            ctx.store().literal(marker),
            Some(&Literal::Constant(ValueType::Poison))
        );
    }

    #[test]
    fn test_constant_store_registers_and_is_suppressed() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default().with_rewrite_events());
        let mut b = defining(&ctx);
        let entry = b.nop().unwrap();
        let field = static_field("EAGAIN", Modifiers::STATIC | Modifiers::FINAL);

        let result = define(b.as_mut(), field.clone());
        assert_eq!(result, entry);

        let constants = NativeConstants::get(&ctx).unwrap();
        assert!(constants.is_registered(&field));
        assert_eq!(ctx.events.count_kind(EventKind::ConstantDefined), 1);
    }

    #[test]
    fn test_constants_probed_lazily_once() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default());
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
        });
        let constants = NativeConstants::get(&ctx).unwrap();
        assert!(constants.set_probe(probe.clone()));

        let mut b = defining(&ctx);
        let eagain = static_field("EAGAIN", Modifiers::STATIC | Modifiers::FINAL);
        define(b.as_mut(), eagain.clone());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

        assert_eq!(constants.value(&eagain), Some(Literal::int(ValueType::I32, 11)));
        assert_eq!(constants.value(&eagain), Some(Literal::int(ValueType::I32, 11)));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_failures_are_undefined() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default());
        let constants = NativeConstants::get(&ctx).unwrap();
        constants.set_probe(Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
        }));

        let mut b = defining(&ctx);
        let missing = static_field("ENOSUCH", Modifiers::STATIC | Modifiers::FINAL);
        let broken = static_field("EBROKEN", Modifiers::STATIC | Modifiers::FINAL);
        define(b.as_mut(), missing.clone());
        define(b.as_mut(), broken.clone());

        assert_eq!(constants.value(&missing), Some(Literal::Undefined(ValueType::I32)));
        assert_eq!(constants.value(&broken), Some(Literal::Undefined(ValueType::I32)));
    }

    #[test]
    fn test_name_annotation_overrides_field_name() {
        let field = FieldElement::new(
            "app/Errno",
            "TRY_AGAIN",
            TypeDescriptor::Base(BaseTypeDescriptor::Int),
            ValueType::I32,
            Modifiers::STATIC | Modifiers::FINAL,
        )
        .with_annotation(
            Annotation::new(ClassTypeDescriptor::new(NATIVE_PACKAGE, NAME_ANNOTATION))
                .with_value("value", "EAGAIN"),
        );
        assert_eq!(constant_name(&field), "EAGAIN");
        assert_eq!(constant_name(&static_field("EINTR", Modifiers::STATIC)), "EINTR");
    }

    #[test]
    fn test_constant_store_to_mutable_field_is_error() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default());
        let mut b = defining(&ctx);
        let field = static_field("counter", Modifiers::STATIC);
        define(b.as_mut(), field.clone());

        assert_eq!(ctx.events.errors().count(), 1);
        assert!(!NativeConstants::get(&ctx).unwrap().is_registered(&field));
        let head = b.nop().unwrap();
        assert!(!matches!(
            ctx.store().get(head).unwrap().as_action(),
            Some(Action::Store { .. })
        ));
    }

    #[test]
    fn test_ordinary_store_forwarded() {
        let ctx = context_with(ClassRegistry::new(), CompilerConfig::default());
        let mut b = defining(&ctx);
        let field = static_field("counter", Modifiers::STATIC);
        let one = b.literal(Literal::int(ValueType::I32, 1)).unwrap();
        let stored = b
            .store(ValueHandle::StaticField(field), one, AccessMode::Plain)
            .unwrap();
        assert!(matches!(
            ctx.store().get(stored).unwrap().as_action(),
            Some(Action::Store { .. })
        ));
    }

    #[test]
    fn test_initializers_registered() {
        let registry = ClassRegistry::new();
        let errno = registry.define(
            ClassType::builder("app/Errno")
                .extends(registry.root().clone())
                .initializer(true)
                .build(),
        );
        let ctx = context_with(registry, CompilerConfig::default());

        // building an initializer registers it
        let own = Arc::new(ExecutableElement::initializer("app/Config", true));
        let _builder = BuilderPipeline::new()
            .with(|ctx, next| Box::new(ConstantDefiningBuilder::new(ctx.clone(), next)))
            .build(&ctx, own.clone());
        assert!(ctx.is_initializer_registered(&own));

        // loading a really-final static field registers the owner's initializer
        let mut b = defining(&ctx);
        let field = static_field("EAGAIN", Modifiers::STATIC | Modifiers::FINAL);
        b.load(ValueHandle::StaticField(field), AccessMode::Plain)
            .unwrap();
        let initializer = errno.initializer().unwrap();
        assert!(ctx.is_initializer_registered(initializer));
        assert_eq!(ctx.initializer_count(), 2);

        let volatile = static_field("last", Modifiers::STATIC | Modifiers::FINAL | Modifiers::VOLATILE);
        b.load(ValueHandle::StaticField(volatile), AccessMode::Volatile)
            .unwrap();
        assert_eq!(ctx.initializer_count(), 2);
    }

    #[test]
    fn test_probe_installed_once() {
        let constants = NativeConstants::default();
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
        });
        assert!(constants.set_probe(probe.clone()));
        assert!(!constants.set_probe(probe));
        assert!(constants.is_empty());
    }
}
