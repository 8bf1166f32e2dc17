//! Integration tests for builder pipelines and the unit scheduler.

use std::sync::{Arc, Mutex};

use aotgraph::prelude::*;

const NO_SUCH_METHOD_ERROR: &str = "java/lang/NoSuchMethodError";

fn exception(registry: &ClassRegistry, name: &str) {
    registry.define(
        ClassType::builder(name)
            .extends(registry.root().clone())
            .constructor(ExecutableElement::constructor(name, MethodDescriptor::void()))
            .build(),
    );
}

fn session(registry: ClassRegistry, config: CompilerConfig) -> Arc<CompilationContext> {
    Arc::new(CompilationContext::new(Arc::new(registry), config))
}

fn method(owner: &str, name: &str, ret: ValueType) -> Arc<ExecutableElement> {
    Arc::new(ExecutableElement::method(
        owner,
        name,
        MethodDescriptor::void(),
        ret,
        Modifiers::STATIC,
    ))
}

/// Turns every addition into a multiplication.
struct AddToMul(Box<dyn GraphBuilder>);

impl GraphBuilder for AddToMul {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        Some(self.0.as_mut())
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let op = if op == BinaryOp::Add { BinaryOp::Mul } else { op };
        self.next("binary")?.binary(op, lhs, rhs)
    }
}

/// Records the operators it receives and turns multiplications into left shifts.
struct MulToShl {
    next: Box<dyn GraphBuilder>,
    seen: Arc<Mutex<Vec<BinaryOp>>>,
}

impl GraphBuilder for MulToShl {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        Some(self.next.as_mut())
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        self.seen.lock().unwrap().push(op);
        let op = if op == BinaryOp::Mul { BinaryOp::Shl } else { op };
        self.next("binary")?.binary(op, lhs, rhs)
    }
}

#[test]
fn test_pipeline_stacked_passes_in_registration_order() -> Result<()> {
    let ctx = session(ClassRegistry::new(), CompilerConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let pipeline = BuilderPipeline::new()
        .with(|_, next| Box::new(AddToMul(next)))
        .with(move |_, next| {
            Box::new(MulToShl {
                next,
                seen: recorder.clone(),
            })
        });

    let mut b = pipeline.build(&ctx, method("app/Calc", "shift", ValueType::I32));
    b.begin(&BlockLabel::new())?;
    let x = b.parameter(0, ValueType::I32)?;
    let y = b.parameter(1, ValueType::I32)?;
    let result = b.add(x, y)?;

    assert_eq!(*seen.lock().unwrap(), vec![BinaryOp::Mul]);
    assert!(matches!(
        ctx.store().value(result)?.op(),
        ValueOp::Binary { op: BinaryOp::Shl, .. }
    ));
    Ok(())
}

#[test]
fn test_resolve_missing_method_throws_linkage_error() -> Result<()> {
    let registry = ClassRegistry::new();
    exception(&registry, NO_SUCH_METHOD_ERROR);
    registry.define(
        ClassType::builder("app/Service")
            .extends(registry.root().clone())
            .build(),
    );
    let ctx = session(registry, CompilerConfig::default());

    let mut b = BuilderPipeline::standard().build(&ctx, method("app/Main", "main", ValueType::Void));
    let mut after_call = 0;
    build_block(b.as_mut(), &BlockLabel::new(), |b| {
        b.invoke_static_symbolic(
            &TypeDescriptor::class("app/Service"),
            "start",
            &MethodDescriptor::void(),
            Vec::new(),
        )?;
        after_call += 1;
        b.return_(None)?;
        Ok(())
    })?;
    let graph = b.finish()?;

    assert_eq!(after_call, 0);
    assert_eq!(graph.blocks().len(), 1);
    let block = graph.block(BlockId::ENTRY)?;
    let Some(Terminator::Throw(thrown)) = ctx.store().get(block.terminator())?.as_terminator() else {
        panic!("the block must end by throwing");
    };
    let ValueOp::InvokeConstructor { receiver, .. } = ctx.store().value(*thrown)?.op() else {
        panic!("the thrown value must be a constructed exception");
    };
    assert!(ctx.store().is_allocation_of(*receiver, NO_SUCH_METHOD_ERROR));

    // entry, allocation, constructor call, throw: nothing else joined the chain
    let constructor = ctx.store().get(block.terminator())?.ordering_dependency(0)?;
    let allocation = ctx.store().get(constructor)?.ordering_dependency(0)?;
    assert_eq!(allocation, *receiver);
    assert_eq!(ctx.store().get(allocation)?.ordering_dependency(0)?, block.entry());
    assert_eq!(ctx.events.count_kind(EventKind::LinkageErrorThrown), 1);
    Ok(())
}

#[test]
fn test_scheduler_concurrent_units_share_literal() -> Result<()> {
    let ctx = session(
        ClassRegistry::new(),
        CompilerConfig::default().with_worker_threads(2),
    );
    let first = method("app/A", "limit", ValueType::I32);
    let second = method("app/B", "limit", ValueType::I32);

    let translator = |_: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
        b.begin(&BlockLabel::new())?;
        let limit = b.int_literal(ValueType::I32, 1 << 20)?;
        b.return_(Some(limit))?;
        Ok(())
    };
    let program = UnitScheduler::new(BuilderPipeline::standard()).run(
        &ctx,
        &translator,
        vec![first.clone(), second.clone()],
    )?;

    let returned = |element: &ExecutableElement| -> Result<NodeId> {
        let graph = program.graph(element).expect("unit compiled");
        let terminator = graph.block(BlockId::ENTRY)?.terminator();
        match ctx.store().get(terminator)?.as_terminator() {
            Some(Terminator::Return(Some(value))) => Ok(*value),
            other => panic!("expected a value return, got {other:?}"),
        }
    };
    let a = returned(&first)?;
    let b = returned(&second)?;

    assert_eq!(a, b);
    assert!(program.graph(&first).unwrap().contains(a));
    assert!(program.graph(&second).unwrap().contains(b));
    Ok(())
}

struct FixedProbe;

impl ConstantProbe for FixedProbe {
    fn probe(&self, name: &str, ty: &ValueType, _: &Location) -> Result<Option<Literal>> {
        Ok((name == "PAGE_SIZE").then(|| Literal::int(ty.clone(), 4096)))
    }
}

#[test]
fn test_scheduler_standard_session_end_to_end() -> Result<()> {
    let registry = ClassRegistry::new();
    exception(&registry, NO_SUCH_METHOD_ERROR);
    registry.define(
        ClassType::builder("aot/runtime/CNative")
            .extends(registry.root().clone())
            .method(ExecutableElement::method(
                "aot/runtime/CNative",
                "constant",
                MethodDescriptor::new(Vec::new(), TypeDescriptor::class("java/lang/Object")),
                ValueType::reference(registry.root().clone()),
                Modifiers::STATIC | Modifiers::NATIVE,
            ))
            .build(),
    );
    let page_size = FieldElement::new(
        "app/Memory",
        "PAGE_SIZE",
        TypeDescriptor::Base(BaseTypeDescriptor::Int),
        ValueType::I32,
        Modifiers::STATIC | Modifiers::FINAL,
    );
    let memory = registry.define(
        ClassType::builder("app/Memory")
            .extends(registry.root().clone())
            .field(page_size)
            .initializer(true)
            .build(),
    );
    let ctx = session(registry, CompilerConfig::default().with_worker_threads(2));
    assert!(NativeConstants::get(&ctx)?.set_probe(Arc::new(FixedProbe)));

    let memory_type = TypeDescriptor::class("app/Memory");
    let translator = move |element: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
        b.begin(&BlockLabel::new())?;
        if element.kind() == ElementKind::Initializer {
            let marker = b.invoke_static_symbolic(
                &TypeDescriptor::class("aot/runtime/CNative"),
                "constant",
                &MethodDescriptor::new(Vec::new(), TypeDescriptor::class("java/lang/Object")),
                Vec::new(),
            )?;
            let value = b.check_cast_symbolic(marker, &TypeDescriptor::Base(BaseTypeDescriptor::Int))?;
            let handle = b.static_field_symbolic(
                &memory_type,
                "PAGE_SIZE",
                &TypeDescriptor::Base(BaseTypeDescriptor::Int),
            )?;
            b.store(handle, value, AccessMode::Plain)?;
            b.return_(None)?;
        } else {
            let handle = b.static_field_symbolic(
                &memory_type,
                "PAGE_SIZE",
                &TypeDescriptor::Base(BaseTypeDescriptor::Int),
            )?;
            let size = b.load(handle, AccessMode::Plain)?;
            b.return_(Some(size))?;
        }
        Ok(())
    };

    let mut scheduler = UnitScheduler::default().with_initializers();
    let main = method("app/Main", "pageSize", ValueType::I32);
    let program = scheduler.run(&ctx, &translator, vec![main])?;

    assert_eq!(program.failure_count(), 0);
    assert_eq!(program.len(), 2);

    let initializer = memory.initializer().expect("app/Memory has an initializer");
    assert!(program.graph(initializer).is_some());

    let field = &memory.fields()[0];
    let constants = NativeConstants::get(&ctx)?;
    assert!(constants.is_registered(field));
    assert_eq!(constants.value(field), Some(Literal::int(ValueType::I32, 4096)));

    let ids = TypeIds::get(&ctx)?;
    assert_eq!(ids.id("java/lang/Object"), Some(0));
    assert!(ids.id("app/Memory").is_some());
    assert!(ctx.events.errors().next().is_none());
    Ok(())
}
