//! Parallel unit compilation followed by the whole-program phase.
//!
//! The [`UnitScheduler`] compiles every unit on a bounded rayon pool. Each unit gets a
//! fresh builder stack from the scheduler's [`BuilderPipeline`] and is built
//! single-threaded by one worker; units share only the [`CompilationContext`]. Once the
//! pool has drained, the registered [`WholeProgramPass`]es run one after the other.

use std::{collections::HashSet, sync::Arc};

use rayon::{prelude::*, ThreadPoolBuilder};

use crate::{
    builder::{BuilderPipeline, GraphBuilder},
    compiler::{CompiledProgram, WholeProgramPass},
    context::CompilationContext,
    events::EventKind,
    graph::Graph,
    passes::TypeIdAssigner,
    types::ExecutableElement,
    Error, Result,
};

/// Drives a builder to construct the graph of one unit.
///
/// A translator walks the unit's source (bytecode, an AST, a test fixture...) and calls
/// the builder's operations; it must not call [`GraphBuilder::finish`], which is left to
/// the scheduler. It is shared by all workers and called concurrently.
///
/// Any closure `Fn(&Arc<ExecutableElement>, &mut dyn GraphBuilder) -> Result<()>` is a
/// translator.
pub trait UnitTranslator: Send + Sync {
    /// Builds the body of `element` through `builder`.
    ///
    /// # Errors
    ///
    /// Any error fails the unit. [`Error::BlockTerminated`] is not a failure: the graph
    /// is finished as it stands.
    fn translate(&self, element: &Arc<ExecutableElement>, builder: &mut dyn GraphBuilder) -> Result<()>;
}

impl<F> UnitTranslator for F
where
    F: Fn(&Arc<ExecutableElement>, &mut dyn GraphBuilder) -> Result<()> + Send + Sync,
{
    fn translate(&self, element: &Arc<ExecutableElement>, builder: &mut dyn GraphBuilder) -> Result<()> {
        self(element, builder)
    }
}

/// Compiles units in parallel and runs whole-program passes after all units are built.
///
/// Compilation of a unit either produces its graph or fails as a whole: the error is
/// recorded as a [`EventKind::UnitFailed`] event, the partial graph is dropped, and the
/// remaining units are unaffected.
///
/// Whole-program passes wait for every unit, including class initializers registered
/// during compilation when [`UnitScheduler::with_initializers`] is set, so they observe
/// the complete program.
pub struct UnitScheduler {
    /// Pass constructors for each unit's builder stack.
    pipeline: BuilderPipeline,
    /// Passes run after the barrier, in order.
    passes: Vec<Box<dyn WholeProgramPass>>,
    /// Also compile class initializers registered while compiling.
    compile_initializers: bool,
}

impl Default for UnitScheduler {
    /// The standard pipeline with type id assignment.
    fn default() -> Self {
        Self::new(BuilderPipeline::standard()).with_pass(TypeIdAssigner::new())
    }
}

impl UnitScheduler {
    /// Creates a scheduler building units with `pipeline` and no whole-program passes.
    #[must_use]
    pub fn new(pipeline: BuilderPipeline) -> Self {
        Self {
            pipeline,
            passes: Vec::new(),
            compile_initializers: false,
        }
    }

    /// Appends a whole-program pass.
    #[must_use]
    pub fn with_pass<P: WholeProgramPass + 'static>(mut self, pass: P) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Also compiles the class initializers registered during compilation, in further
    /// rounds, until no new initializer is registered.
    #[must_use]
    pub fn with_initializers(mut self) -> Self {
        self.compile_initializers = true;
        self
    }

    /// The unit pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &BuilderPipeline {
        &self.pipeline
    }

    /// Names of the whole-program passes, in run order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Builds the graph of a single unit on the calling thread.
    ///
    /// Nodes that are unreachable from the graph's terminators are removed from the
    /// finished graph.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the unit: a translator error, or a graph error from
    /// finishing the unit.
    pub fn compile_unit(
        &self,
        ctx: &Arc<CompilationContext>,
        translator: &dyn UnitTranslator,
        element: &Arc<ExecutableElement>,
    ) -> Result<Graph> {
        let mut builder = self.pipeline.build(ctx, element.clone());
        match translator.translate(element, builder.as_mut()) {
            Ok(()) | Err(Error::BlockTerminated(_)) => {}
            Err(e) => return Err(e),
        }

        let mut graph = builder.finish()?;
        let removed = graph.eliminate_dead_code(ctx.store())?;
        if removed > 0 && ctx.config().record_rewrites {
            ctx.events
                .record(EventKind::DeadNodesRemoved)
                .element(element.clone())
                .message(format!("{removed} unused nodes"));
        }
        Ok(graph)
    }

    /// Compiles `units` in parallel, then runs the whole-program passes.
    ///
    /// Duplicate units are compiled once. The pool has
    /// [`CompilerConfig::worker_threads`](crate::config::CompilerConfig::worker_threads)
    /// workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadPool`] if the worker pool cannot be created, or the first
    /// error of a whole-program pass. Unit failures are not errors; they are reported in
    /// the returned [`CompiledProgram`].
    pub fn run<I>(
        &mut self,
        ctx: &Arc<CompilationContext>,
        translator: &dyn UnitTranslator,
        units: I,
    ) -> Result<CompiledProgram>
    where
        I: IntoIterator<Item = Arc<ExecutableElement>>,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(ctx.config().worker_threads)
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        let program = CompiledProgram::new();
        let mut seen = HashSet::new();
        let mut wave: Vec<_> = units
            .into_iter()
            .filter(|element| seen.insert(element.clone()))
            .collect();

        while !wave.is_empty() {
            let this = &*self;
            pool.install(|| {
                wave.par_iter()
                    .for_each(|element| this.compile_into(ctx, translator, element, &program));
            });

            wave = if self.compile_initializers {
                ctx.registered_initializers()
                    .into_iter()
                    .filter(|initializer| initializer.has_body() && seen.insert(initializer.clone()))
                    .collect()
            } else {
                Vec::new()
            };
        }

        self.run_passes(ctx, &program)?;
        Ok(program)
    }

    fn compile_into(
        &self,
        ctx: &Arc<CompilationContext>,
        translator: &dyn UnitTranslator,
        element: &Arc<ExecutableElement>,
        program: &CompiledProgram,
    ) {
        ctx.events
            .record(EventKind::UnitStarted)
            .element(element.clone());

        match self.compile_unit(ctx, translator, element) {
            Ok(graph) => {
                ctx.events
                    .record(EventKind::UnitCompleted)
                    .element(element.clone())
                    .message(format!(
                        "{} blocks, {} nodes",
                        graph.blocks().len(),
                        graph.nodes().len()
                    ));
                program.insert_graph(graph);
            }
            Err(e) => {
                ctx.events
                    .record(EventKind::UnitFailed)
                    .element(element.clone())
                    .message(e.to_string());
                program.insert_failure(element.clone(), e);
            }
        }
    }

    fn run_passes(&mut self, ctx: &CompilationContext, program: &CompiledProgram) -> Result<()> {
        for pass in &mut self.passes {
            if !pass.should_run(program, ctx) {
                continue;
            }
            ctx.events
                .record(EventKind::PassStarted)
                .pass(pass.name())
                .message(pass.description());

            pass.initialize(ctx)?;
            let changed = pass.run(program, ctx)?;
            pass.finalize(ctx)?;

            ctx.events
                .record(EventKind::PassCompleted)
                .pass(pass.name())
                .message(if changed { "changed" } else { "unchanged" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        builder::GraphBuilderExt,
        config::CompilerConfig,
        graph::{AccessMode, BlockLabel, Literal, NodeId, Terminator, ValueHandle},
        passes::ConstantDefiningBuilder,
        types::{
            BaseTypeDescriptor, ClassRegistry, ClassType, FieldElement, MethodDescriptor,
            Modifiers, TypeDescriptor, ValueType,
        },
    };

    fn context(threads: usize) -> Arc<CompilationContext> {
        Arc::new(CompilationContext::new(
            Arc::new(ClassRegistry::new()),
            CompilerConfig::default().with_worker_threads(threads),
        ))
    }

    fn units(count: usize) -> Vec<Arc<ExecutableElement>> {
        (0..count)
            .map(|i| {
                Arc::new(ExecutableElement::method(
                    "app/Units",
                    &format!("m{i}"),
                    MethodDescriptor::void(),
                    ValueType::I32,
                    Modifiers::STATIC,
                ))
            })
            .collect()
    }

    fn returns_answer(_: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder) -> Result<()> {
        b.begin(&BlockLabel::new())?;
        let answer = b.int_literal(ValueType::I32, 42)?;
        b.return_(Some(answer))?;
        Ok(())
    }

    fn returned(ctx: &CompilationContext, graph: &Graph) -> NodeId {
        let block = &graph.blocks()[0];
        match ctx.store().get(block.terminator()).unwrap().as_terminator() {
            Some(Terminator::Return(Some(value))) => *value,
            other => panic!("expected a value return, got {other:?}"),
        }
    }

    #[test]
    fn test_literal_shared_across_workers() {
        let ctx = context(4);
        let mut scheduler = UnitScheduler::new(BuilderPipeline::new());
        let program = scheduler.run(&ctx, &returns_answer, units(64)).unwrap();

        assert_eq!(program.len(), 64);
        let values: HashSet<_> = program
            .graphs()
            .map(|entry| returned(&ctx, entry.value()))
            .collect();
        assert_eq!(values.len(), 1);
        let answer = *values.iter().next().unwrap();
        assert_eq!(ctx.store().literal(answer), Some(&Literal::int(ValueType::I32, 42)));
        assert_eq!(ctx.events.count_kind(EventKind::UnitCompleted), 64);
    }

    #[test]
    fn test_failed_unit_is_isolated() {
        let ctx = context(2);
        let translator = |element: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
            if element.name() == "m3" {
                b.begin(&BlockLabel::new())?;
                b.int_literal(ValueType::I32, 7)?;
                // leaves a successor label unresolved
                b.goto(&BlockLabel::new())?;
                return Ok(());
            }
            returns_answer(element, b)
        };
        let mut scheduler = UnitScheduler::new(BuilderPipeline::standard());
        let elements = units(8);
        let program = scheduler.run(&ctx, &translator, elements.clone()).unwrap();

        assert_eq!(program.len(), 7);
        assert_eq!(program.failure_count(), 1);
        assert!(program.graph(&elements[3]).is_none());
        assert!(matches!(
            program.failure(&elements[3]),
            Some(Error::IncompleteUnit(_))
        ));
        assert_eq!(ctx.events.count_kind(EventKind::UnitFailed), 1);
        assert!(program.graph(&elements[4]).is_some());
    }

    #[test]
    fn test_duplicate_units_compiled_once() {
        let ctx = context(2);
        let calls = AtomicUsize::new(0);
        let translator = |element: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
            calls.fetch_add(1, Ordering::SeqCst);
            returns_answer(element, b)
        };
        let elements = units(3);
        let twice = elements.iter().chain(elements.iter()).cloned();
        let program = UnitScheduler::new(BuilderPipeline::new())
            .run(&ctx, &translator, twice)
            .unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    struct Census {
        seen: Arc<AtomicUsize>,
    }

    impl WholeProgramPass for Census {
        fn name(&self) -> &'static str {
            "census"
        }

        fn run(&mut self, program: &CompiledProgram, _ctx: &CompilationContext) -> Result<bool> {
            self.seen.store(program.len(), Ordering::SeqCst);
            Ok(false)
        }
    }

    #[test]
    fn test_whole_program_passes_see_every_unit() {
        let ctx = context(4);
        let seen = Arc::new(AtomicUsize::new(0));
        let mut scheduler = UnitScheduler::new(BuilderPipeline::new()).with_pass(Census {
            seen: seen.clone(),
        });
        assert_eq!(scheduler.pass_names(), vec!["census"]);

        scheduler.run(&ctx, &returns_answer, units(32)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 32);
        assert_eq!(ctx.events.count_kind(EventKind::PassCompleted), 1);
    }

    #[test]
    fn test_registered_initializers_compiled() {
        let registry = ClassRegistry::new();
        let config = registry.define(
            ClassType::builder("app/Config")
                .extends(registry.root().clone())
                .initializer(true)
                .build(),
        );
        let ctx = Arc::new(CompilationContext::new(
            Arc::new(registry),
            CompilerConfig::default(),
        ));
        let limit = Arc::new(FieldElement::new(
            "app/Config",
            "LIMIT",
            TypeDescriptor::Base(BaseTypeDescriptor::Int),
            ValueType::I32,
            Modifiers::STATIC | Modifiers::FINAL,
        ));

        let translator = move |element: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
            b.begin(&BlockLabel::new())?;
            if element.name() == "main" {
                let value = b.load(ValueHandle::StaticField(limit.clone()), AccessMode::Plain)?;
                b.return_(Some(value))?;
            } else {
                b.return_(None)?;
            }
            Ok(())
        };
        let main = Arc::new(ExecutableElement::method(
            "app/Main",
            "main",
            MethodDescriptor::void(),
            ValueType::I32,
            Modifiers::STATIC,
        ));
        let mut scheduler = UnitScheduler::new(
            BuilderPipeline::new()
                .with(|ctx, next| Box::new(ConstantDefiningBuilder::new(ctx.clone(), next))),
        )
        .with_initializers();
        let program = scheduler.run(&ctx, &translator, vec![main]).unwrap();

        assert_eq!(program.len(), 2);
        assert!(program.graph(config.initializer().unwrap()).is_some());
    }

    #[test]
    fn test_early_termination_finishes_unit() {
        let ctx = context(1);
        let translator = |_: &Arc<ExecutableElement>, b: &mut dyn GraphBuilder| -> Result<()> {
            b.begin(&BlockLabel::new())?;
            let block = b.unreachable()?;
            Err(Error::BlockTerminated(block))
        };
        let program = UnitScheduler::default()
            .run(&ctx, &translator, units(1))
            .unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program.failure_count(), 0);
    }
}
