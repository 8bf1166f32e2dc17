//! Assembly of per-unit builder stacks.

use std::{fmt, sync::Arc};

use crate::{
    builder::{BaseBuilder, GraphBuilder},
    context::CompilationContext,
    passes::{
        ConstantDefiningBuilder, InstanceOfCheckCastBuilder, MemberResolvingBuilder,
        TargetLoweringBuilder,
    },
    types::ExecutableElement,
};

/// Wraps a delegate builder in a pass.
pub type PassConstructor = Arc<
    dyn Fn(&Arc<CompilationContext>, Box<dyn GraphBuilder>) -> Box<dyn GraphBuilder> + Send + Sync,
>;

/// An ordered list of pass constructors.
///
/// The first registered pass is the outermost one: it receives the translator's calls
/// first and forwards its output to the second, and so on down to the [`BaseBuilder`].
/// The pipeline is immutable once built and cheap to clone, so one instance can serve
/// every worker thread.
///
/// ```rust,ignore
/// let pipeline = BuilderPipeline::new()
///     .with(|ctx, next| Box::new(MemberResolvingBuilder::new(ctx.clone(), next)))
///     .with(|ctx, next| Box::new(TargetLoweringBuilder::new(ctx.clone(), next)));
/// let mut builder = pipeline.build(&ctx, element);
/// ```
#[derive(Clone, Default)]
pub struct BuilderPipeline {
    passes: Vec<PassConstructor>,
}

impl BuilderPipeline {
    /// Creates an empty pipeline: units are built directly by the [`BaseBuilder`].
    #[must_use]
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// The default pass order: member resolution, cast folding, native constants, then
    /// target lowering.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(|ctx, next| Box::new(MemberResolvingBuilder::new(ctx.clone(), next)))
            .with(|ctx, next| Box::new(InstanceOfCheckCastBuilder::new(ctx.clone(), next)))
            .with(|ctx, next| Box::new(ConstantDefiningBuilder::new(ctx.clone(), next)))
            .with(|ctx, next| Box::new(TargetLoweringBuilder::new(ctx.clone(), next)))
    }

    /// Appends a pass below every pass registered so far.
    #[must_use]
    pub fn with<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Arc<CompilationContext>, Box<dyn GraphBuilder>) -> Box<dyn GraphBuilder>
            + Send
            + Sync
            + 'static,
    {
        self.passes.push(Arc::new(constructor));
        self
    }

    /// Number of registered passes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Returns `true` if no pass is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Builds a fresh builder stack for one unit.
    #[must_use]
    pub fn build(
        &self,
        context: &Arc<CompilationContext>,
        element: Arc<ExecutableElement>,
    ) -> Box<dyn GraphBuilder> {
        let base: Box<dyn GraphBuilder> = Box::new(BaseBuilder::new(context.clone(), element));
        self.passes
            .iter()
            .rev()
            .fold(base, |inner, constructor| constructor(context, inner))
    }
}

impl fmt::Debug for BuilderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderPipeline")
            .field("passes", &self.passes.len())
            .finish()
    }
}
