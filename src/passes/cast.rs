//! Folding of statically decidable reference casts and type tests.

use std::sync::Arc;

use crate::{
    builder::{GraphBuilder, GraphBuilderExt},
    context::CompilationContext,
    events::EventKind,
    graph::{Literal, NodeId},
    passes::record_rewrite,
    types::{ReferenceType, ValueType},
    Result,
};

const PASS: &str = "cast";

/// Removes casts and `instanceof` tests whose outcome follows from the static type of
/// the input.
///
/// - `narrow` and `check_cast` to a supertype of the input's type return the input.
/// - `null instanceof T` is `false`.
/// - `x instanceof T` for a supertype `T` of `x`'s type is `x != null`.
pub struct InstanceOfCheckCastBuilder {
    context: Arc<CompilationContext>,
    next: Box<dyn GraphBuilder>,
}

impl InstanceOfCheckCastBuilder {
    /// Wraps `next`.
    #[must_use]
    pub fn new(context: Arc<CompilationContext>, next: Box<dyn GraphBuilder>) -> Self {
        Self { context, next }
    }

    /// The reference type of `input`, if it is statically an instance of `target`.
    fn static_reference(&self, input: NodeId, target: &ReferenceType) -> Result<Option<ReferenceType>> {
        Ok(match self.context.store().value_type(input)? {
            ValueType::Reference(actual) if actual.instance_of(target) => Some(actual.clone()),
            _ => None,
        })
    }

    fn folded(&mut self, kind: EventKind, input: NodeId, target: &ReferenceType) -> Result<()> {
        let context = self.context.clone();
        record_rewrite(self, &context, kind, PASS, || format!("{input} as {target}"))
    }
}

impl GraphBuilder for InstanceOfCheckCastBuilder {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        Some(self.next.as_mut())
    }

    fn narrow(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        if self.static_reference(input, &target)?.is_some() {
            self.folded(EventKind::CastFolded, input, &target)?;
            return Ok(input);
        }
        self.next("narrow")?.narrow(input, target)
    }

    fn check_cast(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        let is_null = self
            .context
            .store()
            .literal(input)
            .is_some_and(Literal::is_null);
        if is_null || self.static_reference(input, &target)?.is_some() {
            self.folded(EventKind::CastFolded, input, &target)?;
            return Ok(input);
        }
        self.next("check_cast")?.check_cast(input, target)
    }

    fn instance_of(&mut self, input: NodeId, target: ReferenceType) -> Result<NodeId> {
        let literal = self.context.store().literal(input).cloned();
        if let Some(Literal::Null(_) | Literal::Zero(_)) = literal {
            self.folded(EventKind::InstanceOfFolded, input, &target)?;
            return self.bool_literal(false);
        }
        if let Some(actual) = self.static_reference(input, &target)? {
            self.folded(EventKind::InstanceOfFolded, input, &target)?;
            let null = self.null_literal(actual)?;
            return self.next("instance_of")?.is_ne(input, null);
        }
        self.next("instance_of")?.instance_of(input, target)
    }
}
