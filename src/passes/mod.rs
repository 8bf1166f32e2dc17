//! Rewriting passes.
//!
//! Every pass except the whole-program [`TypeIdAssigner`] is a delegating
//! [`GraphBuilder`](crate::builder::GraphBuilder): it sits in a unit's builder stack,
//! overrides the operations it rewrites and forwards everything else unchanged.
//!
//! # Available Passes
//!
//! | Pass | Rewrites |
//! |------|----------|
//! | [`MemberResolvingBuilder`] | Symbolic member references into resolved elements, or a thrown linkage error |
//! | [`InstanceOfCheckCastBuilder`] | Statically decidable `instanceof` and checked casts |
//! | [`ConstantDefiningBuilder`] | Native constant markers and initializer registration |
//! | [`TargetLoweringBuilder`] | `min`/`max`, integer negation, volatile accesses, `try` |
//! | [`TypeIdAssigner`] | Assigns type ids to every referenced class, after all units |
//!
//! Passes record an event for each rewrite when
//! [`CompilerConfig::record_rewrites`](crate::config::CompilerConfig::record_rewrites) is
//! set.

mod cast;
mod lowering;
mod native;
mod resolve;
mod typeids;

pub use cast::InstanceOfCheckCastBuilder;
pub use lowering::TargetLoweringBuilder;
pub use native::{ConstantProbe, ConstantDefiningBuilder, NativeConstants, NATIVE_CLASS};
pub use resolve::{LinkageErrors, MemberResolvingBuilder};
pub use typeids::{TypeIdAssigner, TypeIdRange, TypeIds};

use crate::{
    builder::GraphBuilder, context::CompilationContext, events::EventKind, Result,
};

/// Records a rewrite event at the builder's current location, if rewrite recording is on.
fn record_rewrite(
    builder: &mut dyn GraphBuilder,
    context: &CompilationContext,
    kind: EventKind,
    pass: &'static str,
    message: impl FnOnce() -> String,
) -> Result<()> {
    if !context.config().record_rewrites {
        return Ok(());
    }
    let location = builder.location()?;
    context
        .events
        .record(kind)
        .at(location)
        .pass(pass)
        .message(message());
    Ok(())
}
