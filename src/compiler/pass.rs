//! Whole-program pass trait.

use crate::{compiler::CompiledProgram, context::CompilationContext, Result};

/// A pass over every graph of the program, run after all units are built.
///
/// Whole-program passes run sequentially, in registration order, once the scheduler's
/// worker pool has drained. They observe the complete set of surviving graphs and may
/// publish their results as [`CompilationContext`] attachments for code generation.
///
/// # Thread Safety
///
/// Passes must be `Send + Sync` so that a configured [`UnitScheduler`](crate::compiler::UnitScheduler)
/// can be shared across threads, even though the passes themselves run on the calling
/// thread.
///
/// # Example
///
/// ```rust,ignore
/// struct CountNodes;
///
/// impl WholeProgramPass for CountNodes {
///     fn name(&self) -> &'static str {
///         "count-nodes"
///     }
///
///     fn run(&mut self, program: &CompiledProgram, ctx: &CompilationContext) -> Result<bool> {
///         let total: usize = program.graphs().map(|entry| entry.value().nodes().len()).sum();
///         ctx.events.info(format!("{total} nodes"));
///         Ok(false)
///     }
/// }
/// ```
pub trait WholeProgramPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Should this pass run on the given program?
    ///
    /// Called before `initialize`. Override to skip the pass, e.g. for empty programs.
    fn should_run(&self, _program: &CompiledProgram, _ctx: &CompilationContext) -> bool {
        true
    }

    /// Runs the pass.
    ///
    /// Returns `true` if the pass changed any graph or published new results.
    /// Events should be recorded directly to `ctx.events`.
    ///
    /// # Arguments
    ///
    /// * `program` - The graphs of every successfully compiled unit.
    /// * `ctx` - The session context.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails. The remaining passes are not run.
    fn run(&mut self, program: &CompiledProgram, ctx: &CompilationContext) -> Result<bool>;

    /// Called once before `run`.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    fn initialize(&mut self, _ctx: &CompilationContext) -> Result<()> {
        Ok(())
    }

    /// Called once after `run` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    fn finalize(&mut self, _ctx: &CompilationContext) -> Result<()> {
        Ok(())
    }

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
