//! Compilation of many units and the whole-program phase.
//!
//! This module sits on top of the per-unit graph construction:
//!
//! - [`crate::builder`] - one unit's builder stack, driven by a translator
//! - [`crate::passes`] - the builder passes and whole-program passes
//! - [`compiler`](self) - parallel scheduling of units, the barrier, whole-program passes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compilation Session                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilationContext           Shared state of all units          │
//! │    ├─ NodeStore                (arena, hash-consing table)       │
//! │    ├─ Registries               (functions, initializers)         │
//! │    ├─ Attachments              (linkage errors, constants, ids)  │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  UnitScheduler                Two-phase execution                │
//! │    ├─ Phase 1: Units           (parallel, rayon pool)            │
//! │    │    each unit: BuilderPipeline → translator → finish → DCE   │
//! │    ├─ Barrier                  (pool drained)                    │
//! │    └─ Phase 2: Program         (WholeProgramPass, sequential)    │
//! │                                                                  │
//! │  CompiledProgram              Graphs of surviving units,         │
//! │                               errors of failed ones              │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = Arc::new(CompilationContext::new(classes, CompilerConfig::default()));
//! let mut scheduler = UnitScheduler::default();
//! let program = scheduler.run(&ctx, &translator, entry_points)?;
//!
//! let ids = TypeIds::get(&ctx)?;
//! for element in program.elements() {
//!     println!("{element}");
//! }
//! ```

mod pass;
mod program;
mod scheduler;

pub use pass::WholeProgramPass;
pub use program::CompiledProgram;
pub use scheduler::{UnitScheduler, UnitTranslator};
