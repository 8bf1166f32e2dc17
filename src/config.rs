//! Configuration for a compilation session.
//!
//! The configuration is fixed for the whole session and shared by every unit's builder
//! pipeline through the [`CompilationContext`](crate::context::CompilationContext).

use std::fmt;

use strum::EnumIter;

/// Target CPU families with distinct lowering needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum Cpu {
    /// x86-64
    #[default]
    X86_64,
    /// 64-bit ARM
    Aarch64,
    /// 32-bit x86
    X86,
    /// 32-bit ARM
    Arm,
}

impl Cpu {
    /// Native pointer width in bits.
    #[must_use]
    pub const fn pointer_bits(self) -> u16 {
        match self {
            Self::X86_64 | Self::Aarch64 => 64,
            Self::X86 | Self::Arm => 32,
        }
    }

    /// Name of the CPU family as used in target triples.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::X86 => "i686",
            Self::Arm => "arm",
        }
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Properties of the compilation target that influence lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Target CPU family.
    pub cpu: Cpu,

    /// Native pointer width in bits (default: derived from the CPU).
    pub pointer_bits: u16,

    /// Name of the exception personality function declared for units containing `try`.
    pub personality_function: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::for_cpu(Cpu::default())
    }
}

impl TargetConfig {
    /// Creates the configuration for a CPU with its native pointer width.
    #[must_use]
    pub fn for_cpu(cpu: Cpu) -> Self {
        Self {
            cpu,
            pointer_bits: cpu.pointer_bits(),
            personality_function: "personality".to_string(),
        }
    }

    /// Whether the target has min/max instructions with the required float semantics
    /// (NaN propagation, `-0.0 < +0.0`).
    #[must_use]
    pub const fn has_native_float_min_max(&self) -> bool {
        matches!(self.cpu, Cpu::Aarch64)
    }
}

/// Configuration for a compilation session.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Number of worker threads compiling units (0 = rayon default, one per core).
    pub worker_threads: usize,

    /// Compilation target.
    pub target: TargetConfig,

    /// Record an event for every rewrite made by a builder pass (default: false).
    pub record_rewrites: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            target: TargetConfig::default(),
            record_rewrites: false,
        }
    }
}

impl CompilerConfig {
    /// Sets the target CPU.
    #[must_use]
    pub fn with_cpu(mut self, cpu: Cpu) -> Self {
        self.target = TargetConfig::for_cpu(cpu);
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Enables recording of rewrite events.
    #[must_use]
    pub fn with_rewrite_events(mut self) -> Self {
        self.record_rewrites = true;
        self
    }
}
