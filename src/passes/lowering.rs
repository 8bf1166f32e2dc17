//! Lowering of operations the code generator cannot express directly.

use std::sync::Arc;

use crate::{
    builder::{GraphBuilder, GraphBuilderExt},
    context::CompilationContext,
    events::EventKind,
    graph::{
        AccessMode, BinaryOp, BlockId, BlockLabel, CallFlags, CastKind, Literal, NodeId, UnaryOp,
        ValueHandle,
    },
    passes::record_rewrite,
    types::{FunctionType, ValueType},
    Result,
};

const PASS: &str = "lowering";

/// Rewrites operations into forms the target supports.
///
/// - `min`/`max` become calls to the matching intrinsic for 32- and 64-bit integers and,
///   on CPUs with native support, for floats. Floats elsewhere are emulated with a
///   chain of selects that propagates NaN and orders `-0.0` below `+0.0`; other integer
///   widths become a single select.
/// - Integer negation becomes `0 - v`.
/// - A volatile load becomes an acquire load followed by an acquire fence; a volatile
///   store becomes a release fence followed by a sequentially consistent store.
/// - `try` declares the exception personality function.
///
/// Every intrinsic is declared in the [`CompilationContext`] on first use.
pub struct TargetLoweringBuilder {
    context: Arc<CompilationContext>,
    next: Box<dyn GraphBuilder>,
}

impl TargetLoweringBuilder {
    /// Wraps `next`.
    #[must_use]
    pub fn new(context: Arc<CompilationContext>, next: Box<dyn GraphBuilder>) -> Self {
        Self { context, next }
    }

    fn declare(&mut self, name: &str, ty: FunctionType) -> Result<()> {
        if self.context.declare_function(name, ty) {
            let context = self.context.clone();
            record_rewrite(self, &context, EventKind::FunctionDeclared, PASS, || {
                name.to_string()
            })?;
        }
        Ok(())
    }

    fn min_max(&mut self, is_max: bool, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let op = if is_max { BinaryOp::Max } else { BinaryOp::Min };
        let ty = self.context.store().value_type(lhs)?.clone();
        if self.context.store().value_type(rhs)? != &ty {
            return self.next("binary")?.binary(op, lhs, rhs);
        }
        let func = if is_max { "max" } else { "min" };

        match ty {
            ValueType::Float(bits) if self.context.config().target.has_native_float_min_max() => {
                self.intrinsic(&format!("llvm.{func}imum.f{bits}"), ty, lhs, rhs)
            }
            ValueType::Float(_) => self.emulate_float(is_max, ty, lhs, rhs),
            ValueType::Signed(bits @ (32 | 64)) => {
                self.intrinsic(&format!("llvm.s{func}.i{bits}"), ty, lhs, rhs)
            }
            ValueType::Unsigned(bits @ (32 | 64)) => {
                self.intrinsic(&format!("llvm.u{func}.i{bits}"), ty, lhs, rhs)
            }
            ValueType::Signed(_) | ValueType::Unsigned(_) => {
                let context = self.context.clone();
                record_rewrite(self, &context, EventKind::SelectLowered, PASS, || {
                    format!("{func}({lhs}, {rhs})")
                })?;
                let pick_lhs = if is_max {
                    self.is_gt(lhs, rhs)?
                } else {
                    self.is_lt(lhs, rhs)?
                };
                self.select(pick_lhs, lhs, rhs)
            }
            _ => self.next("binary")?.binary(op, lhs, rhs),
        }
    }

    fn intrinsic(&mut self, name: &str, ty: ValueType, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let function = FunctionType::new(ty.clone(), vec![ty.clone(), ty]);
        self.declare(name, function.clone())?;
        let context = self.context.clone();
        record_rewrite(self, &context, EventKind::IntrinsicLowered, PASS, || {
            format!("{name}({lhs}, {rhs})")
        })?;

        let symbol = self.literal(Literal::symbol(
            name,
            ValueType::Pointer(Box::new(ValueType::Function(Box::new(function)))),
        ))?;
        self.call_function(
            symbol,
            vec![lhs, rhs],
            CallFlags::NO_SIDE_EFFECTS | CallFlags::NO_THROW,
        )
    }

    /// `min`/`max` over floats without a native instruction.
    ///
    /// Ordered operands pick directly. If they compare neither less nor greater they are
    /// equal or unordered: a NaN operand is returned as is, and equal operands (which
    /// includes `-0.0` and `+0.0`) are decided by comparing their bits as signed integers.
    fn emulate_float(&mut self, is_max: bool, ty: ValueType, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let context = self.context.clone();
        record_rewrite(self, &context, EventKind::SelectLowered, PASS, || {
            format!("{}({lhs}, {rhs})", if is_max { "max" } else { "min" })
        })?;
        let Some(bits_type) = ty.same_size_signed() else {
            return Err(malformed_error!("No integer type matches {}", ty));
        };

        let lt = self.is_lt(lhs, rhs)?;
        let gt = self.is_gt(lhs, rhs)?;
        let lhs_not_nan = self.is_eq(lhs, lhs)?;
        let rhs_not_nan = self.is_eq(rhs, rhs)?;
        let lhs_bits = self.cast(CastKind::Bitcast, lhs, bits_type.clone())?;
        let rhs_bits = self.cast(CastKind::Bitcast, rhs, bits_type)?;
        let by_bits = self.min_max(is_max, lhs_bits, rhs_bits)?;
        let by_bits = self.cast(CastKind::Bitcast, by_bits, ty)?;

        let (first, second) = if is_max { (gt, lt) } else { (lt, gt) };
        let unordered = self.select(rhs_not_nan, by_bits, rhs)?;
        let unordered = self.select(lhs_not_nan, unordered, lhs)?;
        let otherwise = self.select(second, rhs, unordered)?;
        self.select(first, lhs, otherwise)
    }
}

impl GraphBuilder for TargetLoweringBuilder {
    fn delegate(&mut self) -> Option<&mut dyn GraphBuilder> {
        Some(self.next.as_mut())
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        match op {
            BinaryOp::Min => self.min_max(false, lhs, rhs),
            BinaryOp::Max => self.min_max(true, lhs, rhs),
            _ => self.next("binary")?.binary(op, lhs, rhs),
        }
    }

    fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId> {
        let ty = self.context.store().value_type(input)?.clone();
        if op == UnaryOp::Negate && ty.is_integer() {
            let zero = self.literal(Literal::int(ty, 0))?;
            return self.next("unary")?.sub(zero, input);
        }
        self.next("unary")?.unary(op, input)
    }

    fn load(&mut self, handle: ValueHandle, mode: AccessMode) -> Result<NodeId> {
        if mode != AccessMode::Volatile {
            return self.next("load")?.load(handle, mode);
        }
        let context = self.context.clone();
        record_rewrite(self, &context, EventKind::VolatileLowered, PASS, || {
            "volatile load".to_string()
        })?;
        let loaded = self.next("load")?.load(handle, AccessMode::Acquire)?;
        self.fence(AccessMode::Acquire)?;
        Ok(loaded)
    }

    fn store(&mut self, handle: ValueHandle, value: NodeId, mode: AccessMode) -> Result<NodeId> {
        if mode != AccessMode::Volatile {
            return self.next("store")?.store(handle, value, mode);
        }
        let context = self.context.clone();
        record_rewrite(self, &context, EventKind::VolatileLowered, PASS, || {
            "volatile store".to_string()
        })?;
        self.fence(AccessMode::Release)?;
        self.next("store")?.store(handle, value, AccessMode::SeqCst)
    }

    fn try_(&mut self, operation: NodeId, resume: &BlockLabel, handler: &BlockLabel) -> Result<BlockId> {
        let personality = self.context.config().target.personality_function.clone();
        self.declare(&personality, FunctionType::new(ValueType::I32, Vec::new()))?;
        self.next("try")?.try_(operation, resume, handler)
    }
}
