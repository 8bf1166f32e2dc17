//! Value nodes: typed computations that produce a result.
//!
//! A [`Value`] is the pair of an operation ([`ValueOp`]) and its static result type. Its
//! derived `Eq`/`Hash` are structural over both, which makes a `Value` directly usable as
//! the hash-consing key of the node store: two pure values with the same operator, type
//! and operand identities collapse to one node.
//!
//! Not every value may be collapsed. Values with *identity* ([`Value::has_identity`]) are
//! never interned, because two constructions denote two distinct runtime events:
//!
//! - allocations (`new`, `new-array`),
//! - reads of memory and other ordered operations (loads, checked casts, invocations of
//!   members that may have side effects),
//! - method parameters, which are distinct per unit.
//!
//! Commutative binary operands are put in canonical order by the builder before the key is
//! formed, so `a + b` and `b + a` produce the same key.

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use strum::{EnumCount, EnumIter};

use crate::{
    graph::NodeId,
    types::{ClassType, ExecutableElement, FieldElement, ReferenceType, ValueType},
};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum BinaryOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Remainder
    Rem,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise xor
    Xor,
    /// Shift left
    Shl,
    /// Shift right (arithmetic for signed, logical for unsigned operands)
    Shr,
    /// Equality comparison
    CmpEq,
    /// Inequality comparison
    CmpNe,
    /// Less-than comparison
    CmpLt,
    /// Greater-than comparison
    CmpGt,
    /// Less-or-equal comparison
    CmpLe,
    /// Greater-or-equal comparison
    CmpGe,
    /// Minimum of both operands
    Min,
    /// Maximum of both operands
    Max,
}

impl BinaryOp {
    /// Returns `true` if the operands may be swapped without changing the result.
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Mul
                | Self::And
                | Self::Or
                | Self::Xor
                | Self::CmpEq
                | Self::CmpNe
                | Self::Min
                | Self::Max
        )
    }

    /// Returns `true` for comparisons, whose result type is `bool`.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::CmpEq | Self::CmpNe | Self::CmpLt | Self::CmpGt | Self::CmpLe | Self::CmpGe
        )
    }

    /// Mnemonic used by the graph printer.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Shl => "shl",
            Self::Shr => "shr",
            Self::CmpEq => "cmp.eq",
            Self::CmpNe => "cmp.ne",
            Self::CmpLt => "cmp.lt",
            Self::CmpGt => "cmp.gt",
            Self::CmpLe => "cmp.le",
            Self::CmpGe => "cmp.ge",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum UnaryOp {
    /// Arithmetic negation
    Negate,
    /// Bitwise (or logical, for `bool`) complement
    Not,
}

/// Conversion kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum CastKind {
    /// Integer truncation to a narrower width
    Truncate,
    /// Sign or zero extension to a wider width
    Extend,
    /// Reinterpretation of the bits as another type of the same width
    Bitcast,
    /// Numeric conversion between integer and floating point
    Convert,
    /// Reference narrowing whose validity was proven (no runtime check)
    Narrow,
}

/// How an instance invocation selects its implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum DispatchKind {
    /// Non-virtual: private methods and `super` calls
    Exact,
    /// Virtual dispatch on the receiver's class
    Virtual,
    /// Interface dispatch
    Interface,
}

/// Memory ordering of loads, stores and fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum AccessMode {
    /// No ordering beyond the program order of the ordering chain
    Plain,
    /// Source-level volatile access, lowered by the target pass
    Volatile,
    /// Acquire ordering
    Acquire,
    /// Release ordering
    Release,
    /// Sequentially consistent ordering
    SeqCst,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Attributes of a native function call
    pub struct CallFlags: u8 {
        /// The callee has no observable side effects
        const NO_SIDE_EFFECTS = 0x01;
        /// The callee never returns normally
        const NO_RETURN = 0x02;
        /// The callee never raises an exception
        const NO_THROW = 0x04;
    }
}

/// Compile-time literal values.
///
/// Integer literals are reduced to the width of their type when created, so equal values
/// of one type are always structurally equal. Float literals store the bits of their `f64`
/// value so that literals are hashable; `f32` literals are rounded to single precision
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// An integer of the given integer type
    Int {
        /// Integer type
        ty: ValueType,
        /// Value truncated to the type's width, sign-extended for signed types and
        /// zero-extended for unsigned ones (a 64-bit unsigned value keeps its bit pattern)
        value: i64,
    },
    /// A floating point number of the given float type
    Float {
        /// Float type
        ty: ValueType,
        /// `f64::to_bits` of the value
        bits: u64,
    },
    /// A boolean
    Bool(bool),
    /// The null reference of the given reference type
    Null(ValueType),
    /// The all-zero value of the given type
    Zero(ValueType),
    /// An unspecified value of the given type
    Undefined(ValueType),
    /// Placeholder for a compile-time constant whose value is determined later
    Constant(ValueType),
    /// A type, as a value (type id)
    Type(ValueType),
    /// The address of a named symbol
    Symbol {
        /// Symbol name
        name: Arc<str>,
        /// Symbol type, usually a pointer to a function type
        ty: ValueType,
    },
}

impl Literal {
    /// Creates an integer literal.
    #[must_use]
    pub fn int(ty: ValueType, value: i64) -> Self {
        let value = match ty {
            ValueType::Signed(bits @ 1..=63) => {
                let shift = 64 - u32::from(bits);
                (value << shift) >> shift
            }
            ValueType::Unsigned(bits @ 1..=63) => (value as u64 & (u64::MAX >> (64 - bits))) as i64,
            _ => value,
        };
        Self::Int { ty, value }
    }

    /// Creates a floating point literal.
    #[must_use]
    pub fn float(ty: ValueType, value: f64) -> Self {
        let value = match ty {
            ValueType::Float(32) => f64::from(value as f32),
            _ => value,
        };
        Self::Float {
            ty,
            bits: value.to_bits(),
        }
    }

    /// Creates a symbol literal.
    #[must_use]
    pub fn symbol(name: &str, ty: ValueType) -> Self {
        Self::Symbol {
            name: Arc::from(name),
            ty,
        }
    }

    /// The static type of the literal.
    #[must_use]
    pub fn ty(&self) -> ValueType {
        match self {
            Self::Int { ty, .. }
            | Self::Float { ty, .. }
            | Self::Null(ty)
            | Self::Zero(ty)
            | Self::Undefined(ty)
            | Self::Constant(ty)
            | Self::Symbol { ty, .. } => ty.clone(),
            Self::Bool(_) => ValueType::Bool,
            Self::Type(_) => ValueType::Unsigned(32),
        }
    }

    /// Integer value, for integer literals.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Float value, for float literals.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float { bits, .. } => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// Returns `true` for a float literal holding NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.as_float().is_some_and(f64::is_nan)
    }

    /// Returns `true` for the null literal.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Returns `true` for the compile-time-constant placeholder.
    #[must_use]
    pub const fn is_constant_placeholder(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { ty, value } => write!(f, "{ty} {value}"),
            Self::Float { ty, bits } => write!(f, "{ty} {}", f64::from_bits(*bits)),
            Self::Bool(value) => write!(f, "bool {value}"),
            Self::Null(ty) => write!(f, "{ty} null"),
            Self::Zero(ty) => write!(f, "{ty} zeroinitializer"),
            Self::Undefined(ty) => write!(f, "{ty} undef"),
            Self::Constant(ty) => write!(f, "{ty} constant"),
            Self::Type(ty) => write!(f, "typeof {ty}"),
            Self::Symbol { name, ty } => write!(f, "{ty} @{name}"),
        }
    }
}

/// A memory location that can be loaded from or stored to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueHandle {
    /// A static field
    StaticField(Arc<FieldElement>),
    /// A field of the given object
    InstanceField {
        /// Resolved field
        field: Arc<FieldElement>,
        /// Object reference
        instance: NodeId,
    },
    /// An element of an array object
    Element {
        /// Array reference
        array: NodeId,
        /// Element index
        index: NodeId,
        /// Element type
        ty: ValueType,
    },
    /// Memory addressed by a native pointer
    Pointer {
        /// Pointer value
        pointer: NodeId,
        /// Pointee type
        ty: ValueType,
    },
}

impl ValueHandle {
    /// The type of the value stored at the location.
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        match self {
            Self::StaticField(field) | Self::InstanceField { field, .. } => field.ty(),
            Self::Element { ty, .. } | Self::Pointer { ty, .. } => ty,
        }
    }

    /// The field accessed through this handle, if any.
    #[must_use]
    pub fn field(&self) -> Option<&Arc<FieldElement>> {
        match self {
            Self::StaticField(field) | Self::InstanceField { field, .. } => Some(field),
            _ => None,
        }
    }

    pub(crate) fn push_dependencies(&self, out: &mut Vec<NodeId>) {
        match self {
            Self::StaticField(_) => {}
            Self::InstanceField { instance, .. } => out.push(*instance),
            Self::Element { array, index, .. } => {
                out.push(*array);
                out.push(*index);
            }
            Self::Pointer { pointer, .. } => out.push(*pointer),
        }
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticField(field) => write!(f, "static {}.{}", field.owner(), field.name()),
            Self::InstanceField { field, instance } => write!(f, "{instance}.{}", field.name()),
            Self::Element { array, index, .. } => write!(f, "{array}[{index}]"),
            Self::Pointer { pointer, .. } => write!(f, "*{pointer}"),
        }
    }
}

/// The operation of a value node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueOp {
    /// A literal constant
    Literal(Literal),
    /// The n-th parameter of the unit
    Parameter(u32),
    /// A binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand (canonical order for commutative operators)
        lhs: NodeId,
        /// Right operand
        rhs: NodeId,
    },
    /// A unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        input: NodeId,
    },
    /// A type conversion to the value's type
    Cast {
        /// Conversion kind
        kind: CastKind,
        /// Converted value
        input: NodeId,
    },
    /// Conditional selection without control flow
    Select {
        /// Boolean condition
        condition: NodeId,
        /// Result if the condition holds
        if_true: NodeId,
        /// Result otherwise
        if_false: NodeId,
    },
    /// Runtime subtype test
    InstanceOf {
        /// Tested reference
        input: NodeId,
        /// Tested type
        target: ReferenceType,
    },
    /// Checked reference cast, raising on failure
    CheckCast {
        /// Cast reference
        input: NodeId,
        /// Target type
        target: ReferenceType,
    },
    /// Allocation of an instance
    New(Arc<ClassType>),
    /// Allocation of an array; the element type is part of the value type
    NewArray {
        /// Number of elements
        length: NodeId,
    },
    /// Memory read
    Load {
        /// Read location
        handle: ValueHandle,
        /// Memory ordering
        mode: AccessMode,
    },
    /// Call of a native function pointer
    CallFunction {
        /// Function pointer or symbol
        function: NodeId,
        /// Arguments
        args: Vec<NodeId>,
        /// Call attributes
        flags: CallFlags,
    },
    /// Static method invocation producing a value
    InvokeStatic {
        /// Resolved target
        target: Arc<ExecutableElement>,
        /// Arguments
        args: Vec<NodeId>,
    },
    /// Instance method invocation producing a value
    InvokeInstance {
        /// Dispatch kind
        kind: DispatchKind,
        /// Resolved target
        target: Arc<ExecutableElement>,
        /// Receiver
        receiver: NodeId,
        /// Arguments
        args: Vec<NodeId>,
    },
    /// Constructor invocation; the value is the initialized receiver
    InvokeConstructor {
        /// Resolved constructor
        target: Arc<ExecutableElement>,
        /// Allocated, uninitialized receiver
        receiver: NodeId,
        /// Arguments
        args: Vec<NodeId>,
    },
}

/// A typed value: operation plus static result type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    op: ValueOp,
    ty: ValueType,
}

impl Value {
    /// Creates a value.
    #[must_use]
    pub fn new(op: ValueOp, ty: ValueType) -> Self {
        Self { op, ty }
    }

    /// Creates a literal value, typed by the literal.
    #[must_use]
    pub fn literal(literal: Literal) -> Self {
        let ty = literal.ty();
        Self::new(ValueOp::Literal(literal), ty)
    }

    /// The operation.
    #[must_use]
    pub fn op(&self) -> &ValueOp {
        &self.op
    }

    /// The static result type. Total and side-effect free.
    #[must_use]
    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// The literal, if this is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.op {
            ValueOp::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Returns `true` for allocation-introducing values.
    #[must_use]
    pub const fn is_allocation(&self) -> bool {
        matches!(self.op, ValueOp::New(_) | ValueOp::NewArray { .. })
    }

    /// Returns `true` if two constructions of this value must stay distinct nodes.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        match &self.op {
            ValueOp::Parameter(_)
            | ValueOp::New(_)
            | ValueOp::NewArray { .. }
            | ValueOp::Load { .. }
            | ValueOp::CheckCast { .. }
            | ValueOp::InvokeConstructor { .. } => true,
            ValueOp::InvokeStatic { target, .. } | ValueOp::InvokeInstance { target, .. } => {
                target.has_side_effects()
            }
            ValueOp::CallFunction { flags, .. } => !flags.contains(CallFlags::NO_SIDE_EFFECTS),
            _ => false,
        }
    }

    /// Returns `true` if the value takes part in its block's ordering chain.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.has_identity() && !matches!(self.op, ValueOp::Parameter(_))
    }

    /// Returns `true` if the value can raise an exception and may be wrapped by a `try`.
    ///
    /// Only ordered values qualify, since `try` wraps the head of the ordering chain.
    /// Interned calls (no-side-effects targets and function calls flagged alike) are never
    /// triable; an exception they raise propagates to the enclosing handler.
    #[must_use]
    pub fn is_triable(&self) -> bool {
        if !self.is_ordered() {
            return false;
        }
        match &self.op {
            ValueOp::CheckCast { .. }
            | ValueOp::InvokeStatic { .. }
            | ValueOp::InvokeInstance { .. }
            | ValueOp::InvokeConstructor { .. } => true,
            ValueOp::CallFunction { flags, .. } => !flags.contains(CallFlags::NO_THROW),
            _ => false,
        }
    }

    pub(crate) fn push_dependencies(&self, out: &mut Vec<NodeId>) {
        match &self.op {
            ValueOp::Literal(_) | ValueOp::Parameter(_) | ValueOp::New(_) => {}
            ValueOp::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            ValueOp::Unary { input, .. }
            | ValueOp::Cast { input, .. }
            | ValueOp::InstanceOf { input, .. }
            | ValueOp::CheckCast { input, .. } => out.push(*input),
            ValueOp::Select {
                condition,
                if_true,
                if_false,
            } => out.extend([*condition, *if_true, *if_false]),
            ValueOp::NewArray { length } => out.push(*length),
            ValueOp::Load { handle, .. } => handle.push_dependencies(out),
            ValueOp::CallFunction { function, args, .. } => {
                out.push(*function);
                out.extend(args.iter().copied());
            }
            ValueOp::InvokeStatic { args, .. } => out.extend(args.iter().copied()),
            ValueOp::InvokeInstance { receiver, args, .. }
            | ValueOp::InvokeConstructor { receiver, args, .. } => {
                out.push(*receiver);
                out.extend(args.iter().copied());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            ValueOp::Literal(literal) => write!(f, "{literal}"),
            ValueOp::Parameter(index) => write!(f, "param {index} : {}", self.ty),
            ValueOp::Binary { op, lhs, rhs } => {
                write!(f, "{} {lhs}, {rhs} : {}", op.mnemonic(), self.ty)
            }
            ValueOp::Unary { op, input } => write!(f, "{op:?} {input} : {}", self.ty),
            ValueOp::Cast { kind, input } => write!(f, "{kind:?} {input} to {}", self.ty),
            ValueOp::Select {
                condition,
                if_true,
                if_false,
            } => write!(f, "select {condition}, {if_true}, {if_false} : {}", self.ty),
            ValueOp::InstanceOf { input, target } => write!(f, "instanceof {input}, {target}"),
            ValueOp::CheckCast { input, target } => write!(f, "checkcast {input}, {target}"),
            ValueOp::New(class) => write!(f, "new {}", class.name()),
            ValueOp::NewArray { length } => write!(f, "newarray {} [{length}]", self.ty),
            ValueOp::Load { handle, mode } => write!(f, "load {mode:?} {handle} : {}", self.ty),
            ValueOp::CallFunction { function, args, .. } => {
                write!(f, "call {function}")?;
                write_args(f, args)
            }
            ValueOp::InvokeStatic { target, args } => {
                write!(f, "invokestatic {target}")?;
                write_args(f, args)
            }
            ValueOp::InvokeInstance {
                kind,
                target,
                receiver,
                args,
            } => {
                write!(f, "invoke {kind:?} {receiver}.{target}")?;
                write_args(f, args)
            }
            ValueOp::InvokeConstructor {
                target,
                receiver,
                args,
            } => {
                write!(f, "construct {receiver}.{target}")?;
                write_args(f, args)
            }
        }
    }
}

pub(crate) fn write_args(f: &mut fmt::Formatter<'_>, args: &[NodeId]) -> fmt::Result {
    f.write_str("(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::types::{MethodDescriptor, Modifiers};

    #[test]
    fn test_commutative_ops() {
        let commutative: Vec<_> = BinaryOp::iter().filter(|op| op.is_commutative()).collect();
        assert_eq!(commutative.len(), 9);
        assert!(!BinaryOp::Sub.is_commutative());
        assert!(!BinaryOp::CmpLt.is_commutative());
        assert_eq!(BinaryOp::COUNT, 18);
    }

    #[test]
    fn test_int_literals_reduced_to_width() {
        assert_eq!(Literal::int(ValueType::I32, 1 << 32), Literal::int(ValueType::I32, 0));
        assert_eq!(Literal::int(ValueType::I32, 0xffff_ffff).as_int(), Some(-1));
        assert_eq!(Literal::int(ValueType::Signed(8), 200).as_int(), Some(-56));
        assert_eq!(Literal::int(ValueType::Unsigned(16), -1).as_int(), Some(0xffff));
        assert_eq!(Literal::int(ValueType::Unsigned(64), -1).as_int(), Some(-1));
        assert_eq!(Literal::int(ValueType::I64, i64::MIN).as_int(), Some(i64::MIN));
    }

    #[test]
    fn test_f32_literals_rounded() {
        let tenth = Literal::float(ValueType::F32, 0.1);
        assert_eq!(tenth.as_float(), Some(f64::from(0.1f32)));
        assert_eq!(tenth, Literal::float(ValueType::F32, f64::from(0.1f32)));
        assert_eq!(Literal::float(ValueType::F64, 0.1).as_float(), Some(0.1));
    }

    #[test]
    fn test_calls_triable_only_when_ordered() {
        let call = |flags| {
            Value::new(
                ValueOp::CallFunction {
                    function: NodeId::new(0),
                    args: Vec::new(),
                    flags,
                },
                ValueType::I32,
            )
        };
        assert!(call(CallFlags::empty()).is_triable());
        assert!(!call(CallFlags::NO_THROW).is_triable());
        assert!(!call(CallFlags::NO_SIDE_EFFECTS).is_triable());
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(Literal::int(ValueType::I64, 7).ty(), ValueType::I64);
        assert_eq!(Literal::Bool(true).ty(), ValueType::Bool);
        assert!(Literal::float(ValueType::F32, f64::NAN).is_nan());
        assert!(!Literal::float(ValueType::F32, 1.5).is_nan());
        assert_eq!(Literal::float(ValueType::F64, 2.0).as_float(), Some(2.0));
    }

    #[test]
    fn test_identity_classification() {
        let pure = Arc::new(ExecutableElement::method(
            "Math",
            "abs",
            MethodDescriptor::void(),
            ValueType::I32,
            Modifiers::STATIC | Modifiers::NO_SIDE_EFFECTS,
        ));
        let impure = Arc::new(ExecutableElement::method(
            "System",
            "nanoTime",
            MethodDescriptor::void(),
            ValueType::I64,
            Modifiers::STATIC,
        ));

        let pure_call = Value::new(
            ValueOp::InvokeStatic {
                target: pure,
                args: Vec::new(),
            },
            ValueType::I32,
        );
        assert!(!pure_call.has_identity());
        assert!(!pure_call.is_ordered());
        assert!(!pure_call.is_triable());

        let impure_call = Value::new(
            ValueOp::InvokeStatic {
                target: impure,
                args: Vec::new(),
            },
            ValueType::I64,
        );
        assert!(impure_call.has_identity());
        assert!(impure_call.is_ordered());

        let param = Value::new(ValueOp::Parameter(0), ValueType::I32);
        assert!(param.has_identity());
        assert!(!param.is_ordered());

        let literal = Value::literal(Literal::int(ValueType::I32, 1));
        assert!(!literal.has_identity());
        assert!(!literal.is_triable());
    }

    #[test]
    fn test_dependencies() {
        let select = Value::new(
            ValueOp::Select {
                condition: NodeId::new(1),
                if_true: NodeId::new(2),
                if_false: NodeId::new(3),
            },
            ValueType::I32,
        );
        let mut deps = Vec::new();
        select.push_dependencies(&mut deps);
        assert_eq!(deps, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }
}
