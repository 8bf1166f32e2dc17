//! Value types carried by graph values.
//!
//! The graph core only needs a small, structural view of the type system: enough to type
//! every value, to tell floating types apart (for NaN reasoning), to size integers (for
//! truncation and intrinsic selection) and to reason about reference subtyping (for
//! checkcast/instanceof folding). The full type hierarchy lives outside this crate; the
//! types here are its hashable projection.

use std::{fmt, sync::Arc};

use crate::types::ClassType;

/// The static type of a graph value.
///
/// Types are structural and hashable so that they can participate in the hash-consing
/// key of pure values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value (result type of void invocations).
    Void,
    /// A boolean.
    Bool,
    /// A signed integer with the given bit width.
    Signed(u16),
    /// An unsigned integer with the given bit width.
    Unsigned(u16),
    /// An IEEE-754 floating point number with the given bit width.
    Float(u16),
    /// A reference to a heap object.
    Reference(ReferenceType),
    /// A native pointer to a value of the pointee type.
    Pointer(Box<ValueType>),
    /// A native, fixed-length array.
    Array {
        /// Element type.
        element: Box<ValueType>,
        /// Number of elements.
        length: u64,
    },
    /// A function type, used to type function symbols.
    Function(Box<FunctionType>),
    /// The type of values that must never be used (e.g. a constant whose type is not yet known).
    Poison,
}

impl ValueType {
    /// 32-bit signed integer.
    pub const I32: ValueType = ValueType::Signed(32);
    /// 64-bit signed integer.
    pub const I64: ValueType = ValueType::Signed(64);
    /// 32-bit float.
    pub const F32: ValueType = ValueType::Float(32);
    /// 64-bit float.
    pub const F64: ValueType = ValueType::Float(64);

    /// Creates a non-nullable reference type to instances of `class`.
    #[must_use]
    pub fn reference(class: Arc<ClassType>) -> Self {
        Self::Reference(ReferenceType::new(class, 0))
    }

    /// Returns `true` for floating point types, the only types whose values can be NaN.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Returns `true` for signed and unsigned integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Signed(_) | Self::Unsigned(_))
    }

    /// Returns `true` for word types (integers, floats, booleans and pointers).
    #[must_use]
    pub const fn is_word(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Signed(_) | Self::Unsigned(_) | Self::Float(_) | Self::Pointer(_)
        )
    }

    /// Returns the bit width of a word type.
    ///
    /// Pointers report `pointer_bits` since their width is a property of the target.
    #[must_use]
    pub fn min_bits(&self, pointer_bits: u16) -> Option<u16> {
        match self {
            Self::Bool => Some(1),
            Self::Signed(bits) | Self::Unsigned(bits) | Self::Float(bits) => Some(*bits),
            Self::Pointer(_) => Some(pointer_bits),
            _ => None,
        }
    }

    /// Returns the signed integer type with the same width as this float type.
    #[must_use]
    pub fn same_size_signed(&self) -> Option<ValueType> {
        match self {
            Self::Float(bits) | Self::Unsigned(bits) | Self::Signed(bits) => {
                Some(Self::Signed(*bits))
            }
            _ => None,
        }
    }

    /// Returns the reference type if this is a reference.
    #[must_use]
    pub fn as_reference(&self) -> Option<&ReferenceType> {
        match self {
            Self::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::Signed(bits) => write!(f, "s{bits}"),
            Self::Unsigned(bits) => write!(f, "u{bits}"),
            Self::Float(bits) => write!(f, "f{bits}"),
            Self::Reference(reference) => write!(f, "{reference}"),
            Self::Pointer(pointee) => write!(f, "{pointee}*"),
            Self::Array { element, length } => write!(f, "[{length} x {element}]"),
            Self::Function(function) => write!(f, "{function}"),
            Self::Poison => f.write_str("poison"),
        }
    }
}

/// A reference to an object: a class instance or an array of `dimensions` dimensions whose
/// leaf element type is `class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceType {
    class: Arc<ClassType>,
    dimensions: u32,
    nullable: bool,
}

impl ReferenceType {
    /// Creates a non-nullable reference type.
    #[must_use]
    pub fn new(class: Arc<ClassType>, dimensions: u32) -> Self {
        Self {
            class,
            dimensions,
            nullable: false,
        }
    }

    /// The leaf class of the referenced object.
    #[must_use]
    pub fn class(&self) -> &Arc<ClassType> {
        &self.class
    }

    /// Number of array dimensions (0 for plain class instances).
    #[must_use]
    pub const fn dimensions(&self) -> u32 {
        self.dimensions
    }

    /// Whether `null` is a member of this type.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the nullable variant of this type.
    #[must_use]
    pub fn as_nullable(&self) -> Self {
        Self {
            nullable: true,
            ..self.clone()
        }
    }

    /// Returns `true` if every instance of `self` is statically known to be an instance of `other`.
    #[must_use]
    pub fn instance_of(&self, other: &ReferenceType) -> bool {
        if other.dimensions == 0 && other.class.is_root() {
            return true;
        }
        self.dimensions == other.dimensions && self.class.is_subtype_of(&other.class)
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref<{}", self.class.name())?;
        for _ in 0..self.dimensions {
            f.write_str("[]")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        f.write_str(">")
    }
}

/// The signature of a native function symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    /// Return type.
    pub ret: ValueType,
    /// Parameter types.
    pub params: Vec<ValueType>,
}

impl FunctionType {
    /// Creates a new function type.
    #[must_use]
    pub fn new(ret: ValueType, params: Vec<ValueType>) -> Self {
        Self { ret, params }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ret)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassType;

    #[test]
    fn test_float_and_integer_predicates() {
        assert!(ValueType::F32.is_float());
        assert!(!ValueType::I32.is_float());
        assert!(ValueType::Unsigned(16).is_integer());
        assert_eq!(ValueType::F64.same_size_signed(), Some(ValueType::I64));
        assert_eq!(ValueType::Bool.min_bits(64), Some(1));
        assert_eq!(
            ValueType::Pointer(Box::new(ValueType::I32)).min_bits(64),
            Some(64)
        );
    }

    #[test]
    fn test_reference_instance_of() {
        let object = ClassType::builder("java/lang/Object").build();
        let number = ClassType::builder("java/lang/Number")
            .extends(object.clone())
            .build();
        let integer = ClassType::builder("java/lang/Integer")
            .extends(number.clone())
            .build();

        let int_ref = ReferenceType::new(integer.clone(), 0);
        let num_ref = ReferenceType::new(number.clone(), 0);
        assert!(int_ref.instance_of(&num_ref));
        assert!(!num_ref.instance_of(&int_ref));

        // everything is an Object, including arrays
        let int_array = ReferenceType::new(integer, 1);
        assert!(int_array.instance_of(&ReferenceType::new(object, 0)));
        assert!(!int_array.instance_of(&num_ref));
    }

    #[test]
    fn test_display() {
        let object = ClassType::builder("java/lang/Object").build();
        let reference = ReferenceType::new(object, 2).as_nullable();
        assert_eq!(reference.to_string(), "ref<java/lang/Object[][]?>");
        let function = FunctionType::new(ValueType::F32, vec![ValueType::F32, ValueType::F32]);
        assert_eq!(function.to_string(), "f32(f32, f32)");
    }
}
