//! Symbolic type and method descriptors.
//!
//! Descriptors are the unresolved form of types as they appear in class-file member
//! references. The translator hands them to the builder unchanged; the member resolving
//! pass turns them into resolved elements and [`ValueType`](crate::types::ValueType)s.

use std::{fmt, sync::Arc};

/// Primitive descriptor characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseTypeDescriptor {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `V`
    Void,
}

impl BaseTypeDescriptor {
    /// The descriptor character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Boolean => 'Z',
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Short => 'S',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Float => 'F',
            Self::Double => 'D',
            Self::Void => 'V',
        }
    }
}

/// A class descriptor, `Lpackage/Name;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeDescriptor {
    package: Arc<str>,
    name: Arc<str>,
}

impl ClassTypeDescriptor {
    /// Creates a descriptor from a package (slash separated, possibly empty) and a simple name.
    #[must_use]
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            package: Arc::from(package),
            name: Arc::from(name),
        }
    }

    /// Creates a descriptor from an internal name such as `java/lang/String`.
    #[must_use]
    pub fn from_internal_name(internal: &str) -> Self {
        match internal.rfind('/') {
            Some(idx) => Self::new(&internal[..idx], &internal[idx + 1..]),
            None => Self::new("", internal),
        }
    }

    /// The package name, slash separated.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The simple class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.name
    }

    /// The internal name, `package/Name` or just `Name` for the default package.
    #[must_use]
    pub fn internal_name(&self) -> String {
        if self.package.is_empty() {
            self.name.to_string()
        } else {
            format!("{}/{}", self.package, self.name)
        }
    }
}

impl fmt::Display for ClassTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{};", self.internal_name())
    }
}

/// A field or parameter type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A primitive type.
    Base(BaseTypeDescriptor),
    /// A class type.
    Class(ClassTypeDescriptor),
    /// An array of the element descriptor.
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Shorthand for a class descriptor from an internal name.
    #[must_use]
    pub fn class(internal: &str) -> Self {
        Self::Class(ClassTypeDescriptor::from_internal_name(internal))
    }

    /// Returns the class descriptor, if this is one.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassTypeDescriptor> {
        match self {
            Self::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Returns the leaf element descriptor and the number of array dimensions.
    #[must_use]
    pub fn leaf(&self) -> (&TypeDescriptor, u32) {
        let mut current = self;
        let mut dimensions = 0;
        while let Self::Array(element) = current {
            current = element;
            dimensions += 1;
        }
        (current, dimensions)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(base) => write!(f, "{}", base.as_char()),
            Self::Class(class) => write!(f, "{class}"),
            Self::Array(element) => write!(f, "[{element}"),
        }
    }
}

/// A method descriptor, `(params)ret`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter descriptors.
    pub params: Vec<TypeDescriptor>,
    /// Return descriptor.
    pub ret: TypeDescriptor,
}

impl MethodDescriptor {
    /// Creates a method descriptor.
    #[must_use]
    pub fn new(params: Vec<TypeDescriptor>, ret: TypeDescriptor) -> Self {
        Self { params, ret }
    }

    /// The `()V` descriptor.
    #[must_use]
    pub fn void() -> Self {
        Self::new(Vec::new(), TypeDescriptor::Base(BaseTypeDescriptor::Void))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        write!(f, "){}", self.ret)
    }
}
