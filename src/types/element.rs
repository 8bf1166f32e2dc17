//! Resolved program elements.
//!
//! Elements are produced by class-file definition and verification, which live outside
//! this crate. The graph core only consumes them: nodes record the executable element they
//! were built for, invocations carry their resolved target, and field handles carry their
//! resolved field.
//!
//! Elements compare structurally over their owner, name and descriptor, so that two
//! independently loaded copies of the same member are interchangeable as graph operands.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::types::{ClassTypeDescriptor, MethodDescriptor, TypeDescriptor, ValueType};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Member modifiers relevant to graph construction
    pub struct Modifiers: u32 {
        /// Member is static
        const STATIC = 0x0001;
        /// Member is final
        const FINAL = 0x0002;
        /// Field is volatile
        const VOLATILE = 0x0004;
        /// Method is implemented natively
        const NATIVE = 0x0008;
        /// Method is abstract
        const ABSTRACT = 0x0010;
        /// Invoking the method has no observable side effects; invocations may be value-numbered
        const NO_SIDE_EFFECTS = 0x0100;
    }
}

/// The kind of an executable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A regular method.
    Method,
    /// An instance constructor (`<init>`).
    Constructor,
    /// A class initializer (`<clinit>`).
    Initializer,
}

/// A method, constructor or class initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutableElement {
    kind: ElementKind,
    owner: Arc<str>,
    name: Arc<str>,
    descriptor: MethodDescriptor,
    return_type: ValueType,
    modifiers: Modifiers,
    has_body: bool,
}

impl ExecutableElement {
    /// Creates a method element.
    #[must_use]
    pub fn method(
        owner: &str,
        name: &str,
        descriptor: MethodDescriptor,
        return_type: ValueType,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            kind: ElementKind::Method,
            owner: Arc::from(owner),
            name: Arc::from(name),
            descriptor,
            return_type,
            modifiers,
            has_body: !modifiers.intersects(Modifiers::NATIVE | Modifiers::ABSTRACT),
        }
    }

    /// Creates a constructor element.
    #[must_use]
    pub fn constructor(owner: &str, descriptor: MethodDescriptor) -> Self {
        Self {
            kind: ElementKind::Constructor,
            owner: Arc::from(owner),
            name: Arc::from("<init>"),
            descriptor,
            return_type: ValueType::Void,
            modifiers: Modifiers::empty(),
            has_body: true,
        }
    }

    /// Creates a class initializer element.
    #[must_use]
    pub fn initializer(owner: &str, has_body: bool) -> Self {
        Self {
            kind: ElementKind::Initializer,
            owner: Arc::from(owner),
            name: Arc::from("<clinit>"),
            descriptor: MethodDescriptor::void(),
            return_type: ValueType::Void,
            modifiers: Modifiers::STATIC,
            has_body,
        }
    }

    /// The element kind.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Internal name of the enclosing class.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Resolved return type.
    #[must_use]
    pub fn return_type(&self) -> &ValueType {
        &self.return_type
    }

    /// Member modifiers.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether the element has a method body to compile.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.has_body
    }

    /// Returns `true` if invoking this element may have side effects.
    #[must_use]
    pub const fn has_side_effects(&self) -> bool {
        !self.modifiers.contains(Modifiers::NO_SIDE_EFFECTS)
    }

    /// Returns `true` if the enclosing class is `package/name`.
    #[must_use]
    pub fn owner_is(&self, package: &str, name: &str) -> bool {
        let owner = &*self.owner;
        match owner.rsplit_once('/') {
            Some((pkg, simple)) => pkg == package && simple == name,
            None => package.is_empty() && owner == name,
        }
    }
}

impl fmt::Display for ExecutableElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// A key/value pair list attached to an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    /// The annotation class.
    pub descriptor: ClassTypeDescriptor,
    /// String-valued members of the annotation.
    pub values: Vec<(Arc<str>, Arc<str>)>,
}

impl Annotation {
    /// Creates an annotation with no members.
    #[must_use]
    pub fn new(descriptor: ClassTypeDescriptor) -> Self {
        Self {
            descriptor,
            values: Vec::new(),
        }
    }

    /// Adds a string member.
    #[must_use]
    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.values.push((Arc::from(name), Arc::from(value)));
        self
    }

    /// Looks up a string member.
    #[must_use]
    pub fn string_value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| &**key == name)
            .map(|(_, value)| &**value)
    }
}

/// A resolved field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldElement {
    owner: Arc<str>,
    name: Arc<str>,
    descriptor: TypeDescriptor,
    ty: ValueType,
    modifiers: Modifiers,
    annotations: Vec<Annotation>,
}

impl FieldElement {
    /// Creates a field element.
    #[must_use]
    pub fn new(
        owner: &str,
        name: &str,
        descriptor: TypeDescriptor,
        ty: ValueType,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
            descriptor,
            ty,
            modifiers,
            annotations: Vec::new(),
        }
    }

    /// Attaches an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Internal name of the enclosing class.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Resolved field type.
    #[must_use]
    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Field modifiers.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Visible annotations.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Whether the field is static.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    /// A field whose value can never change after initialization: final and not volatile.
    #[must_use]
    pub const fn is_really_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL) && !self.modifiers.contains(Modifiers::VOLATILE)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}
