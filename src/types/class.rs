//! Class types and the class resolution context.
//!
//! A [`ClassType`] is the defined, linked view of a class: its superclass chain, its
//! interfaces and its resolved members. Classes are immutable once built and shared
//! through `Arc`. Identity is the internal name: within one compilation session a name
//! is defined at most once, which [`ClassRegistry::define`] enforces.
//!
//! Member resolution follows the usual class-file linkage rules:
//!
//! - exact resolution looks only at the class itself,
//! - virtual resolution walks the superclass chain and then the superinterfaces,
//! - interface resolution walks the superinterfaces and finally `java/lang/Object`,
//! - field resolution walks the class, its superinterfaces and then its superclass.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use dashmap::DashMap;

use crate::types::{
    BaseTypeDescriptor, ClassTypeDescriptor, ExecutableElement, FieldElement, MethodDescriptor,
    ReferenceType, TypeDescriptor, ValueType,
};

/// Internal name of the root of the class hierarchy.
pub const ROOT_CLASS: &str = "java/lang/Object";

/// A defined class or interface.
#[derive(Debug)]
pub struct ClassType {
    name: Arc<str>,
    super_class: Option<Arc<ClassType>>,
    interfaces: Vec<Arc<ClassType>>,
    is_interface: bool,
    methods: Vec<Arc<ExecutableElement>>,
    constructors: Vec<Arc<ExecutableElement>>,
    fields: Vec<Arc<FieldElement>>,
    initializer: Option<Arc<ExecutableElement>>,
}

impl ClassType {
    /// Starts building the class with the given internal name.
    #[must_use]
    pub fn builder(name: &str) -> ClassTypeBuilder {
        ClassTypeBuilder {
            class: ClassType {
                name: Arc::from(name),
                super_class: None,
                interfaces: Vec::new(),
                is_interface: false,
                methods: Vec::new(),
                constructors: Vec::new(),
                fields: Vec::new(),
                initializer: None,
            },
        }
    }

    /// The internal name, e.g. `java/lang/String`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class descriptor of this class.
    #[must_use]
    pub fn descriptor(&self) -> ClassTypeDescriptor {
        ClassTypeDescriptor::from_internal_name(&self.name)
    }

    /// The superclass, absent for the root class and for interfaces.
    #[must_use]
    pub fn super_class(&self) -> Option<&Arc<ClassType>> {
        self.super_class.as_ref()
    }

    /// Directly implemented (or extended, for interfaces) interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[Arc<ClassType>] {
        &self.interfaces
    }

    /// Whether this type is an interface.
    #[must_use]
    pub const fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// Whether this is the root of the class hierarchy.
    #[must_use]
    pub fn is_root(&self) -> bool {
        &*self.name == ROOT_CLASS
    }

    /// Methods declared by this class.
    #[must_use]
    pub fn methods(&self) -> &[Arc<ExecutableElement>] {
        &self.methods
    }

    /// Constructors declared by this class.
    #[must_use]
    pub fn constructors(&self) -> &[Arc<ExecutableElement>] {
        &self.constructors
    }

    /// Fields declared by this class.
    #[must_use]
    pub fn fields(&self) -> &[Arc<FieldElement>] {
        &self.fields
    }

    /// The class initializer, if the class has one.
    #[must_use]
    pub fn initializer(&self) -> Option<&Arc<ExecutableElement>> {
        self.initializer.as_ref()
    }

    /// Returns a non-nullable reference type to instances of this class.
    #[must_use]
    pub fn reference(self: &Arc<Self>) -> ReferenceType {
        ReferenceType::new(self.clone(), 0)
    }

    /// Returns `true` if `self` is `other` or a transitive subtype of it.
    #[must_use]
    pub fn is_subtype_of(&self, other: &ClassType) -> bool {
        if self == other || other.is_root() {
            return true;
        }
        if let Some(parent) = &self.super_class {
            if parent.is_subtype_of(other) {
                return true;
            }
        }
        self.interfaces.iter().any(|iface| iface.is_subtype_of(other))
    }

    /// Finds a method declared directly by this class.
    #[must_use]
    pub fn resolve_method_exact(
        &self,
        name: &str,
        descriptor: &MethodDescriptor,
    ) -> Option<Arc<ExecutableElement>> {
        self.methods
            .iter()
            .find(|method| method.name() == name && method.descriptor() == descriptor)
            .cloned()
    }

    /// Resolves a method through the superclass chain, then through superinterfaces.
    #[must_use]
    pub fn resolve_method(
        &self,
        name: &str,
        descriptor: &MethodDescriptor,
    ) -> Option<Arc<ExecutableElement>> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(found) = class.resolve_method_exact(name, descriptor) {
                return Some(found);
            }
            current = class.super_class.as_deref();
        }
        self.resolve_in_interfaces(name, descriptor)
    }

    /// Resolves an interface method: the interface itself, its superinterfaces, then the root class.
    #[must_use]
    pub fn resolve_interface_method(
        &self,
        name: &str,
        descriptor: &MethodDescriptor,
        root: &ClassType,
    ) -> Option<Arc<ExecutableElement>> {
        self.resolve_method_exact(name, descriptor)
            .or_else(|| self.resolve_in_interfaces(name, descriptor))
            .or_else(|| root.resolve_method_exact(name, descriptor))
    }

    fn resolve_in_interfaces(
        &self,
        name: &str,
        descriptor: &MethodDescriptor,
    ) -> Option<Arc<ExecutableElement>> {
        for iface in &self.interfaces {
            if let Some(found) = iface
                .resolve_method_exact(name, descriptor)
                .or_else(|| iface.resolve_in_interfaces(name, descriptor))
            {
                return Some(found);
            }
        }
        if let Some(parent) = &self.super_class {
            return parent.resolve_in_interfaces(name, descriptor);
        }
        None
    }

    /// Finds a constructor with the given descriptor.
    #[must_use]
    pub fn resolve_constructor(
        &self,
        descriptor: &MethodDescriptor,
    ) -> Option<Arc<ExecutableElement>> {
        self.constructors
            .iter()
            .find(|ctor| ctor.descriptor() == descriptor)
            .cloned()
    }

    /// Resolves a field in this class, its superinterfaces, then its superclass chain.
    #[must_use]
    pub fn resolve_field(
        &self,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> Option<Arc<FieldElement>> {
        if let Some(found) = self
            .fields
            .iter()
            .find(|field| field.name() == name && field.descriptor() == descriptor)
        {
            return Some(found.clone());
        }
        for iface in &self.interfaces {
            if let Some(found) = iface.resolve_field(name, descriptor) {
                return Some(found);
            }
        }
        self.super_class
            .as_ref()
            .and_then(|parent| parent.resolve_field(name, descriptor))
    }
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassType {}

impl Hash for ClassType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fluent builder for [`ClassType`].
pub struct ClassTypeBuilder {
    class: ClassType,
}

impl ClassTypeBuilder {
    /// Sets the superclass.
    #[must_use]
    pub fn extends(mut self, parent: Arc<ClassType>) -> Self {
        self.class.super_class = Some(parent);
        self
    }

    /// Adds a directly implemented interface.
    #[must_use]
    pub fn implements(mut self, iface: Arc<ClassType>) -> Self {
        self.class.interfaces.push(iface);
        self
    }

    /// Marks the type as an interface.
    #[must_use]
    pub fn interface(mut self) -> Self {
        self.class.is_interface = true;
        self
    }

    /// Declares a method.
    #[must_use]
    pub fn method(mut self, method: ExecutableElement) -> Self {
        self.class.methods.push(Arc::new(method));
        self
    }

    /// Declares a constructor.
    #[must_use]
    pub fn constructor(mut self, ctor: ExecutableElement) -> Self {
        self.class.constructors.push(Arc::new(ctor));
        self
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, field: FieldElement) -> Self {
        self.class.fields.push(Arc::new(field));
        self
    }

    /// Declares a class initializer.
    #[must_use]
    pub fn initializer(mut self, has_body: bool) -> Self {
        let owner = self.class.name.clone();
        self.class.initializer = Some(Arc::new(ExecutableElement::initializer(&owner, has_body)));
        self
    }

    /// Finishes the class.
    #[must_use]
    pub fn build(self) -> Arc<ClassType> {
        Arc::new(self.class)
    }
}

/// Lookup of defined classes by name, the class-loading collaborator of the graph core.
///
/// Implementations must be safe to share between the worker threads compiling units.
pub trait ClassContext: Send + Sync {
    /// Returns the defined class with the given internal name.
    fn find_defined_type(&self, internal_name: &str) -> Option<Arc<ClassType>>;

    /// Resolves a type descriptor into a value type.
    ///
    /// Primitive array types are modelled as references whose leaf class is the
    /// one-dimensional primitive array class (`[I`, `[J`, ...).
    fn resolve_type(&self, descriptor: &TypeDescriptor) -> Option<ValueType> {
        let (leaf, dimensions) = descriptor.leaf();
        match leaf {
            TypeDescriptor::Base(base) if dimensions == 0 => Some(base_value_type(*base)),
            TypeDescriptor::Base(base) => {
                let array = self.find_defined_type(&format!("[{}", base.as_char()))?;
                Some(ValueType::Reference(
                    ReferenceType::new(array, dimensions - 1).as_nullable(),
                ))
            }
            TypeDescriptor::Class(class) => {
                let class = self.find_defined_type(&class.internal_name())?;
                Some(ValueType::Reference(
                    ReferenceType::new(class, dimensions).as_nullable(),
                ))
            }
            TypeDescriptor::Array(_) => None,
        }
    }
}

/// Maps a primitive descriptor to its value type.
#[must_use]
pub fn base_value_type(base: BaseTypeDescriptor) -> ValueType {
    match base {
        BaseTypeDescriptor::Boolean => ValueType::Bool,
        BaseTypeDescriptor::Byte => ValueType::Signed(8),
        BaseTypeDescriptor::Char => ValueType::Unsigned(16),
        BaseTypeDescriptor::Short => ValueType::Signed(16),
        BaseTypeDescriptor::Int => ValueType::I32,
        BaseTypeDescriptor::Long => ValueType::I64,
        BaseTypeDescriptor::Float => ValueType::F32,
        BaseTypeDescriptor::Double => ValueType::F64,
        BaseTypeDescriptor::Void => ValueType::Void,
    }
}

/// Concurrent [`ClassContext`] backed by a `DashMap`.
///
/// The registry is created with the root class and the primitive array classes already
/// defined.
#[derive(Debug)]
pub struct ClassRegistry {
    classes: DashMap<Arc<str>, Arc<ClassType>>,
    root: Arc<ClassType>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Creates a registry holding only the built-in classes.
    #[must_use]
    pub fn new() -> Self {
        let root = ClassType::builder(ROOT_CLASS).build();
        let classes = DashMap::new();
        classes.insert(Arc::from(ROOT_CLASS), root.clone());
        for base in ['Z', 'B', 'C', 'S', 'I', 'J', 'F', 'D'] {
            let name = format!("[{base}");
            let array = ClassType::builder(&name).extends(root.clone()).build();
            classes.insert(Arc::from(name.as_str()), array);
        }
        Self { classes, root }
    }

    /// The root class.
    #[must_use]
    pub fn root(&self) -> &Arc<ClassType> {
        &self.root
    }

    /// Defines a class if no class of that name is defined yet.
    ///
    /// Returns the class that is defined under the name after the call, which is the
    /// previously defined one if the name was already taken.
    pub fn define(&self, class: Arc<ClassType>) -> Arc<ClassType> {
        self.classes
            .entry(Arc::from(class.name()))
            .or_insert(class)
            .clone()
    }

    /// Number of defined classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassContext for ClassRegistry {
    fn find_defined_type(&self, internal_name: &str) -> Option<Arc<ClassType>> {
        self.classes.get(internal_name).map(|entry| entry.clone())
    }
}
