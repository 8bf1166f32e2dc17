//! Type-system collaborators of the program graph.
//!
//! Everything in this module is consumed, not produced, by graph construction: the
//! class-file front end defines classes and members, and the builder pipeline attaches
//! them to nodes.
//!
//! # Key Components
//!
//! - [`ValueType`] - The static type of a graph value
//! - [`TypeDescriptor`] / [`MethodDescriptor`] - Unresolved, symbolic types
//! - [`ExecutableElement`] / [`FieldElement`] - Resolved members
//! - [`ClassType`] - A defined class with member resolution
//! - [`ClassContext`] / [`ClassRegistry`] - Class lookup by name

mod class;
mod descriptor;
mod element;
mod ty;

pub use class::{base_value_type, ClassContext, ClassRegistry, ClassType, ClassTypeBuilder, ROOT_CLASS};
pub use descriptor::{BaseTypeDescriptor, ClassTypeDescriptor, MethodDescriptor, TypeDescriptor};
pub use element::{Annotation, ElementKind, ExecutableElement, FieldElement, Modifiers};
pub use ty::{FunctionType, ReferenceType, ValueType};
