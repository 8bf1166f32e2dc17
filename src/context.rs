//! Session-wide compilation context.
//!
//! The [`CompilationContext`] is the explicit owner of everything shared between the
//! units of one compilation session: the node arena and its hash-consing table, the class
//! lookup, the diagnostic event log, the function declaration and initializer registries,
//! and typed attachments for state owned by individual passes.
//!
//! All collection fields use thread-safe types (`DashMap`, `DashSet`, `boxcar::Vec`) so
//! that units can be compiled in parallel against a shared `Arc<CompilationContext>`.
//! Every registration is an idempotent insert-if-absent that reports whether it was the
//! first.

use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use dashmap::{DashMap, DashSet};

use crate::{
    config::CompilerConfig,
    events::{EventKind, EventLog, Location},
    graph::NodeStore,
    types::{ClassContext, ExecutableElement, FunctionType},
    Result,
};

/// Shared state of a compilation session.
pub struct CompilationContext {
    /// Accumulated events and diagnostics from all units and passes.
    pub events: EventLog,

    /// Node arena and hash-consing table.
    store: NodeStore,

    /// Class lookup.
    classes: Arc<dyn ClassContext>,

    /// Session configuration.
    config: CompilerConfig,

    /// Pass-owned state, one value per type.
    attachments: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,

    /// Declared native functions by symbol name.
    functions: DashMap<Arc<str>, FunctionType>,

    /// Class initializers registered for compilation.
    initializers: DashSet<Arc<ExecutableElement>>,
}

impl CompilationContext {
    /// Creates a new context.
    #[must_use]
    pub fn new(classes: Arc<dyn ClassContext>, config: CompilerConfig) -> Self {
        Self {
            events: EventLog::new(),
            store: NodeStore::new(),
            classes,
            config,
            attachments: DashMap::new(),
            functions: DashMap::new(),
            initializers: DashSet::new(),
        }
    }

    /// The node arena.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// The class lookup.
    #[must_use]
    pub fn classes(&self) -> &dyn ClassContext {
        self.classes.as_ref()
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    // ── Attachments ─────────────────────────────────────────────────────

    /// Returns the attachment of type `T`, if one was created.
    #[must_use]
    pub fn attachment<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let value = self.attachments.get(&TypeId::of::<T>())?.clone();
        value.downcast::<T>().ok()
    }

    /// Returns the attachment of type `T`, creating it with `init` on first access.
    ///
    /// `init` runs at most once per session and must not access attachments itself.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the stored attachment has an unexpected type.
    pub fn compute_attachment_if_absent<T, F>(&self, init: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let value = self
            .attachments
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>)
            .clone();
        value
            .downcast::<T>()
            .map_err(|_| malformed_error!("Attachment type mismatch"))
    }

    // ── Registries ──────────────────────────────────────────────────────

    /// Declares a native function. Returns `true` if this call added the declaration.
    pub fn declare_function(&self, name: &str, ty: FunctionType) -> bool {
        if self.functions.contains_key(name) {
            return false;
        }
        let mut added = false;
        self.functions.entry(Arc::from(name)).or_insert_with(|| {
            added = true;
            ty
        });
        added
    }

    /// Returns the declaration of a native function.
    #[must_use]
    pub fn function_declaration(&self, name: &str) -> Option<FunctionType> {
        self.functions.get(name).map(|entry| entry.clone())
    }

    /// All declared functions, sorted by name.
    #[must_use]
    pub fn declared_functions(&self) -> Vec<(Arc<str>, FunctionType)> {
        let mut functions: Vec<_> = self
            .functions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        functions.sort_by(|a, b| a.0.cmp(&b.0));
        functions
    }

    /// Registers a class initializer for compilation. Returns `true` on first registration.
    pub fn register_initializer(&self, initializer: &Arc<ExecutableElement>) -> bool {
        self.initializers.insert(initializer.clone())
    }

    /// Returns `true` if the initializer was registered.
    #[must_use]
    pub fn is_initializer_registered(&self, initializer: &ExecutableElement) -> bool {
        self.initializers.contains(initializer)
    }

    /// All registered initializers, sorted by owner.
    #[must_use]
    pub fn registered_initializers(&self) -> Vec<Arc<ExecutableElement>> {
        let mut initializers: Vec<_> = self
            .initializers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        initializers.sort_by(|a, b| a.owner().cmp(b.owner()));
        initializers
    }

    /// Number of registered initializers.
    #[must_use]
    pub fn initializer_count(&self) -> usize {
        self.initializers.len()
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    /// Reports an error at a source location.
    pub fn error(&self, location: Location, message: impl Into<String>) {
        self.events
            .record(EventKind::Error)
            .at(location)
            .message(message);
    }

    /// Reports a warning at a source location.
    pub fn warning(&self, location: Location, message: impl Into<String>) {
        self.events
            .record(EventKind::Warning)
            .at(location)
            .message(message);
    }

    /// Reports an informational message at a source location.
    pub fn info(&self, location: Location, message: impl Into<String>) {
        self.events
            .record(EventKind::Info)
            .at(location)
            .message(message);
    }
}
