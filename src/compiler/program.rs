//! Results of compiling a set of units.

use std::sync::Arc;

use dashmap::{mapref::multiple::RefMulti, DashMap};

use crate::{graph::Graph, types::ExecutableElement, Error};

/// The graphs of all successfully compiled units, and the errors of those that failed.
///
/// Graphs are inserted concurrently by the scheduler's workers. A failed unit never has
/// a graph: its partial construction is discarded and only its error is kept.
#[derive(Debug, Default)]
pub struct CompiledProgram {
    graphs: DashMap<Arc<ExecutableElement>, Graph>,
    failures: DashMap<Arc<ExecutableElement>, Error>,
}

impl CompiledProgram {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_graph(&self, graph: Graph) {
        self.graphs.insert(graph.element().clone(), graph);
    }

    pub(crate) fn insert_failure(&self, element: Arc<ExecutableElement>, error: Error) {
        self.failures.insert(element, error);
    }

    /// Returns `true` if `element` was compiled or failed to compile.
    #[must_use]
    pub fn is_attempted(&self, element: &ExecutableElement) -> bool {
        self.graphs.contains_key(element) || self.failures.contains_key(element)
    }

    /// The graph of a successfully compiled unit.
    #[must_use]
    pub fn graph(
        &self,
        element: &ExecutableElement,
    ) -> Option<dashmap::mapref::one::Ref<'_, Arc<ExecutableElement>, Graph>> {
        self.graphs.get(element)
    }

    /// Iterates over all graphs, in no particular order.
    pub fn graphs(&self) -> impl Iterator<Item = RefMulti<'_, Arc<ExecutableElement>, Graph>> {
        self.graphs.iter()
    }

    /// Number of successfully compiled units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Returns `true` if no unit compiled successfully.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// The error a unit failed with.
    #[must_use]
    pub fn failure(&self, element: &ExecutableElement) -> Option<Error> {
        self.failures.get(element).map(|entry| entry.value().clone())
    }

    /// Number of failed units.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Elements of all compiled units, sorted for deterministic iteration.
    #[must_use]
    pub fn elements(&self) -> Vec<Arc<ExecutableElement>> {
        let mut elements: Vec<_> = self.graphs.iter().map(|entry| entry.key().clone()).collect();
        elements.sort_by_key(|element| element.to_string());
        elements
    }
}
