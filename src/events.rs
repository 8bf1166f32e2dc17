//! Event log for the compilation session.
//!
//! Every diagnostic and every notable decision of the builder pipeline is recorded as an
//! [`Event`]. The log doubles as the diagnostic sink: passes report unresolvable
//! references and misplaced native constants here, keyed by source location, and the
//! scheduler records unit failures.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Thread-safe, append-only collection with query helpers
//! - [`EventBuilder`] - Fluent API; the event is appended when the builder drops
//!
//! # Example
//!
//! ```rust
//! use aotgraph::events::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::CastFolded)
//!     .pass("instanceof-checkcast")
//!     .message("narrow of %4 is a no-op");
//! log.warn("class app/Missing is not defined");
//!
//! assert_eq!(log.len(), 2);
//! assert!(log.has(EventKind::CastFolded));
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use crate::types::ExecutableElement;

/// Categories of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A symbolic member reference was resolved.
    ReferenceResolved,
    /// A block was terminated by a synthesized linkage-error throw.
    LinkageErrorThrown,
    /// A checked or narrowing cast was proven unnecessary.
    CastFolded,
    /// An instance-of test was folded.
    InstanceOfFolded,
    /// An operation was lowered to an intrinsic call.
    IntrinsicLowered,
    /// An operation was lowered to a branch-free select sequence.
    SelectLowered,
    /// A volatile access was lowered to fences and ordered accesses.
    VolatileLowered,
    /// A native compile-time constant was registered.
    ConstantDefined,
    /// A class initializer was registered for compilation.
    InitializerRegistered,
    /// A function declaration was added to the session.
    FunctionDeclared,
    /// Unreachable nodes were removed from a graph.
    DeadNodesRemoved,
    /// A type identifier was assigned.
    TypeIdAssigned,

    /// Unit compilation started.
    UnitStarted,
    /// Unit compilation produced a graph.
    UnitCompleted,
    /// Unit compilation failed; its graph was discarded.
    UnitFailed,
    /// A whole-program pass started.
    PassStarted,
    /// A whole-program pass completed.
    PassCompleted,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Rewrites
            Self::ReferenceResolved => "reference resolved",
            Self::LinkageErrorThrown => "linkage error thrown",
            Self::CastFolded => "cast folded",
            Self::InstanceOfFolded => "instanceof folded",
            Self::IntrinsicLowered => "intrinsic lowered",
            Self::SelectLowered => "select lowered",
            Self::VolatileLowered => "volatile lowered",
            Self::ConstantDefined => "constant defined",
            Self::InitializerRegistered => "initializer registered",
            Self::FunctionDeclared => "function declared",
            Self::DeadNodesRemoved => "dead nodes removed",
            Self::TypeIdAssigned => "type id assigned",
            // Scheduler
            Self::UnitStarted => "unit started",
            Self::UnitCompleted => "unit completed",
            Self::UnitFailed => "unit failed",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            // Diagnostic
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event records a graph rewrite.
    #[must_use]
    pub fn is_rewrite(&self) -> bool {
        matches!(
            self,
            Self::ReferenceResolved
                | Self::LinkageErrorThrown
                | Self::CastFolded
                | Self::InstanceOfFolded
                | Self::IntrinsicLowered
                | Self::SelectLowered
                | Self::VolatileLowered
                | Self::ConstantDefined
                | Self::DeadNodesRemoved
        )
    }

    /// Returns true if this is a diagnostic event.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A source location: the element being compiled plus line and bytecode index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The element being compiled.
    pub element: Arc<ExecutableElement>,
    /// Source line, 0 if unknown.
    pub line: u32,
    /// Bytecode index, -1 if unknown.
    pub bci: i32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element)?;
        if self.line > 0 {
            write!(f, ":{}", self.line)?;
        }
        if self.bci >= 0 {
            write!(f, "@{}", self.bci)?;
        }
        Ok(())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Where the event occurred (if applicable).
    pub location: Option<Location>,
    /// Human-readable description.
    pub message: String,
    /// Associated pass name (if from a pass).
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {}: {}", self.kind, location, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the builder is
/// dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    location: Option<Location>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            location: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the location where the event occurred.
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets only the element, for unit-level events without a specific location.
    pub fn element(mut self, element: Arc<ExecutableElement>) -> Self {
        self.location = Some(Location {
            element,
            line: 0,
            bci: -1,
        });
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            location: self.location.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Thread-safe, append-only collection of events.
///
/// Events can be appended concurrently from multiple threads through shared references.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let new_log = Self::new();
        new_log.merge(self);
        new_log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Appends copies of all events of `other`.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over events recorded for a specific element.
    pub fn filter_element<'a>(
        &'a self,
        element: &'a ExecutableElement,
    ) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter().filter(move |e| {
            e.location
                .as_ref()
                .is_some_and(|location| *location.element == *element)
        })
    }

    /// Returns an iterator over rewrite events only.
    pub fn rewrites(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_rewrite())
    }

    /// Returns an iterator over diagnostic events only.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_diagnostic())
    }

    /// Returns an iterator over warning events.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Returns an iterator over error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Generates a human-readable summary of the rewrite events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| k.is_rewrite())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = EventLogIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        EventLogIter {
            inner: self.events.iter(),
        }
    }
}

/// Iterator over the events of an [`EventLog`].
pub struct EventLogIter<'a> {
    inner: boxcar::Iter<'a, Event>,
}

impl<'a> Iterator for EventLogIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, e)| e)
    }
}
