#![forbid(unsafe_code)]

//! Event kinds and event instances.
//!
//! An [`EventKind`] is the class of an event: a static name plus a
//! constructor for its default payload. An [`Event`] is one instance in
//! flight, carrying a JSON payload that listeners read and rewrite.
//!
//! # Invariants
//!
//! - Every event has a process-unique [`EventId`].
//! - Once [`Event::stop`] has been called the event stays halted; a second
//!   call keeps the first reason.
//! - A chained event's lineage depth is its parent's depth plus one.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::path::FieldPath;

/// Global counter for unique event IDs.
static EVENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a single event instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    fn next() -> Self {
        Self(EVENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

fn empty_payload() -> Value {
    Value::Object(Map::new())
}

/// The class of an event.
///
/// Kinds compare and hash by name, so two descriptors with the same name are
/// the same kind for subscription purposes.
#[derive(Clone, Copy)]
pub struct EventKind {
    name: &'static str,
    defaults: fn() -> Value,
}

impl EventKind {
    /// A kind whose fresh instances carry an empty object payload.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            defaults: empty_payload,
        }
    }

    /// A kind whose fresh instances start from `defaults()`.
    #[must_use]
    pub const fn with_defaults(name: &'static str, defaults: fn() -> Value) -> Self {
        Self { name, defaults }
    }

    /// The kind's name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Construct a fresh event of this kind with its default payload.
    #[must_use]
    pub fn instantiate(&self) -> Event {
        Event::with_payload(*self, (self.defaults)())
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EventKind {}

impl Hash for EventKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKind").field(&self.name).finish()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Causal link from a chained event to the event that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// ID of the parent event.
    pub id: EventId,
    /// Kind name of the parent event.
    pub kind: &'static str,
    /// Lineage depth of the parent (0 for a root event).
    pub depth: usize,
}

/// One event in flight.
#[derive(Debug, Clone)]
pub struct Event {
    id: EventId,
    kind: EventKind,
    payload: Value,
    halted: Option<String>,
    parent: Option<ParentLink>,
}

impl Event {
    /// Fresh event of `kind` with its default payload.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        kind.instantiate()
    }

    /// Fresh event of `kind` with an explicit payload.
    #[must_use]
    pub fn with_payload(kind: EventKind, payload: Value) -> Self {
        Self {
            id: EventId::next(),
            kind,
            payload,
            halted: None,
            parent: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Read the value at `path`. Missing fields and non-object intermediates
    /// read as `None`.
    #[must_use]
    pub fn traverse(&self, path: &FieldPath) -> Option<&Value> {
        match path {
            FieldPath::Whole => Some(&self.payload),
            FieldPath::Field(a) => self.payload.get(a),
            FieldPath::Nested(a, b) => self.payload.get(a).and_then(|v| v.get(b)),
        }
    }

    /// Read a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Replace the whole payload.
    pub fn replace_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    /// Set a top-level field. A non-object payload is replaced by an object
    /// holding only this field.
    pub fn set_field(&mut self, field: impl Into<String>, value: Value) {
        if !self.payload.is_object() {
            self.payload = empty_payload();
        }
        if let Value::Object(map) = &mut self.payload {
            map.insert(field.into(), value);
        }
    }

    /// Delete a top-level field, returning its previous value.
    pub fn remove_field(&mut self, field: &str) -> Option<Value> {
        match &mut self.payload {
            Value::Object(map) => map.remove(field),
            _ => None,
        }
    }

    /// Halt the event. Listeners after the current one are skipped.
    pub fn stop(&mut self, reason: impl Into<String>) {
        if self.halted.is_none() {
            self.halted = Some(reason.into());
        }
    }

    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.halted.is_some()
    }

    /// Why the event was halted, if it was.
    #[must_use]
    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// Record `parent` as the cause of this event.
    pub fn chain(&mut self, parent: &Event) {
        self.parent = Some(ParentLink {
            id: parent.id,
            kind: parent.kind.name(),
            depth: parent.lineage_depth(),
        });
    }

    #[must_use]
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Number of ancestors recorded through [`chain`](Self::chain).
    #[must_use]
    pub fn lineage_depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth + 1)
    }
}
