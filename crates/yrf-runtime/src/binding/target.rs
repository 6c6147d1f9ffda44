#![forbid(unsafe_code)]

//! Binding configuration: what a named binding listens to and where it
//! reads or writes.

use std::fmt;

use yrf_bus::{EventKind, FieldPath, Priority};

/// Target of one named binding: `(event kind, field path, priority)`.
///
/// Immutable once built. Builders consume and return `self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTarget {
    kind: EventKind,
    path: FieldPath,
    nice: Priority,
}

impl BindingTarget {
    /// Target the whole payload of `kind` at priority 0.
    #[must_use]
    pub fn on(kind: EventKind) -> Self {
        Self::new(kind, FieldPath::Whole, 0)
    }

    #[must_use]
    pub fn new(kind: EventKind, path: FieldPath, nice: Priority) -> Self {
        Self { kind, path, nice }
    }

    /// Replace the path with a single field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.path = FieldPath::field(name);
        self
    }

    /// Replace the path with a two-level field.
    #[must_use]
    pub fn nested(mut self, outer: impl Into<String>, inner: impl Into<String>) -> Self {
        self.path = FieldPath::nested(outer, inner);
        self
    }

    #[must_use]
    pub fn at(mut self, path: FieldPath) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_nice(mut self, nice: Priority) -> Self {
        self.nice = nice;
        self
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn path(&self) -> &FieldPath {
        &self.path
    }

    #[inline]
    #[must_use]
    pub const fn nice(&self) -> Priority {
        self.nice
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (nice {})", self.kind, self.path, self.nice)
    }
}

/// Whether a binding must be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    /// Missing configuration is a declaration error.
    #[default]
    Mandatory,
    /// Missing configuration skips the declaration.
    Optional,
}

impl Requirement {
    #[inline]
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Optional)
    }
}

/// The attach variant a binding was declared with. Used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Generic,
    Consumer,
    Supplier,
    Remover,
    Disabler,
    Source,
    Static,
    Trigger,
}

impl BindingKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Generic => "generic listener",
            Self::Consumer => "consumer",
            Self::Supplier => "supplier",
            Self::Remover => "remover",
            Self::Disabler => "disabler",
            Self::Source => "source",
            Self::Static => "static",
            Self::Trigger => "trigger",
        }
    }

    /// Whether this variant subscribes a listener (as opposed to a pull or
    /// push function).
    #[must_use]
    pub const fn is_listener(self) -> bool {
        matches!(
            self,
            Self::Generic | Self::Consumer | Self::Supplier | Self::Remover | Self::Disabler
        )
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
