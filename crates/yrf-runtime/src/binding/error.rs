#![forbid(unsafe_code)]

//! Binding error type.

use std::fmt;

use yrf_bus::BusError;
use yrf_core::TreeError;

use super::target::BindingKind;

/// Errors from declaring or firing bindings.
#[derive(Debug)]
pub enum BindingError {
    /// A mandatory binding was declared without configuration. Raised at
    /// declaration time.
    MissingConfig {
        kind: BindingKind,
        name: String,
        owner: String,
    },
    /// A writing binding (supplier, remover, trigger) was configured with a
    /// two-level field path. Raised when the binding fires.
    UnsupportedPath {
        kind: BindingKind,
        name: String,
        owner: String,
    },
    /// `fire` was called with a name no trigger was declared under.
    UndeclaredTrigger { name: String, owner: String },
    /// Publishing a triggered event failed downstream.
    Bus(BusError),
    /// A disabler could not update its element.
    Tree(TreeError),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingConfig { kind, name, owner } => {
                write!(f, "Missing config for mandatory {kind} '{name}' at '{owner}'")
            }
            Self::UnsupportedPath { kind, name, owner } => write!(
                f,
                "Unsupported path length > 1 for {kind} '{name}' at '{owner}'"
            ),
            Self::UndeclaredTrigger { name, owner } => {
                write!(f, "Undeclared trigger '{name}' at '{owner}'")
            }
            Self::Bus(e) => write!(f, "{e}"),
            Self::Tree(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BindingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bus(e) => Some(e),
            Self::Tree(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for BindingError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<TreeError> for BindingError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}
