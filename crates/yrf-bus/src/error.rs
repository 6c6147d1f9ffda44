#![forbid(unsafe_code)]

//! Bus error type.

use std::fmt;

/// Error returned by a listener callback.
///
/// Listeners live above the bus and report their own error types; the bus
/// only carries them back to the publisher.
pub type ListenerError = Box<dyn std::error::Error + 'static>;

/// Errors from bus operations.
#[derive(Debug)]
pub enum BusError {
    /// A field path with more than two segments was requested.
    PathTooDeep { depth: usize },
    /// A listener failed while handling a delivery. Delivery stops at the
    /// failing listener.
    Listener {
        /// Debug name of the failing listener.
        listener: String,
        /// Kind of the event being delivered.
        kind: &'static str,
        source: ListenerError,
    },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathTooDeep { depth } => {
                write!(f, "field path of depth {depth} exceeds the maximum of 2")
            }
            Self::Listener {
                listener,
                kind,
                source,
            } => write!(f, "listener '{listener}' failed on '{kind}': {source}"),
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Listener { source, .. } => Some(source.as_ref()),
            Self::PathTooDeep { .. } => None,
        }
    }
}
