#![forbid(unsafe_code)]

//! Tree error type.

use std::fmt;

use crate::node::NodeId;

/// Error returned by an element callback.
pub type CallbackError = Box<dyn std::error::Error + 'static>;

/// Errors from tree operations.
#[derive(Debug)]
pub enum TreeError {
    /// The node does not belong to this document.
    UnknownNode(NodeId),
    /// Attributes, hooks and children require an element; this is a text node.
    NotAnElement(NodeId),
    /// Inserting `child` under `parent` would create a cycle or move the root.
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// `child` is not a child of `parent`.
    NotAChild { parent: NodeId, child: NodeId },
    /// Only detached nodes can be disposed, and never the root.
    StillAttached(NodeId),
    /// A connected/disconnected callback failed.
    Callback {
        node: NodeId,
        tag: String,
        source: CallbackError,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node {id}"),
            Self::NotAnElement(id) => write!(f, "node {id} is not an element"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert {child} under {parent}")
            }
            Self::NotAChild { parent, child } => {
                write!(f, "{child} is not a child of {parent}")
            }
            Self::StillAttached(id) => write!(f, "node {id} is still part of a tree"),
            Self::Callback { node, tag, source } => {
                write!(f, "lifecycle callback of <{tag}> {node} failed: {source}")
            }
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Callback { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
