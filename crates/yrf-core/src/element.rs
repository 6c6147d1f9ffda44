#![forbid(unsafe_code)]

//! Element-level extension points.
//!
//! - [`ElementCallbacks`]: the native attach/detach hook. Nodes created from a
//!   tag registered with [`Document::define`](crate::Document::define) carry
//!   one; plain nodes do not.
//! - [`Lifecycle`]: the optional per-node back-reference to a binding
//!   manager, read by tree observers for nodes that lack native callbacks.
//! - [`AttrValue`] / [`Hook`]: plain attribute values as applied by
//!   [`Document::apply_attributes`](crate::Document::apply_attributes).

use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::error::CallbackError;
use crate::node::NodeId;

/// Native lifecycle hook of an element.
///
/// The document calls `connected` after the node enters the live tree and
/// `disconnected` after it leaves, always in alternation, starting with
/// `connected`. Calls happen after the mutation completes, so both methods
/// may mutate the document.
pub trait ElementCallbacks {
    /// The node entered the live tree.
    ///
    /// # Errors
    ///
    /// Reported to the caller of the mutation as
    /// [`TreeError::Callback`](crate::TreeError::Callback).
    fn connected(&self, doc: &Document, node: NodeId) -> Result<(), CallbackError>;

    /// The node left the live tree.
    ///
    /// # Errors
    ///
    /// Same as [`connected`](Self::connected).
    fn disconnected(&self, doc: &Document, node: NodeId) -> Result<(), CallbackError>;
}

/// A subscription set that follows a node's tree membership.
pub trait Lifecycle {
    /// Activate all subscriptions.
    fn connect(&self);
    /// Deactivate all subscriptions.
    fn disconnect(&self);
    /// Whether subscriptions are currently active.
    fn is_connected(&self) -> bool;
    /// Type name of the owning host, for diagnostics.
    fn owner(&self) -> &str;
}

/// Behavior hook stored on an element (the callable branch of an attribute).
pub type Hook = Rc<dyn Fn(&Document, NodeId)>;

/// A plain attribute value.
#[derive(Clone, Default)]
pub enum AttrValue {
    /// Presentation attribute.
    Text(String),
    /// Behavior hook.
    Hook(Hook),
    /// No value; skipped when applied.
    #[default]
    Unset,
}

impl AttrValue {
    /// Wrap a closure as a hook value.
    pub fn hook(f: impl Fn(&Document, NodeId) + 'static) -> Self {
        Self::Hook(Rc::new(f))
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Hook(_) => f.write_str("Hook(..)"),
            Self::Unset => f.write_str("Unset"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Unset, Into::into)
    }
}
