#![forbid(unsafe_code)]

//! Display tree for yrframe.
//!
//! This crate provides:
//! - [`Document`]: an arena tree with a permanent root, element and text
//!   nodes, attributes and behavior hooks
//! - [`ElementCallbacks`]: the native attach/detach hook of registered tags
//! - [`Lifecycle`]: the per-node binding back-reference read by observers
//! - [`MutationRecord`] / [`MutationObserver`]: batched structural changes

pub mod document;
pub mod element;
pub mod error;
pub mod mutation;
pub mod node;

pub use document::{Document, ElementFactory, WeakDocument};
pub use element::{AttrValue, ElementCallbacks, Hook, Lifecycle};
pub use error::{CallbackError, TreeError};
pub use mutation::{MutationObserver, MutationRecord};
pub use node::NodeId;
