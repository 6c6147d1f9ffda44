#![forbid(unsafe_code)]

//! Render output and its materialization into tree nodes.

use yrf_core::{Document, NodeId};

use crate::error::FrameError;

/// One piece of render output.
#[derive(Debug, Clone, Default)]
pub enum Child {
    /// An existing node. Appending moves it.
    Node(NodeId),
    /// Text, materialized as a text node.
    Text(String),
    /// Nested output, flattened in order.
    List(Vec<Child>),
    /// Nothing; skipped.
    #[default]
    Empty,
    /// A child that should have been produced but was not. Materializing it
    /// is an error.
    Missing,
}

impl Child {
    /// Build a list from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Child>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<NodeId> for Child {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Empty, Into::into)
    }
}

/// Turn `child` into a flat node list, creating text nodes as needed.
///
/// Lists nested more than `max_depth` levels below the top are rejected.
///
/// # Errors
///
/// [`FrameError::UndefinedChild`] for [`Child::Missing`] and
/// [`FrameError::NestingTooDeep`] for overly nested lists.
pub fn materialize(
    doc: &Document,
    child: Child,
    max_depth: usize,
) -> Result<Vec<NodeId>, FrameError> {
    let mut out = Vec::new();
    walk(doc, child, 0, max_depth, &mut out)?;
    Ok(out)
}

fn walk(
    doc: &Document,
    child: Child,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<NodeId>,
) -> Result<(), FrameError> {
    match child {
        Child::Node(node) => out.push(node),
        Child::Text(text) => out.push(doc.create_text(text)),
        Child::List(items) => {
            if depth > max_depth {
                return Err(FrameError::NestingTooDeep { max: max_depth });
            }
            for item in items {
                walk(doc, item, depth + 1, max_depth, out)?;
            }
        }
        Child::Empty => {}
        Child::Missing => return Err(FrameError::UndefinedChild),
    }
    Ok(())
}

/// Materialize `child` and append the result under `parent`.
///
/// Nothing is appended when materialization fails.
///
/// # Errors
///
/// As [`materialize`], plus tree errors from appending.
pub fn append_children(
    doc: &Document,
    parent: NodeId,
    child: Child,
    max_depth: usize,
) -> Result<(), FrameError> {
    for node in materialize(doc, child, max_depth)? {
        doc.append_child(parent, node)?;
    }
    Ok(())
}
