#![forbid(unsafe_code)]

//! The display tree.
//!
//! A [`Document`] is an arena of element and text nodes under a permanent
//! root. A node is *connected* while its ancestor chain reaches the root.
//!
//! # Architecture
//!
//! `Document` is a cheap-clone handle over `Rc<RefCell<..>>` state. Every
//! mutating operation runs in two phases:
//!
//! 1. Under the internal borrow: validate, relink, queue a
//!    [`MutationRecord`] when the parent is connected, and collect the
//!    element-callback reactions the change implies.
//! 2. With the borrow released: run the reactions in tree order. Callbacks
//!    may therefore mutate the document again (a component redrawing itself
//!    on attach, for example).
//!
//! # Invariants
//!
//! 1. For every node with [`ElementCallbacks`], `connected` and
//!    `disconnected` strictly alternate, starting with `connected`.
//! 2. `connected` only runs while the node is connected.
//! 3. Mutations under detached parents queue no records.
//! 4. Node IDs stay valid until [`Document::dispose`] frees their subtree;
//!    afterwards they are rejected as unknown, even once the slot is reused.
//!
//! # Failure Modes
//!
//! - Unknown IDs, text-node parents and cyclic inserts are rejected before
//!   any change is made.
//! - A failing callback does not stop the remaining reactions; the first
//!   failure is returned to the caller of the mutation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{trace, warn};

use crate::element::{AttrValue, ElementCallbacks, Hook, Lifecycle};
use crate::error::TreeError;
use crate::mutation::{MutationObserver, MutationRecord};
use crate::node::NodeId;

/// Produces the native callbacks for a registered tag.
pub type ElementFactory = Rc<dyn Fn() -> Rc<dyn ElementCallbacks>>;

const ROOT_TAG: &str = "#root";

enum NodeKind {
    Element(String),
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    hooks: BTreeMap<String, Hook>,
    callbacks: Option<Rc<dyn ElementCallbacks>>,
    /// Whether `callbacks.connected` ran without a matching `disconnected`.
    attached: bool,
    lifecycle: Option<Rc<dyn Lifecycle>>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            hooks: BTreeMap::new(),
            callbacks: None,
            attached: false,
            lifecycle: None,
        }
    }

    fn tag(&self) -> &str {
        match &self.kind {
            NodeKind::Element(tag) => tag,
            NodeKind::Text(_) => "#text",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReactionKind {
    Connected,
    Disconnected,
}

struct Reaction {
    kind: ReactionKind,
    node: NodeId,
    callbacks: Rc<dyn ElementCallbacks>,
}

/// An arena slot. `data` is `None` while the slot sits on the free list.
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

struct DocState {
    nodes: Vec<Slot>,
    free: Vec<usize>,
    registry: AHashMap<String, ElementFactory>,
    records: Vec<MutationRecord>,
    observers: Vec<Rc<dyn MutationObserver>>,
}

impl DocState {
    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.data.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.data.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        let node = self.node_mut(id)?;
        match node.kind {
            NodeKind::Element(_) => Ok(node),
            NodeKind::Text(_) => Err(TreeError::NotAnElement(id)),
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.nodes.get_mut(index) {
                slot.data = Some(data);
                return NodeId::new(index, slot.generation);
            }
        }
        let id = NodeId::new(self.nodes.len(), 0);
        self.nodes.push(Slot {
            generation: 0,
            data: Some(data),
        });
        id
    }

    /// Empty the slot of `id` and retire its generation.
    fn release(&mut self, id: NodeId) -> Option<NodeData> {
        self.get(id)?;
        let slot = self.nodes.get_mut(id.index())?;
        let data = slot.data.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        data
    }

    fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn is_connected(&self, mut id: NodeId) -> bool {
        loop {
            if id == NodeId::ROOT {
                return true;
            }
            match self.get(id).and_then(|n| n.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.get(id).and_then(|n| n.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Inclusive descendants of `id` in tree order.
    fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.get(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn collect_reactions(&self, nodes: &[NodeId], kind: ReactionKind, out: &mut Vec<Reaction>) {
        for &node in nodes {
            if let Some(callbacks) = self.get(node).and_then(|n| n.callbacks.clone()) {
                out.push(Reaction {
                    kind,
                    node,
                    callbacks,
                });
            }
        }
    }

    /// Unlink `child` from `parent`, recording the removal if `parent` is live.
    fn remove_from(&mut self, parent: NodeId, child: NodeId, reactions: &mut Vec<Reaction>) {
        let live = self.is_connected(parent);
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
        if live {
            let touched = self.preorder(child);
            self.collect_reactions(&touched, ReactionKind::Disconnected, reactions);
            self.records.push(MutationRecord {
                target: parent,
                added: Vec::new(),
                removed: vec![child],
                touched,
            });
        }
    }
}

/// Handle to a display tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocState>>,
}

/// Non-owning handle to a [`Document`].
///
/// Hosts whose callbacks are stored inside the document keep one of these
/// instead of a [`Document`], so the document can be dropped.
#[derive(Clone, Default)]
pub struct WeakDocument {
    inner: Weak<RefCell<DocState>>,
}

impl WeakDocument {
    /// The document, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl fmt::Debug for WeakDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDocument")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root.
    #[must_use]
    pub fn new() -> Self {
        let root = NodeData::new(NodeKind::Element(ROOT_TAG.to_owned()));
        Self {
            inner: Rc::new(RefCell::new(DocState {
                nodes: vec![Slot {
                    generation: 0,
                    data: Some(root),
                }],
                free: Vec::new(),
                registry: AHashMap::new(),
                records: Vec::new(),
                observers: Vec::new(),
            })),
        }
    }

    /// The root node.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Non-owning handle to this document.
    #[must_use]
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -----------------------------------------------------------------------
    // Registry and construction
    // -----------------------------------------------------------------------

    /// Register `tag` as an element kind with native lifecycle callbacks.
    /// Elements created from it afterwards receive `factory()`.
    pub fn define(&self, tag: &str, factory: impl Fn() -> Rc<dyn ElementCallbacks> + 'static) {
        self.inner
            .borrow_mut()
            .registry
            .insert(tag.to_owned(), Rc::new(factory));
    }

    /// Whether `tag` was registered with [`define`](Self::define).
    #[must_use]
    pub fn is_defined(&self, tag: &str) -> bool {
        self.inner.borrow().registry.contains_key(tag)
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let factory = self.inner.borrow().registry.get(tag).cloned();
        // Factories run outside the borrow; they may inspect the document.
        let callbacks = factory.map(|f| f());
        let mut data = NodeData::new(NodeKind::Element(tag.to_owned()));
        data.callbacks = callbacks;
        self.inner.borrow_mut().push(data)
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.inner
            .borrow_mut()
            .push(NodeData::new(NodeKind::Text(text.into())))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Tag of an element, `"#text"` for text nodes.
    pub fn tag(&self, node: NodeId) -> Result<String, TreeError> {
        Ok(self.inner.borrow().node(node)?.tag().to_owned())
    }

    /// Contents of a text node, `None` for elements.
    pub fn text(&self, node: NodeId) -> Result<Option<String>, TreeError> {
        Ok(match &self.inner.borrow().node(node)?.kind {
            NodeKind::Text(t) => Some(t.clone()),
            NodeKind::Element(_) => None,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> Result<String, TreeError> {
        let state = self.inner.borrow();
        state.node(node)?;
        let mut out = String::new();
        for id in state.preorder(node) {
            if let Some(NodeKind::Text(t)) = state.get(id).map(|n| &n.kind) {
                out.push_str(t);
            }
        }
        Ok(out)
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.inner.borrow().node(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        Ok(self.inner.borrow().node(node)?.children.clone())
    }

    /// Inclusive descendants of `node` in tree order.
    pub fn descendants(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let state = self.inner.borrow();
        state.node(node)?;
        Ok(state.preorder(node))
    }

    /// Whether `node` is part of the live tree.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.borrow().is_connected(node)
    }

    /// Number of live nodes, including the root. Disposed nodes are not
    /// counted.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().live_count()
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, moving it out of its
    /// current parent first.
    ///
    /// # Errors
    ///
    /// Structural errors leave the tree untouched. Callback failures are
    /// reported after every reaction ran.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let reactions = {
            let mut state = self.inner.borrow_mut();
            state.element_mut(parent)?;
            let old_parent = state.node(child)?.parent;
            if child == NodeId::ROOT || state.is_inclusive_ancestor(child, parent) {
                return Err(TreeError::HierarchyRequest { parent, child });
            }

            let mut reactions = Vec::new();
            if let Some(old) = old_parent {
                state.remove_from(old, child, &mut reactions);
            }
            state.element_mut(parent)?.children.push(child);
            state.node_mut(child)?.parent = Some(parent);

            if state.is_connected(parent) {
                let touched = state.preorder(child);
                state.collect_reactions(&touched, ReactionKind::Connected, &mut reactions);
                state.records.push(MutationRecord {
                    target: parent,
                    added: vec![child],
                    removed: Vec::new(),
                    touched,
                });
            }
            reactions
        };
        self.run_reactions(reactions)
    }

    /// Remove `child` from `parent`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotAChild`] if `child` is not under `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let reactions = {
            let mut state = self.inner.borrow_mut();
            state.node(parent)?;
            if state.node(child)?.parent != Some(parent) {
                return Err(TreeError::NotAChild { parent, child });
            }
            let mut reactions = Vec::new();
            state.remove_from(parent, child, &mut reactions);
            reactions
        };
        self.run_reactions(reactions)
    }

    /// Remove `node` from its parent, if it has one.
    pub fn detach(&self, node: NodeId) -> Result<(), TreeError> {
        match self.parent(node)? {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Remove every child of `node` in one change.
    pub fn clear_children(&self, node: NodeId) -> Result<(), TreeError> {
        let reactions = {
            let mut state = self.inner.borrow_mut();
            let children = std::mem::take(&mut state.element_mut(node)?.children);
            if children.is_empty() {
                return Ok(());
            }
            for &child in &children {
                if let Some(c) = state.get_mut(child) {
                    c.parent = None;
                }
            }
            let mut reactions = Vec::new();
            if state.is_connected(node) {
                let touched: Vec<NodeId> =
                    children.iter().flat_map(|&c| state.preorder(c)).collect();
                state.collect_reactions(&touched, ReactionKind::Disconnected, &mut reactions);
                state.records.push(MutationRecord {
                    target: node,
                    added: Vec::new(),
                    removed: children,
                    touched,
                });
            }
            reactions
        };
        self.run_reactions(reactions)
    }

    /// Free the detached subtree rooted at `node`. Its IDs become unknown and
    /// their slots are reused by later nodes. Back-references still connected
    /// are disconnected before they are dropped. Returns the number of nodes
    /// freed.
    ///
    /// # Errors
    ///
    /// [`TreeError::StillAttached`] for the root or a node with a parent.
    pub fn dispose(&self, node: NodeId) -> Result<usize, TreeError> {
        let freed: Vec<NodeData> = {
            let mut state = self.inner.borrow_mut();
            if node == NodeId::ROOT || state.node(node)?.parent.is_some() {
                return Err(TreeError::StillAttached(node));
            }
            let subtree = state.preorder(node);
            subtree.into_iter().filter_map(|id| state.release(id)).collect()
        };
        // Hosts are dropped here, outside the borrow.
        for lifecycle in freed.iter().filter_map(|data| data.lifecycle.as_ref()) {
            if lifecycle.is_connected() {
                lifecycle.disconnect();
            }
        }
        trace!(%node, freed = freed.len(), "subtree disposed");
        Ok(freed.len())
    }

    fn run_reactions(&self, reactions: Vec<Reaction>) -> Result<(), TreeError> {
        let mut first_error = None;
        for reaction in reactions {
            let node = reaction.node;
            let due = {
                let mut state = self.inner.borrow_mut();
                let live = state.is_connected(node);
                match state.get_mut(node) {
                    Some(data) => match reaction.kind {
                        ReactionKind::Connected if live && !data.attached => {
                            data.attached = true;
                            true
                        }
                        ReactionKind::Disconnected if data.attached => {
                            data.attached = false;
                            true
                        }
                        _ => false,
                    },
                    None => false,
                }
            };
            if !due {
                trace!(%node, kind = ?reaction.kind, "stale reaction skipped");
                continue;
            }
            let result = match reaction.kind {
                ReactionKind::Connected => reaction.callbacks.connected(self, node),
                ReactionKind::Disconnected => reaction.callbacks.disconnected(self, node),
            };
            if let Err(source) = result {
                let tag = self.tag(node).unwrap_or_default();
                warn!(%node, tag = %tag, error = %source, "element callback failed");
                if first_error.is_none() {
                    first_error = Some(TreeError::Callback { node, tag, source });
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // -----------------------------------------------------------------------
    // Attributes and hooks
    // -----------------------------------------------------------------------

    pub fn set_attribute(
        &self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        self.inner
            .borrow_mut()
            .element_mut(node)?
            .attributes
            .insert(name.to_owned(), value.into());
        Ok(())
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, TreeError> {
        Ok(self
            .inner
            .borrow_mut()
            .element_mut(node)?
            .attributes
            .remove(name))
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .get(node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    #[must_use]
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.inner
            .borrow()
            .get(node)
            .is_some_and(|n| n.attributes.contains_key(name))
    }

    pub fn set_hook(&self, node: NodeId, name: &str, hook: Hook) -> Result<(), TreeError> {
        self.inner
            .borrow_mut()
            .element_mut(node)?
            .hooks
            .insert(name.to_owned(), hook);
        Ok(())
    }

    #[must_use]
    pub fn hook(&self, node: NodeId, name: &str) -> Option<Hook> {
        self.inner
            .borrow()
            .get(node)
            .and_then(|n| n.hooks.get(name).cloned())
    }

    /// Run the hook stored under `name`. Returns whether one existed.
    pub fn invoke_hook(&self, node: NodeId, name: &str) -> Result<bool, TreeError> {
        self.inner.borrow().node(node)?;
        match self.hook(node, name) {
            Some(hook) => {
                hook(self, node);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply plain attributes: hooks are stored as behavior, text becomes a
    /// presentation attribute, unset values are skipped.
    pub fn apply_attributes<I, K>(&self, node: NodeId, attrs: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = (K, AttrValue)>,
        K: AsRef<str>,
    {
        for (key, value) in attrs {
            match value {
                AttrValue::Unset => continue,
                AttrValue::Hook(hook) => self.set_hook(node, key.as_ref(), hook)?,
                AttrValue::Text(text) => self.set_attribute(node, key.as_ref(), text)?,
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle plumbing
    // -----------------------------------------------------------------------

    /// Native callbacks of `node`, if its kind has them.
    #[must_use]
    pub fn callbacks(&self, node: NodeId) -> Option<Rc<dyn ElementCallbacks>> {
        self.inner
            .borrow()
            .get(node)
            .and_then(|n| n.callbacks.clone())
    }

    /// Replace the native callbacks of `node`.
    pub fn set_callbacks(
        &self,
        node: NodeId,
        callbacks: Rc<dyn ElementCallbacks>,
    ) -> Result<(), TreeError> {
        self.inner.borrow_mut().element_mut(node)?.callbacks = Some(callbacks);
        Ok(())
    }

    /// Binding back-reference of `node`.
    #[must_use]
    pub fn lifecycle(&self, node: NodeId) -> Option<Rc<dyn Lifecycle>> {
        self.inner
            .borrow()
            .get(node)
            .and_then(|n| n.lifecycle.clone())
    }

    pub fn set_lifecycle(
        &self,
        node: NodeId,
        lifecycle: Rc<dyn Lifecycle>,
    ) -> Result<(), TreeError> {
        self.inner.borrow_mut().element_mut(node)?.lifecycle = Some(lifecycle);
        Ok(())
    }

    /// Drop the back-reference, returning it.
    pub fn clear_lifecycle(&self, node: NodeId) -> Result<Option<Rc<dyn Lifecycle>>, TreeError> {
        Ok(self.inner.borrow_mut().node_mut(node)?.lifecycle.take())
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Register an observer for the whole live tree. Registering the same
    /// observer twice is a no-op; returns whether it was added.
    pub fn observe(&self, observer: Rc<dyn MutationObserver>) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.observers.iter().any(|o| Rc::ptr_eq(o, &observer)) {
            return false;
        }
        state.observers.push(observer);
        true
    }

    /// Number of records waiting for delivery.
    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.inner.borrow().records.len()
    }

    /// Remove and return the queued records without notifying observers.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.inner.borrow_mut().records)
    }

    /// Hand the queued batch to every observer. Returns the batch size.
    pub fn deliver_mutations(&self) -> usize {
        let (records, observers) = {
            let mut state = self.inner.borrow_mut();
            if state.records.is_empty() {
                return 0;
            }
            (std::mem::take(&mut state.records), state.observers.clone())
        };
        trace!(records = records.len(), observers = observers.len(), "delivering mutations");
        for observer in observers {
            observer.observe(self, &records);
        }
        records.len()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &state.live_count())
            .field("pending_records", &state.records.len())
            .field("observers", &state.observers.len())
            .finish()
    }
}
