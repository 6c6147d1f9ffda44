#![forbid(unsafe_code)]

//! Native lifecycle hosts.
//!
//! # Architecture
//!
//! A [`Component`] is plain state plus a render function. Mounting it
//! through [`ComponentHost::mount`] creates its element, lets the component
//! declare bindings into a fresh [`BindingManager`], and installs the host as
//! the element's native callbacks. The document owns the host from then on.
//!
//! # Invariants
//!
//! 1. On attach the manager connects before the render cycle runs.
//! 2. On detach the manager disconnects; render state is not consulted.
//! 3. Children handed to [`ComponentHost::append`] before the first attach
//!    become initial content for `render` to place; afterwards they are
//!    appended to the element directly.
//! 4. A redraw disposes the children it replaces unless the new output
//!    places them again, so repeated redraws keep the document bounded.
//!
//! # Failure Modes
//!
//! - Render and inject errors surface from the mutation that attached the
//!   host, as [`TreeError::Callback`](yrf_core::TreeError::Callback).
//! - Operations on a host whose document was dropped fail with
//!   [`FrameError::DocumentGone`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use tracing::{debug, debug_span};
use yrf_core::{CallbackError, Document, ElementCallbacks, NodeId, WeakDocument};

use crate::binding::{BindingError, BindingManager};
use crate::children::{Child, append_children, materialize};
use crate::error::FrameError;
use crate::factory::Factory;
use crate::props::Props;

/// A node that owns a binding manager.
pub trait Host: 'static {
    /// The document the node lives in, while it is alive.
    fn document(&self) -> Option<Document>;
    /// The host's element.
    fn node(&self) -> NodeId;
}

/// A natively hosted component.
pub trait Component: Sized + 'static {
    /// Tag of the element created for the component.
    const TAG: &'static str;

    /// Props merged beneath the caller's.
    fn defaults() -> Props {
        Props::new()
    }

    /// Build the component from merged props and declare its bindings.
    ///
    /// # Errors
    ///
    /// Declaration errors, typically [`BindingError::MissingConfig`].
    fn create(
        props: &Props,
        events: &mut BindingManager<ComponentHost<Self>>,
    ) -> Result<Self, BindingError>;

    /// Produce the element's children. Runs on every attach and on
    /// [`ComponentHost::redraw`]. Places the initial content by default.
    fn render(&self, host: &ComponentHost<Self>) -> Child {
        Child::list(host.initial_children())
    }

    /// Post-render adjustments of the freshly rendered children.
    ///
    /// # Errors
    ///
    /// Anything the adjustment reports.
    fn inject(&self, _host: &ComponentHost<Self>) -> Result<(), FrameError> {
        Ok(())
    }
}

/// Type name without its module path, generics kept.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

/// A mounted [`Component`]: the component, its binding manager and its
/// element.
pub struct ComponentHost<C: 'static> {
    component: C,
    events: BindingManager<ComponentHost<C>>,
    doc: WeakDocument,
    node: NodeId,
    max_child_depth: usize,
    ever_attached: Cell<bool>,
    initial_children: RefCell<Vec<NodeId>>,
}

impl<C: Component> ComponentHost<C> {
    /// Create the element for `C`, build the component and install the host
    /// as the element's callbacks. Plain props become attributes.
    ///
    /// # Errors
    ///
    /// Declaration errors from [`Component::create`] and tree errors from
    /// applying attributes.
    pub fn mount(factory: &Factory, props: &Props) -> Result<Rc<Self>, FrameError> {
        let doc = factory.document();
        let config = factory.config();
        let merged = Props::merged(&C::defaults(), props);

        let mut events = BindingManager::with_bus(short_type_name::<C>(), factory.bus().clone());
        let component = C::create(&merged, &mut events)?;
        let node = doc.create_element(C::TAG);

        let host = Rc::new(Self {
            component,
            events,
            doc: doc.downgrade(),
            node,
            max_child_depth: config.max_child_depth,
            ever_attached: Cell::new(false),
            initial_children: RefCell::new(Vec::new()),
        });
        host.events.bind_host(&host);
        doc.set_callbacks(node, Rc::clone(&host) as Rc<dyn ElementCallbacks>)?;

        let (plain, _special) = merged.partition(&config.special_prefix);
        doc.apply_attributes(node, plain)?;
        debug!(
            owner = host.events.owner(),
            %node,
            listeners = host.events.listener_count(),
            "component mounted"
        );
        Ok(host)
    }

    #[must_use]
    pub fn component(&self) -> &C {
        &self.component
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn events(&self) -> &BindingManager<Self> {
        &self.events
    }

    /// Whether the host was attached at least once.
    #[must_use]
    pub fn ever_attached(&self) -> bool {
        self.ever_attached.get()
    }

    /// Content supplied before the first attach.
    #[must_use]
    pub fn initial_children(&self) -> Vec<NodeId> {
        self.initial_children.borrow().clone()
    }

    fn doc(&self) -> Result<Document, FrameError> {
        self.doc.upgrade().ok_or_else(|| FrameError::DocumentGone {
            owner: self.events.owner().to_owned(),
        })
    }

    /// Add children: kept as initial content before the first attach,
    /// appended to the element afterwards.
    ///
    /// # Errors
    ///
    /// Materialization and tree errors.
    pub fn append(&self, child: impl Into<Child>) -> Result<(), FrameError> {
        let doc = self.doc()?;
        if self.ever_attached.get() {
            return append_children(&doc, self.node, child.into(), self.max_child_depth);
        }
        let nodes = materialize(&doc, child.into(), self.max_child_depth)?;
        self.initial_children.borrow_mut().extend(nodes);
        Ok(())
    }

    /// Remove every child of the element.
    ///
    /// # Errors
    ///
    /// Tree errors, or [`FrameError::DocumentGone`].
    pub fn clear_children(&self) -> Result<(), FrameError> {
        Ok(self.doc()?.clear_children(self.node)?)
    }

    /// Whether the element carries the `disabled` attribute.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.doc
            .upgrade()
            .is_some_and(|doc| doc.has_attribute(self.node, "disabled"))
    }

    /// Render, replace the element's children and run [`Component::inject`].
    /// Previous children that the new output does not reuse are disposed.
    ///
    /// # Errors
    ///
    /// Materialization, tree and inject errors.
    pub fn redraw(&self) -> Result<(), FrameError> {
        let doc = self.doc()?;
        self.redraw_in(&doc)
    }

    fn redraw_in(&self, doc: &Document) -> Result<(), FrameError> {
        let _span = debug_span!("redraw", owner = self.events.owner(), node = %self.node).entered();
        let output = self.component.render(self);
        let previous = doc.children(self.node)?;
        doc.clear_children(self.node)?;
        append_children(doc, self.node, output, self.max_child_depth)?;
        // Replaced children the new output did not take back are freed.
        for child in previous {
            if doc.parent(child)?.is_none() {
                doc.dispose(child)?;
            }
        }
        self.component.inject(self)
    }
}

impl<C: Component> Host for ComponentHost<C> {
    fn document(&self) -> Option<Document> {
        self.doc.upgrade()
    }

    fn node(&self) -> NodeId {
        self.node
    }
}

impl<C: Component> ElementCallbacks for ComponentHost<C> {
    fn connected(&self, doc: &Document, _node: NodeId) -> Result<(), CallbackError> {
        self.ever_attached.set(true);
        self.events.connect();
        self.redraw_in(doc)?;
        Ok(())
    }

    fn disconnected(&self, _doc: &Document, _node: NodeId) -> Result<(), CallbackError> {
        self.events.disconnect();
        Ok(())
    }
}

impl<C: 'static> Deref for ComponentHost<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.component
    }
}

impl<C: 'static> fmt::Debug for ComponentHost<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHost")
            .field("node", &self.node)
            .field("ever_attached", &self.ever_attached.get())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
