#![forbid(unsafe_code)]

//! Adapted hosts for externally constructed elements.
//!
//! # Architecture
//!
//! A [`Facade`] wraps an element the framework did not build and gives it
//! the same binding lifecycle as a [`Component`](crate::Component). Its
//! [`BindingManager`] is created on the first call to [`Facade::events`].
//! [`Facade::finish`] then picks one of three outcomes:
//!
//! - no binding declared: the manager is dropped and the element is handed
//!   back untouched;
//! - the element has native callbacks: they are wrapped so the manager
//!   connects and disconnects first, then the original callbacks run;
//! - otherwise: the host is stored as the element's lifecycle
//!   back-reference and the [`TreeBridge`] forwards membership changes.
//!
//! # Invariants
//!
//! 1. A facade without bindings leaves no manager and no back-reference.
//! 2. Wrapped native callbacks still run, after the manager.
//! 3. A facade finished on an already connected element starts connected.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};
use yrf_bus::Bus;
use yrf_core::{CallbackError, Document, ElementCallbacks, Lifecycle, NodeId, WeakDocument};

use crate::binding::{BindingError, BindingManager};
use crate::bridge::TreeBridge;
use crate::error::FrameError;
use crate::factory::Factory;
use crate::host::Host;
use crate::props::Props;

/// Host of a finished facade.
pub struct FacadeHost {
    doc: WeakDocument,
    node: NodeId,
    events: BindingManager<FacadeHost>,
}

impl FacadeHost {
    #[must_use]
    pub fn events(&self) -> &BindingManager<Self> {
        &self.events
    }
}

impl Host for FacadeHost {
    fn document(&self) -> Option<Document> {
        self.doc.upgrade()
    }

    fn node(&self) -> NodeId {
        self.node
    }
}

impl Lifecycle for FacadeHost {
    fn connect(&self) {
        self.events.connect();
    }

    fn disconnect(&self) {
        self.events.disconnect();
    }

    fn is_connected(&self) -> bool {
        self.events.is_connected()
    }

    fn owner(&self) -> &str {
        self.events.owner()
    }
}

impl fmt::Debug for FacadeHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeHost")
            .field("node", &self.node)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Native callbacks that run a facade's manager ahead of the element's own.
struct ChainedCallbacks {
    host: Rc<FacadeHost>,
    inner: Rc<dyn ElementCallbacks>,
}

impl ElementCallbacks for ChainedCallbacks {
    fn connected(&self, doc: &Document, node: NodeId) -> Result<(), CallbackError> {
        self.host.events.connect();
        self.inner.connected(doc, node)
    }

    fn disconnected(&self, doc: &Document, node: NodeId) -> Result<(), CallbackError> {
        self.host.events.disconnect();
        self.inner.disconnected(doc, node)
    }
}

/// An externally constructed element being configured.
pub struct Facade {
    doc: Document,
    bus: Bus,
    node: NodeId,
    owner: String,
    props: Props,
    events: Option<BindingManager<FacadeHost>>,
}

impl Facade {
    /// Create an element with `tag`, merge `props` over `defaults` and apply
    /// the plain ones as attributes.
    ///
    /// # Errors
    ///
    /// Tree errors from applying attributes.
    pub fn new(
        factory: &Factory,
        tag: &str,
        owner: impl Into<String>,
        defaults: &Props,
        props: &Props,
    ) -> Result<Self, FrameError> {
        let node = factory.document().create_element(tag);
        Self::wrap(factory, node, owner, &Props::merged(defaults, props))
    }

    /// Adopt an existing element, applying the plain `props` as attributes.
    ///
    /// # Errors
    ///
    /// Tree errors from applying attributes.
    pub fn wrap(
        factory: &Factory,
        node: NodeId,
        owner: impl Into<String>,
        props: &Props,
    ) -> Result<Self, FrameError> {
        let doc = factory.document().clone();
        let (plain, _special) = props.partition(&factory.config().special_prefix);
        doc.apply_attributes(node, plain)?;
        Ok(Self {
            doc,
            bus: factory.bus().clone(),
            node,
            owner: owner.into(),
            props: props.clone(),
            events: None,
        })
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Merged props, special keys included.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Whether a manager was created.
    #[must_use]
    pub fn has_events(&self) -> bool {
        self.events.is_some()
    }

    /// The facade's binding manager, created on first use.
    pub fn events(&mut self) -> &mut BindingManager<FacadeHost> {
        let (owner, bus) = (&self.owner, &self.bus);
        self.events
            .get_or_insert_with(|| BindingManager::with_bus(owner.clone(), bus.clone()))
    }

    /// Hand the element back, wiring its lifecycle if any binding was
    /// declared.
    ///
    /// # Errors
    ///
    /// Tree errors from installing callbacks or the back-reference.
    pub fn finish(self) -> Result<FacadeNode, FrameError> {
        let Some(events) = self.events.filter(|e| !e.is_empty()) else {
            trace!(owner = %self.owner, node = %self.node, "facade without bindings");
            return Ok(FacadeNode {
                node: self.node,
                host: None,
            });
        };

        let host = Rc::new(FacadeHost {
            doc: self.doc.downgrade(),
            node: self.node,
            events,
        });
        host.events.bind_host(&host);

        match self.doc.callbacks(self.node) {
            Some(inner) => {
                let chained = ChainedCallbacks {
                    host: Rc::clone(&host),
                    inner,
                };
                self.doc.set_callbacks(self.node, Rc::new(chained))?;
                debug!(owner = %self.owner, node = %self.node, "facade wraps native callbacks");
            }
            None => {
                self.doc
                    .set_lifecycle(self.node, Rc::clone(&host) as Rc<dyn Lifecycle>)?;
                TreeBridge::watch(&self.doc);
                debug!(owner = %self.owner, node = %self.node, "facade relies on tree bridge");
            }
        }

        if self.doc.is_connected(self.node) {
            host.events.connect();
        }
        Ok(FacadeNode {
            node: self.node,
            host: Some(host),
        })
    }
}

impl fmt::Debug for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facade")
            .field("owner", &self.owner)
            .field("node", &self.node)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// A finished facade: the element and, if it has bindings, its host.
#[derive(Debug, Clone)]
pub struct FacadeNode {
    node: NodeId,
    host: Option<Rc<FacadeHost>>,
}

impl FacadeNode {
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn host(&self) -> Option<&Rc<FacadeHost>> {
        self.host.as_ref()
    }

    /// Whether a binding manager was retained.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.host.is_some()
    }
}

/// An externally constructed element kind with bindings.
pub trait FacadeComponent: 'static {
    /// Tag of the wrapped element.
    const TAG: &'static str;

    fn defaults() -> Props {
        Props::new()
    }

    /// Declare bindings on the facade.
    ///
    /// # Errors
    ///
    /// Declaration errors.
    fn setup(facade: &mut Facade) -> Result<(), BindingError>;
}
