#![forbid(unsafe_code)]

//! Element construction.
//!
//! [`Factory::make`] is the single construction entry point. The requested
//! kind is a [`Constructor`], resolved once per call:
//!
//! | Variant | Element | Lifecycle |
//! |---------|---------|-----------|
//! | `Plain` | `create_element(tag)` | none |
//! | `Native` | [`ComponentHost::mount`] | native callbacks |
//! | `Facade` | [`Facade`] + [`FacadeComponent::setup`] | wrapped callbacks or [`TreeBridge`] |
//! | `Fragment` | none; children are returned as-is | n/a |

use std::fmt;
use std::rc::Rc;

use tracing::trace;
use yrf_bus::Bus;
use yrf_core::{Document, NodeId};

use crate::bridge::TreeBridge;
use crate::children::{Child, append_children};
use crate::config::FrameConfig;
use crate::error::FrameError;
use crate::facade::{Facade, FacadeComponent, FacadeNode};
use crate::host::{Component, ComponentHost, short_type_name};
use crate::props::Props;

/// Builds a constructed element from props and children.
pub type MountFn = fn(&Factory, &Props, Child) -> Result<NodeId, FrameError>;

/// How [`Factory::make`] builds an element.
#[derive(Clone, Copy)]
pub enum Constructor {
    /// A plain element with the given tag.
    Plain(&'static str),
    /// A natively hosted component.
    Native(MountFn),
    /// An adapted external element.
    Facade(MountFn),
    /// No element; the children are the result.
    Fragment,
}

impl Constructor {
    #[must_use]
    pub fn native<C: Component>() -> Self {
        Self::Native(mount_native::<C>)
    }

    #[must_use]
    pub fn facade<F: FacadeComponent>() -> Self {
        Self::Facade(mount_facade::<F>)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(tag) => f.debug_tuple("Plain").field(tag).finish(),
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Facade(_) => f.write_str("Facade(..)"),
            Self::Fragment => f.write_str("Fragment"),
        }
    }
}

fn mount_native<C: Component>(
    factory: &Factory,
    props: &Props,
    children: Child,
) -> Result<NodeId, FrameError> {
    let host = factory.mount::<C>(props)?;
    host.append(children)?;
    Ok(host.node())
}

fn mount_facade<F: FacadeComponent>(
    factory: &Factory,
    props: &Props,
    children: Child,
) -> Result<NodeId, FrameError> {
    let node = factory.facade::<F>(props)?.node();
    append_children(factory.document(), node, children, factory.config().max_child_depth)?;
    Ok(node)
}

/// Construction context: the document, the bus and the configuration every
/// built element shares.
#[derive(Clone)]
pub struct Factory {
    doc: Document,
    bus: Bus,
    config: FrameConfig,
}

impl Factory {
    /// Build into `doc` on the thread's default bus with default settings.
    /// Registers the [`TreeBridge`] with `doc`.
    #[must_use]
    pub fn new(doc: &Document) -> Self {
        TreeBridge::watch(doc);
        Self {
            doc: doc.clone(),
            bus: Bus::global(),
            config: FrameConfig::default(),
        }
    }

    #[must_use]
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: FrameConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Build the element `ctor` describes and give it `children`.
    ///
    /// Returns the element, or the children themselves for a fragment.
    ///
    /// # Errors
    ///
    /// Declaration, materialization and tree errors.
    pub fn make(
        &self,
        ctor: Constructor,
        props: &Props,
        children: impl Into<Child>,
    ) -> Result<Child, FrameError> {
        let children = children.into();
        trace!(?ctor, "make");
        let node = match ctor {
            Constructor::Fragment => return Ok(children),
            Constructor::Plain(tag) => {
                let node = self.element(tag, props)?;
                append_children(&self.doc, node, children, self.config.max_child_depth)?;
                node
            }
            Constructor::Native(mount) | Constructor::Facade(mount) => {
                mount(self, props, children)?
            }
        };
        Ok(Child::Node(node))
    }

    /// Create a plain element and apply the plain `props` as attributes.
    /// Special props are ignored.
    ///
    /// # Errors
    ///
    /// Tree errors from applying attributes.
    pub fn element(&self, tag: &str, props: &Props) -> Result<NodeId, FrameError> {
        let node = self.doc.create_element(tag);
        let (plain, _special) = props.partition(&self.config.special_prefix);
        self.doc.apply_attributes(node, plain)?;
        Ok(node)
    }

    /// Mount component `C`.
    ///
    /// # Errors
    ///
    /// See [`ComponentHost::mount`].
    pub fn mount<C: Component>(&self, props: &Props) -> Result<Rc<ComponentHost<C>>, FrameError> {
        ComponentHost::mount(self, props)
    }

    /// Build and finish facade kind `F`.
    ///
    /// # Errors
    ///
    /// Tree and declaration errors.
    pub fn facade<F: FacadeComponent>(&self, props: &Props) -> Result<FacadeNode, FrameError> {
        let mut facade = Facade::new(self, F::TAG, short_type_name::<F>(), &F::defaults(), props)?;
        F::setup(&mut facade)?;
        facade.finish()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("doc", &self.doc)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
