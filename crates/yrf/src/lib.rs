#![forbid(unsafe_code)]

//! yrframe public facade crate.
//!
//! Re-exports the bus, the display tree and the binding runtime, plus a
//! [`prelude`] for components.

pub use yrf_bus as bus;
pub use yrf_core as tree;
pub use yrf_runtime as runtime;

pub use serde_json::{Value, json};
pub use yrf_bus::{Bus, Event, EventKind, FieldPath, Priority};
pub use yrf_core::{AttrValue, Document, NodeId};
pub use yrf_runtime::{
    BindingError, BindingManager, BindingTarget, Child, Component, ComponentHost, Constructor,
    EventLoop, Facade, FacadeComponent, FacadeNode, Factory, FrameConfig, FrameError, Props,
    Requirement, TreeBridge,
};

#[cfg(feature = "subscriber")]
pub mod logging;

/// Everything a component module usually needs.
pub mod prelude {
    pub use crate::{
        AttrValue, BindingError, BindingManager, BindingTarget, Bus, Child, Component,
        ComponentHost, Constructor, Document, Event, EventKind, EventLoop, Facade,
        FacadeComponent, Factory, FrameError, NodeId, Props, Requirement, Value, json,
    };
    pub use yrf_runtime::Host;
}
