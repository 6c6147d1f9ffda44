#![forbid(unsafe_code)]

//! Binding lifecycle runtime for yrframe.
//!
//! - [`binding`]: binding targets and the per-host [`BindingManager`].
//! - [`ComponentHost`]: hosts for [`Component`]s with native callbacks.
//! - [`Facade`]: adapted hosts for externally constructed elements.
//! - [`TreeBridge`]: forwards tree membership to adapted hosts.
//! - [`Factory`]: the construction entry point.
//! - [`EventLoop`]: drains mutation records and pull publications.

pub mod binding;
pub mod bridge;
pub mod children;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod facade;
pub mod factory;
pub mod host;
pub mod props;

pub use binding::{
    BindingError, BindingKind, BindingManager, BindingTarget, PullCallback, Requirement,
};
pub use bridge::TreeBridge;
pub use children::{Child, append_children, materialize};
pub use config::FrameConfig;
pub use error::FrameError;
pub use event_loop::EventLoop;
pub use facade::{Facade, FacadeComponent, FacadeHost, FacadeNode};
pub use factory::{Constructor, Factory, MountFn};
pub use host::{Component, ComponentHost, Host};
pub use props::{Prop, Props};
