#![forbid(unsafe_code)]

//! Publish/subscribe event bus for yrframe.
//!
//! - [`EventKind`] / [`Event`]: event classes and instances with a JSON
//!   payload, halting and parent chaining.
//! - [`FieldPath`]: zero to two field names locating a value in a payload.
//! - [`Listener`]: a callback bound to one kind at a priority.
//! - [`Bus`]: priority-ordered synchronous delivery plus deferred
//!   publications resolved by [`Bus::drain_pending`].

pub mod bus;
pub mod error;
pub mod event;
pub mod listener;
pub mod path;

pub use bus::{Bus, Resolution};
pub use error::{BusError, ListenerError};
pub use event::{Event, EventId, EventKind, ParentLink};
pub use listener::{Listener, ListenerFn, ListenerId, Priority};
pub use path::{FieldPath, MAX_PATH_DEPTH};
