#![forbid(unsafe_code)]

//! Bus listeners.
//!
//! A [`Listener`] is a callback bound to one [`EventKind`] with a priority
//! ("nice") value. Its identity is stable: the same `Rc<Listener>` can be
//! subscribed, unsubscribed and subscribed again any number of times.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ListenerError;
use crate::event::{Event, EventKind};

/// Listener priority. Lower values are invoked first.
pub type Priority = i32;

/// Closure type for listener callbacks.
pub type ListenerFn = dyn Fn(&mut Event) -> Result<(), ListenerError>;

/// Global counter for unique listener IDs.
static LISTENER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// A callback bound to an event kind.
pub struct Listener {
    id: ListenerId,
    kind: EventKind,
    nice: Priority,
    name: String,
    callback: Box<ListenerFn>,
}

impl Listener {
    /// Create a listener for `kind` at priority `nice`.
    pub fn new(
        kind: EventKind,
        nice: Priority,
        callback: impl Fn(&mut Event) -> Result<(), ListenerError> + 'static,
    ) -> Self {
        let id = ListenerId::next();
        Self {
            id,
            kind,
            nice,
            name: format!("listener#{}", id.id()),
            callback: Box::new(callback),
        }
    }

    /// Attach a debug name of the form `name@owner`.
    #[must_use]
    pub fn named(mut self, name: &str, owner: &str) -> Self {
        self.name = format!("{name}@{owner}");
        self
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn nice(&self) -> Priority {
        self.nice
    }

    /// Debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the callback.
    ///
    /// # Errors
    ///
    /// Whatever the callback returns.
    pub fn handle(&self, event: &mut Event) -> Result<(), ListenerError> {
        (self.callback)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("nice", &self.nice)
            .field("name", &self.name)
            .finish()
    }
}
