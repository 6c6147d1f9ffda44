#![forbid(unsafe_code)]

//! The publish/subscribe bus.
//!
//! # Architecture
//!
//! `Bus` is a cheap-clone handle over `Rc<RefCell<..>>` state, following the
//! single-threaded execution model: every delivery, subscription change and
//! deferred resolution runs on one thread. [`Bus::global`] hands out the
//! thread's default bus.
//!
//! Subscribers of one kind are kept sorted by `(nice, sequence)`, where the
//! sequence number is assigned at subscription time. Delivery walks a
//! snapshot of that list with the internal borrow released, so listeners may
//! publish, subscribe or unsubscribe re-entrantly.
//!
//! # Invariants
//!
//! 1. Listeners of one kind run in ascending priority; equal priorities run
//!    in subscription order.
//! 2. A listener is subscribed at most once. Subscribing an active listener
//!    and unsubscribing an inactive one are no-ops.
//! 3. A listener unsubscribed during a delivery is not invoked for the rest
//!    of that delivery.
//! 4. Once an event is halted no further listener sees it.
//!
//! # Failure Modes
//!
//! - A listener error aborts the delivery and is returned to the publisher
//!   as [`BusError::Listener`].
//! - A deferred publication that is never drained stays pending forever.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, trace, warn};

use crate::error::BusError;
use crate::event::{Event, EventKind};
use crate::listener::{Listener, ListenerId, Priority};

thread_local! {
    static GLOBAL_BUS: Bus = Bus::new();
}

/// Completion callback of a deferred publication.
pub type Resolution = Box<dyn FnOnce(Event)>;

struct Entry {
    nice: Priority,
    seq: u64,
    listener: Rc<Listener>,
}

struct Deferred {
    event: Event,
    on_resolved: Resolution,
}

#[derive(Default)]
struct BusState {
    by_kind: AHashMap<EventKind, Vec<Entry>>,
    active: AHashMap<ListenerId, EventKind>,
    next_seq: u64,
    pending: VecDeque<Deferred>,
}

/// Handle to a publish/subscribe bus.
#[derive(Clone, Default)]
pub struct Bus {
    inner: Rc<RefCell<BusState>>,
}

impl Bus {
    /// Create an empty, independent bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the thread's default bus.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_BUS.with(Clone::clone)
    }

    /// Whether two handles refer to the same bus.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Subscribe `listener` to its kind.
    ///
    /// Returns `false` (and changes nothing) when it is already subscribed.
    pub fn subscribe(&self, listener: &Rc<Listener>) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.active.contains_key(&listener.id()) {
            warn!(
                listener = listener.name(),
                kind = listener.kind().name(),
                "listener already subscribed"
            );
            return false;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.active.insert(listener.id(), listener.kind());

        let nice = listener.nice();
        let entries = state.by_kind.entry(listener.kind()).or_default();
        // seq is the largest so far, so ties land after existing entries.
        let at = entries.partition_point(|e| e.nice <= nice);
        entries.insert(
            at,
            Entry {
                nice,
                seq,
                listener: Rc::clone(listener),
            },
        );
        trace!(
            listener = listener.name(),
            kind = listener.kind().name(),
            nice,
            seq,
            "subscribed"
        );
        true
    }

    /// Remove `listener` from the bus.
    ///
    /// Returns `false` when it was not subscribed.
    pub fn unsubscribe(&self, listener: &Listener) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(kind) = state.active.remove(&listener.id()) else {
            return false;
        };
        let now_empty = match state.by_kind.get_mut(&kind) {
            Some(entries) => {
                entries.retain(|e| e.listener.id() != listener.id());
                entries.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.by_kind.remove(&kind);
        }
        trace!(listener = listener.name(), kind = kind.name(), "unsubscribed");
        true
    }

    /// Whether the listener with `id` is currently subscribed.
    #[must_use]
    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.inner.borrow().active.contains_key(&id)
    }

    /// Total number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().active.len()
    }

    /// Number of active subscriptions for `kind`.
    #[must_use]
    pub fn subscribers(&self, kind: EventKind) -> usize {
        self.inner.borrow().by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` synchronously and return it after the last listener.
    ///
    /// # Errors
    ///
    /// [`BusError::Listener`] if a listener fails; later listeners do not run.
    pub fn publish(&self, mut event: Event) -> Result<Event, BusError> {
        let kind = event.kind();
        let _span = tracing::debug_span!(
            "bus_publish",
            kind = kind.name(),
            event = event.id().id()
        )
        .entered();

        let snapshot: Vec<Rc<Listener>> = self
            .inner
            .borrow()
            .by_kind
            .get(&kind)
            .map(|entries| entries.iter().map(|e| Rc::clone(&e.listener)).collect())
            .unwrap_or_default();

        for listener in snapshot {
            if event.is_stopped() {
                break;
            }
            if !self.is_subscribed(listener.id()) {
                continue;
            }
            listener
                .handle(&mut event)
                .map_err(|source| BusError::Listener {
                    listener: listener.name().to_owned(),
                    kind: kind.name(),
                    source,
                })?;
            if let Some(reason) = event.halt_reason() {
                debug!(listener = listener.name(), reason, "event halted");
            }
        }
        Ok(event)
    }

    /// Queue `event` for delivery on the next [`drain_pending`](Self::drain_pending).
    ///
    /// `on_resolved` receives the event once every listener has seen it.
    pub fn publish_deferred(&self, event: Event, on_resolved: impl FnOnce(Event) + 'static) {
        trace!(kind = event.kind().name(), event = event.id().id(), "deferred");
        self.inner.borrow_mut().pending.push_back(Deferred {
            event,
            on_resolved: Box::new(on_resolved),
        });
    }

    /// Number of deferred publications waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Deliver the publications queued so far in FIFO order and run their
    /// resolutions. Publications queued while draining wait for the next
    /// call. Returns how many were resolved.
    ///
    /// # Errors
    ///
    /// Stops at the first failed delivery; its resolution is dropped and the
    /// rest of the queue stays pending.
    pub fn drain_pending(&self) -> Result<usize, BusError> {
        let batch = self.pending();
        let mut resolved = 0;
        while resolved < batch {
            let next = self.inner.borrow_mut().pending.pop_front();
            let Some(Deferred { event, on_resolved }) = next else {
                break;
            };
            let event = self.publish(event)?;
            on_resolved(event);
            resolved += 1;
        }
        Ok(resolved)
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Bus")
            .field("subscriptions", &state.active.len())
            .field("kinds", &state.by_kind.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use tracing_test::traced_test;

    const PING: EventKind = EventKind::new("ping");
    const PONG: EventKind = EventKind::new("pong");

    fn recorder(
        log: &Rc<RefCell<Vec<&'static str>>>,
        tag: &'static str,
    ) -> impl Fn(&mut Event) -> Result<(), crate::ListenerError> + 'static {
        let log = Rc::clone(log);
        move |_| {
            log.borrow_mut().push(tag);
            Ok(())
        }
    }

    #[test]
    fn delivery_follows_priority_then_subscription_order() {
        let bus = Bus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let late = Rc::new(Listener::new(PING, 5, recorder(&log, "late")));
        let first = Rc::new(Listener::new(PING, -1, recorder(&log, "first")));
        let tie_a = Rc::new(Listener::new(PING, 0, recorder(&log, "tie_a")));
        let tie_b = Rc::new(Listener::new(PING, 0, recorder(&log, "tie_b")));
        for l in [&late, &tie_a, &first, &tie_b] {
            assert!(bus.subscribe(l));
        }

        bus.publish(PING.instantiate()).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "tie_a", "tie_b", "late"]);
    }

    #[test]
    fn kinds_are_isolated() {
        let bus = Bus::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let l = Rc::new(Listener::new(PING, 0, move |_| {
            h.set(h.get() + 1);
            Ok(())
        }));
        bus.subscribe(&l);
        bus.publish(PONG.instantiate()).unwrap();
        assert_eq!(hits.get(), 0);
        bus.publish(PING.instantiate()).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscribers(PING), 1);
        assert_eq!(bus.subscribers(PONG), 0);
    }

    #[traced_test]
    #[test]
    fn double_subscribe_is_a_logged_noop() {
        let bus = Bus::new();
        let l = Rc::new(Listener::new(PING, 0, |_| Ok(())).named("value", "Counter"));
        assert!(bus.subscribe(&l));
        assert!(!bus.subscribe(&l));
        assert_eq!(bus.subscription_count(), 1);
        assert!(logs_contain("listener already subscribed"));
    }

    #[test]
    fn unsubscribe_inactive_is_noop() {
        let bus = Bus::new();
        let l = Rc::new(Listener::new(PING, 0, |_| Ok(())));
        assert!(!bus.unsubscribe(&l));
        bus.subscribe(&l);
        assert!(bus.unsubscribe(&l));
        assert!(!bus.unsubscribe(&l));
        assert_eq!(bus.subscription_count(), 0);
        assert_eq!(bus.subscribers(PING), 0);
    }

    #[test]
    fn halt_skips_remaining_listeners() {
        let bus = Bus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let stopper = Rc::new(Listener::new(PING, 0, |ev| {
            ev.stop("enough");
            Ok(())
        }));
        let after = Rc::new(Listener::new(PING, 1, recorder(&log, "after")));
        bus.subscribe(&stopper);
        bus.subscribe(&after);

        let ev = bus.publish(PING.instantiate()).unwrap();
        assert_eq!(ev.halt_reason(), Some("enough"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unsubscribed_mid_delivery_is_skipped() {
        let bus = Bus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim = Rc::new(Listener::new(PING, 1, recorder(&log, "victim")));
        let b = bus.clone();
        let v = Rc::clone(&victim);
        let killer = Rc::new(Listener::new(PING, 0, move |_| {
            b.unsubscribe(&v);
            Ok(())
        }));
        bus.subscribe(&killer);
        bus.subscribe(&victim);

        bus.publish(PING.instantiate()).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn listener_error_aborts_delivery() {
        let bus = Bus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let failing = Rc::new(
            Listener::new(PING, 0, |_| Err("boom".into())).named("broken", "Widget"),
        );
        let after = Rc::new(Listener::new(PING, 1, recorder(&log, "after")));
        bus.subscribe(&failing);
        bus.subscribe(&after);

        let err = bus.publish(PING.instantiate()).unwrap_err();
        assert!(matches!(&err, BusError::Listener { listener, .. } if listener == "broken@Widget"));
        assert_eq!(err.to_string(), "listener 'broken@Widget' failed on 'ping': boom");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reentrant_publish_from_listener() {
        let bus = Bus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let b = bus.clone();
        let relay = Rc::new(Listener::new(PING, 0, move |ev| {
            let mut pong = PONG.instantiate();
            pong.chain(ev);
            b.publish(pong)?;
            Ok(())
        }));
        let sink = Rc::new(Listener::new(PONG, 0, recorder(&log, "pong")));
        bus.subscribe(&relay);
        bus.subscribe(&sink);

        bus.publish(PING.instantiate()).unwrap();
        assert_eq!(*log.borrow(), vec!["pong"]);
    }

    #[test]
    fn deferred_publication_resolves_on_drain() {
        let bus = Bus::new();
        let filler = Rc::new(Listener::new(PING, 0, |ev| {
            ev.set_field("answer", json!(42));
            Ok(())
        }));
        bus.subscribe(&filler);

        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        bus.publish_deferred(PING.instantiate(), move |ev| {
            *s.borrow_mut() = ev.get("answer").cloned();
        });
        assert_eq!(bus.pending(), 1);
        assert!(seen.borrow().is_none());

        assert_eq!(bus.drain_pending().unwrap(), 1);
        assert_eq!(bus.pending(), 0);
        assert_eq!(*seen.borrow(), Some(json!(42)));
    }

    #[test]
    fn publications_queued_while_draining_wait_for_next_drain() {
        let bus = Bus::new();
        let count = Rc::new(Cell::new(0));
        let (b, c) = (bus.clone(), Rc::clone(&count));
        bus.publish_deferred(PING.instantiate(), move |_| {
            c.set(c.get() + 1);
            let c2 = Rc::clone(&c);
            b.publish_deferred(PONG.instantiate(), move |_| c2.set(c2.get() + 1));
        });
        assert_eq!(bus.drain_pending().unwrap(), 1);
        assert_eq!(bus.pending(), 1);
        assert_eq!(bus.drain_pending().unwrap(), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn global_bus_is_shared_per_thread() {
        assert!(Bus::global().ptr_eq(&Bus::global()));
        assert!(!Bus::global().ptr_eq(&Bus::new()));
    }
}
