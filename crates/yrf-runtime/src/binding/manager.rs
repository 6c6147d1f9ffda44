#![forbid(unsafe_code)]

//! Per-host binding manager.
//!
//! # Architecture
//!
//! A [`BindingManager`] is filled during its host's construction through the
//! `attach_*` methods, then moved into the host and never mutated again
//! except for its activity flag. Listener-backed bindings become persistent
//! [`Listener`]s whose identity survives every connect/disconnect cycle. Pull
//! bindings (`attach_source`, `attach_static`) and push bindings
//! (`attach_trigger`) become named functions reached through [`seek`] and
//! [`fire`].
//!
//! Callbacks reach the host through a shared weak slot filled by
//! [`bind_host`] once the host is allocated. A manager is usually stored
//! inside its host, so the slot must not keep the host alive.
//!
//! # Invariants
//!
//! 1. The listener list is fixed once the host owns the manager.
//! 2. After [`connect`] every listener is subscribed exactly once; after
//!    [`disconnect`] none is. Redundant calls change nothing.
//! 3. Missing mandatory configuration fails at declaration time.
//! 4. Two-level paths on writing bindings fail when the binding fires.
//!
//! # Failure Modes
//!
//! - A listener firing after its host was dropped does nothing.
//! - A manager dropped while connected unsubscribes its listeners.
//!
//! [`seek`]: BindingManager::seek
//! [`fire`]: BindingManager::fire
//! [`bind_host`]: BindingManager::bind_host
//! [`connect`]: BindingManager::connect
//! [`disconnect`]: BindingManager::disconnect

use std::cell::{Cell, OnceCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use serde_json::Value;
use tracing::{debug, trace, warn};
use yrf_bus::{Bus, Event, FieldPath, Listener};
use yrf_core::{Lifecycle, NodeId};

use super::error::BindingError;
use super::target::{BindingKind, BindingTarget, Requirement};
use crate::host::Host;

/// Callback handed to [`BindingManager::seek`]: receives the host, the value
/// at the binding's path and the resolved event (absent for static bindings
/// and lookup misses).
pub type PullCallback<H> = Box<dyn FnOnce(&H, Option<&Value>, Option<&Event>)>;

type SourceFn<H> = Rc<dyn Fn(&H, PullCallback<H>)>;
type TriggerFn = Box<dyn Fn(Value, Option<&Event>) -> Result<Event, BindingError>>;
type HostSlot<H> = Rc<OnceCell<Weak<H>>>;

fn upgrade<H>(slot: &OnceCell<Weak<H>>) -> Option<Rc<H>> {
    slot.get().and_then(Weak::upgrade)
}

/// Write `data` into `event` at `path`, replacing the payload for the whole
/// path and setting one field for a single-level path.
fn write_at(
    event: &mut Event,
    path: &FieldPath,
    data: Value,
    kind: BindingKind,
    name: &str,
    owner: &str,
) -> Result<(), BindingError> {
    match path {
        FieldPath::Whole => event.replace_payload(data),
        FieldPath::Field(field) => event.set_field(field.clone(), data),
        FieldPath::Nested(..) => {
            return Err(BindingError::UnsupportedPath {
                kind,
                name: name.to_owned(),
                owner: owner.to_owned(),
            });
        }
    }
    Ok(())
}

/// Registry of the bindings one host declared.
pub struct BindingManager<H: 'static> {
    owner: String,
    bus: Bus,
    host: HostSlot<H>,
    listeners: Vec<Rc<Listener>>,
    sources: AHashMap<String, SourceFn<H>>,
    triggers: AHashMap<String, TriggerFn>,
    connected: Cell<bool>,
}

impl<H: 'static> BindingManager<H> {
    /// Create a manager on the thread's default bus.
    ///
    /// `owner` is the host's type name, used only in diagnostics.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_bus(owner, Bus::global())
    }

    /// Create a manager on a specific bus.
    #[must_use]
    pub fn with_bus(owner: impl Into<String>, bus: Bus) -> Self {
        Self {
            owner: owner.into(),
            bus,
            host: Rc::new(OnceCell::new()),
            listeners: Vec::new(),
            sources: AHashMap::new(),
            triggers: AHashMap::new(),
            connected: Cell::new(false),
        }
    }

    /// Point binding callbacks at `host`.
    ///
    /// Only the first call has an effect.
    pub fn bind_host(&self, host: &Rc<H>) {
        if self.host.set(Rc::downgrade(host)).is_err() {
            warn!(owner = %self.owner, "binding manager already bound to a host");
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of listener-backed bindings.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Debug names of the listener-backed bindings, in declaration order.
    pub fn listener_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|l| l.name())
    }

    #[must_use]
    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    #[must_use]
    pub fn has_trigger(&self, name: &str) -> bool {
        self.triggers.contains_key(name)
    }

    /// Whether no binding of any variant was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.sources.is_empty() && self.triggers.is_empty()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Subscribe every listener, in declaration order.
    pub fn connect(&self) {
        if self.connected.replace(true) {
            warn!(owner = %self.owner, "connect on a connected binding manager ignored");
            return;
        }
        for listener in &self.listeners {
            self.bus.subscribe(listener);
        }
        debug!(owner = %self.owner, listeners = self.listeners.len(), "bindings connected");
    }

    /// Unsubscribe every listener, in declaration order.
    pub fn disconnect(&self) {
        if !self.connected.replace(false) {
            warn!(owner = %self.owner, "disconnect on a disconnected binding manager ignored");
            return;
        }
        for listener in &self.listeners {
            self.bus.unsubscribe(listener);
        }
        debug!(owner = %self.owner, listeners = self.listeners.len(), "bindings disconnected");
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    fn admit<T>(
        &self,
        config: Option<T>,
        kind: BindingKind,
        name: &str,
        requirement: Requirement,
    ) -> Result<Option<T>, BindingError> {
        match config {
            Some(config) => Ok(Some(config)),
            None if requirement.is_optional() => {
                trace!(owner = %self.owner, binding = name, %kind, "optional binding skipped");
                Ok(None)
            }
            None => Err(BindingError::MissingConfig {
                kind,
                name: name.to_owned(),
                owner: self.owner.clone(),
            }),
        }
    }

    fn push_listener(
        &mut self,
        target: &BindingTarget,
        name: &str,
        callback: impl Fn(&H, &mut Event) -> Result<(), BindingError> + 'static,
    ) {
        let slot = Rc::clone(&self.host);
        let owner = self.owner.clone();
        let listener = Listener::new(target.kind(), target.nice(), move |event| {
            let Some(host) = upgrade(&slot) else {
                warn!(owner = %owner, "host dropped; delivery ignored");
                return Ok(());
            };
            callback(&host, event).map_err(Into::into)
        })
        .named(name, &self.owner);
        self.listeners.push(Rc::new(listener));
    }

    /// Declare a listener that observes the value at the target path.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingConfig`] when `target` is absent and the
    /// binding is mandatory.
    pub fn attach_generic(
        &mut self,
        target: Option<BindingTarget>,
        handler: impl Fn(&H, Option<&Value>, &Event) -> Result<(), BindingError> + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        self.attach_observer(BindingKind::Generic, target, handler, name, requirement)
    }

    /// Declare a listener that consumes the value at the target path without
    /// feeding anything back. Wired like [`attach_generic`](Self::attach_generic).
    ///
    /// # Errors
    ///
    /// Same as [`attach_generic`](Self::attach_generic).
    pub fn attach_consumer(
        &mut self,
        target: Option<BindingTarget>,
        handler: impl Fn(&H, Option<&Value>, &Event) -> Result<(), BindingError> + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        self.attach_observer(BindingKind::Consumer, target, handler, name, requirement)
    }

    fn attach_observer(
        &mut self,
        kind: BindingKind,
        target: Option<BindingTarget>,
        handler: impl Fn(&H, Option<&Value>, &Event) -> Result<(), BindingError> + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(target) = self.admit(target, kind, name, requirement)? else {
            return Ok(());
        };
        let path = target.path().clone();
        self.push_listener(&target, name, move |host, event| {
            let event: &Event = event;
            handler(host, event.traverse(&path), event)
        });
        Ok(())
    }

    /// Declare a listener that writes `source(host)` into the event.
    ///
    /// The whole path replaces the payload, a single field is set in place.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingConfig`] at declaration; the listener fails
    /// with [`BindingError::UnsupportedPath`] on a two-level path.
    pub fn attach_supplier(
        &mut self,
        target: Option<BindingTarget>,
        source: impl Fn(&H) -> Value + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(target) = self.admit(target, BindingKind::Supplier, name, requirement)? else {
            return Ok(());
        };
        let path = target.path().clone();
        let (binding, owner) = (name.to_owned(), self.owner.clone());
        self.push_listener(&target, name, move |host, event| {
            write_at(
                event,
                &path,
                source(host),
                BindingKind::Supplier,
                &binding,
                &owner,
            )
        });
        Ok(())
    }

    /// Declare a listener that, while `predicate(host)` holds, halts the
    /// event (whole path) or deletes one field.
    ///
    /// # Errors
    ///
    /// Same as [`attach_supplier`](Self::attach_supplier).
    pub fn attach_remover(
        &mut self,
        target: Option<BindingTarget>,
        predicate: impl Fn(&H) -> bool + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(target) = self.admit(target, BindingKind::Remover, name, requirement)? else {
            return Ok(());
        };
        let path = target.path().clone();
        let (binding, owner) = (name.to_owned(), self.owner.clone());
        self.push_listener(&target, name, move |host, event| {
            if !predicate(host) {
                return Ok(());
            }
            match &path {
                FieldPath::Whole => {
                    event.stop(format!("Halted by '{binding}' at '{owner}'"));
                    debug!(
                        owner = %owner,
                        binding = %binding,
                        kind = event.kind().name(),
                        "event halted"
                    );
                }
                FieldPath::Field(field) => {
                    event.remove_field(field);
                }
                FieldPath::Nested(..) => {
                    return Err(BindingError::UnsupportedPath {
                        kind: BindingKind::Remover,
                        name: binding.clone(),
                        owner: owner.clone(),
                    });
                }
            }
            Ok(())
        });
        Ok(())
    }

    /// Declare a pull binding that publishes a fresh event of the target
    /// kind on every [`seek`](Self::seek) and reports the value at the
    /// target path once the publication resolves.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingConfig`].
    pub fn attach_source(
        &mut self,
        target: Option<BindingTarget>,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(target) = self.admit(target, BindingKind::Source, name, requirement)? else {
            return Ok(());
        };
        let slot = Rc::clone(&self.host);
        let bus = self.bus.clone();
        let kind = target.kind();
        let path = target.path().clone();
        let source: SourceFn<H> = Rc::new(move |_host: &H, callback: PullCallback<H>| {
            let slot = Rc::clone(&slot);
            let path = path.clone();
            bus.publish_deferred(kind.instantiate(), move |event| match upgrade(&slot) {
                Some(host) => callback(&host, event.traverse(&path), Some(&event)),
                None => trace!(kind = kind.name(), "host dropped; pull result discarded"),
            });
        });
        self.sources.insert(name.to_owned(), source);
        Ok(())
    }

    /// Declare a pull binding answered synchronously with
    /// `source(host, &value)`, without touching the bus.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingConfig`] when `value` is absent and the binding
    /// is mandatory.
    pub fn attach_static(
        &mut self,
        value: Option<Value>,
        source: impl Fn(&H, &Value) -> Value + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(value) = self.admit(value, BindingKind::Static, name, requirement)? else {
            return Ok(());
        };
        let source: SourceFn<H> = Rc::new(move |host: &H, callback: PullCallback<H>| {
            let answer = source(host, &value);
            callback(host, Some(&answer), None);
        });
        self.sources.insert(name.to_owned(), source);
        Ok(())
    }

    /// Declare a push binding: [`fire`](Self::fire) publishes a fresh event
    /// of the target kind carrying the caller's data at the target path.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingConfig`] at declaration; firing fails with
    /// [`BindingError::UnsupportedPath`] on a two-level path.
    pub fn attach_trigger(
        &mut self,
        target: Option<BindingTarget>,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(target) = self.admit(target, BindingKind::Trigger, name, requirement)? else {
            return Ok(());
        };
        let bus = self.bus.clone();
        let kind = target.kind();
        let path = target.path().clone();
        let (binding, owner) = (name.to_owned(), self.owner.clone());
        let trigger: TriggerFn = Box::new(move |data, parent| {
            let mut event = kind.instantiate();
            if let Some(parent) = parent {
                event.chain(parent);
            }
            write_at(&mut event, &path, data, BindingKind::Trigger, &binding, &owner)?;
            trace!(owner = %owner, binding = %binding, kind = kind.name(), "trigger fired");
            Ok(bus.publish(event)?)
        });
        self.triggers.insert(name.to_owned(), trigger);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Use
    // ------------------------------------------------------------------

    /// Run the pull binding declared under `name`.
    ///
    /// A lookup miss answers `callback(host, None, None)` immediately. Bus
    /// sources answer once the bus drains its pending publications.
    ///
    /// Before [`bind_host`](Self::bind_host) there is no host to answer
    /// with: the call logs a warning and `callback` is dropped unrun, lookup
    /// misses included. It is not queued for a later bind, so seeking from
    /// [`Component::create`](crate::Component::create) or
    /// [`FacadeComponent::setup`](crate::FacadeComponent::setup) never
    /// answers.
    pub fn seek(
        &self,
        name: &str,
        callback: impl FnOnce(&H, Option<&Value>, Option<&Event>) + 'static,
    ) {
        let Some(host) = upgrade(&self.host) else {
            warn!(owner = %self.owner, binding = name, "seek before a host was bound");
            return;
        };
        match self.sources.get(name) {
            Some(source) => source(&host, Box::new(callback)),
            None => {
                trace!(owner = %self.owner, binding = name, "seek miss");
                callback(&host, None, None);
            }
        }
    }

    /// Run the push binding declared under `name` and return the delivered
    /// event.
    ///
    /// # Errors
    ///
    /// [`BindingError::UndeclaredTrigger`] for an unknown name,
    /// [`BindingError::UnsupportedPath`] for a two-level path and
    /// [`BindingError::Bus`] when a listener of the fired event fails.
    pub fn fire(
        &self,
        name: &str,
        data: Value,
        parent: Option<&Event>,
    ) -> Result<Event, BindingError> {
        let trigger = self
            .triggers
            .get(name)
            .ok_or_else(|| BindingError::UndeclaredTrigger {
                name: name.to_owned(),
                owner: self.owner.clone(),
            })?;
        trigger(data, parent)
    }
}

impl<H: Host> BindingManager<H> {
    /// Declare a listener that sets or clears the `disabled` attribute of the
    /// element `source(host)` from a boolean at the target path. Other values
    /// are ignored.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingConfig`] at declaration; the listener fails
    /// with [`BindingError::Tree`] when the element cannot take attributes.
    pub fn attach_disabler(
        &mut self,
        target: Option<BindingTarget>,
        source: impl Fn(&H) -> NodeId + 'static,
        name: &str,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let Some(target) = self.admit(target, BindingKind::Disabler, name, requirement)? else {
            return Ok(());
        };
        let path = target.path().clone();
        self.push_listener(&target, name, move |host, event| {
            let Some(&Value::Bool(disabled)) = event.traverse(&path) else {
                return Ok(());
            };
            let Some(doc) = host.document() else {
                return Ok(());
            };
            let element = source(host);
            if disabled {
                doc.set_attribute(element, "disabled", "")?;
            } else {
                doc.remove_attribute(element, "disabled")?;
            }
            Ok(())
        });
        Ok(())
    }
}

impl<H: 'static> Lifecycle for BindingManager<H> {
    fn connect(&self) {
        BindingManager::connect(self);
    }

    fn disconnect(&self) {
        BindingManager::disconnect(self);
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn owner(&self) -> &str {
        &self.owner
    }
}

impl<H: 'static> Drop for BindingManager<H> {
    fn drop(&mut self) {
        if self.connected.get() {
            for listener in &self.listeners {
                self.bus.unsubscribe(listener);
            }
            debug!(owner = %self.owner, "connected binding manager dropped");
        }
    }
}

impl<H: 'static> fmt::Debug for BindingManager<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.sources.keys().collect();
        sources.sort();
        let mut triggers: Vec<_> = self.triggers.keys().collect();
        triggers.sort();
        f.debug_struct("BindingManager")
            .field("owner", &self.owner)
            .field("listeners", &self.listeners.len())
            .field("sources", &sources)
            .field("triggers", &triggers)
            .field("connected", &self.connected.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;
    use tracing_test::traced_test;
    use yrf_bus::EventKind;
    use yrf_core::Document;

    use super::*;

    const PING: EventKind = EventKind::new("ping");
    const TOGGLE: EventKind = EventKind::new("toggle");

    #[derive(Default)]
    struct Probe {
        seen: RefCell<Vec<Option<Value>>>,
        count: Cell<i64>,
    }

    fn bound(bus: &Bus) -> (Rc<Probe>, BindingManager<Probe>) {
        let probe = Rc::new(Probe::default());
        let manager = BindingManager::with_bus("Probe", bus.clone());
        manager.bind_host(&probe);
        (probe, manager)
    }

    #[test]
    fn connect_and_disconnect_track_listener_count() {
        let bus = Bus::new();
        let (_probe, mut m) = bound(&bus);
        m.attach_generic(
            Some(BindingTarget::on(PING)),
            |_, _, _| Ok(()),
            "a",
            Requirement::Mandatory,
        )
        .unwrap();
        m.attach_consumer(
            Some(BindingTarget::on(TOGGLE)),
            |_, _, _| Ok(()),
            "b",
            Requirement::Mandatory,
        )
        .unwrap();
        assert_eq!(bus.subscription_count(), 0);
        m.connect();
        assert_eq!(bus.subscription_count(), 2);
        m.disconnect();
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn redundant_connect_is_ignored() {
        let bus = Bus::new();
        let (_probe, mut m) = bound(&bus);
        m.attach_generic(
            Some(BindingTarget::on(PING)),
            |_, _, _| Ok(()),
            "a",
            Requirement::Mandatory,
        )
        .unwrap();
        m.connect();
        m.connect();
        assert_eq!(bus.subscription_count(), 1);
        m.disconnect();
        m.disconnect();
        assert_eq!(bus.subscription_count(), 0);
        assert!(!m.is_connected());
    }

    #[test]
    #[traced_test]
    fn redundant_transitions_are_logged() {
        let (_probe, m) = bound(&Bus::new());
        m.connect();
        m.connect();
        assert!(logs_contain("connect on a connected binding manager ignored"));
        m.disconnect();
        m.disconnect();
        assert!(logs_contain("disconnect on a disconnected binding manager ignored"));
    }

    #[test]
    fn generic_receives_path_value() {
        let bus = Bus::new();
        let (probe, mut m) = bound(&bus);
        m.attach_generic(
            Some(BindingTarget::on(PING).field("x")),
            |host: &Probe, value, _| {
                host.seen.borrow_mut().push(value.cloned());
                Ok(())
            },
            "x",
            Requirement::Mandatory,
        )
        .unwrap();
        m.connect();
        bus.publish(yrf_bus::Event::with_payload(PING, json!({"x": 7}))).unwrap();
        bus.publish(PING.instantiate()).unwrap();
        assert_eq!(*probe.seen.borrow(), vec![Some(json!(7)), None]);
    }

    #[test]
    fn listener_names_carry_owner() {
        let bus = Bus::new();
        let (_probe, mut m) = bound(&bus);
        m.attach_supplier(
            Some(BindingTarget::on(PING)),
            |_| json!(1),
            "value",
            Requirement::Mandatory,
        )
        .unwrap();
        assert_eq!(m.listener_names().collect::<Vec<_>>(), vec!["value@Probe"]);
    }

    #[test]
    fn static_source_answers_synchronously() {
        let bus = Bus::new();
        let (probe, mut m) = bound(&bus);
        m.attach_static(
            Some(json!(3)),
            |host: &Probe, v| json!(v.as_i64().unwrap_or(0) + host.count.get()),
            "n",
            Requirement::Mandatory,
        )
        .unwrap();
        probe.count.set(4);
        let answer = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&answer);
        m.seek("n", move |_, value, event| {
            assert!(event.is_none());
            *sink.borrow_mut() = value.cloned();
        });
        assert_eq!(*answer.borrow(), Some(json!(7)));
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn static_without_value_is_mandatory() {
        let (_probe, mut m) = bound(&Bus::new());
        let err = m
            .attach_static(None, |_, v| v.clone(), "n", Requirement::Mandatory)
            .unwrap_err();
        assert!(matches!(err, BindingError::MissingConfig { kind: BindingKind::Static, .. }));
        m.attach_static(None, |_, v| v.clone(), "n", Requirement::Optional)
            .unwrap();
        assert!(!m.has_source("n"));
    }

    #[test]
    fn source_resolves_on_drain() {
        let bus = Bus::new();
        let (_probe, mut m) = bound(&bus);
        m.attach_source(Some(BindingTarget::on(PING).field("x")), "x", Requirement::Mandatory)
            .unwrap();
        let answer = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&answer);
        m.seek("x", move |_, value, event| {
            assert!(event.is_some());
            *sink.borrow_mut() = Some(value.cloned());
        });
        assert!(answer.borrow().is_none());
        assert_eq!(bus.pending(), 1);
        bus.drain_pending().unwrap();
        assert_eq!(*answer.borrow(), Some(None));
    }

    #[test]
    #[traced_test]
    fn seek_before_bind_drops_the_callback() {
        let m: BindingManager<Probe> = BindingManager::with_bus("Probe", Bus::new());
        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);
        m.seek("missing", move |_, _, _| flag.set(true));
        assert!(logs_contain("seek before a host was bound"));
        assert_eq!(Rc::strong_count(&called), 1);

        let probe = Rc::new(Probe::default());
        m.bind_host(&probe);
        assert!(!called.get());

        let flag = Rc::clone(&called);
        m.seek("missing", move |_, value, event| {
            assert!(value.is_none() && event.is_none());
            flag.set(true);
        });
        assert!(called.get());
    }

    #[test]
    fn trigger_chains_parent() {
        let bus = Bus::new();
        let (_probe, mut m) = bound(&bus);
        m.attach_trigger(Some(BindingTarget::on(PING).field("x")), "go", Requirement::Mandatory)
            .unwrap();
        let parent = TOGGLE.instantiate();
        let fired = m.fire("go", json!(1), Some(&parent)).unwrap();
        assert_eq!(fired.get("x"), Some(&json!(1)));
        assert_eq!(fired.parent().map(|p| p.id), Some(parent.id()));
    }

    #[test]
    fn drop_while_connected_unsubscribes() {
        let bus = Bus::new();
        let (_probe, mut m) = bound(&bus);
        m.attach_generic(
            Some(BindingTarget::on(PING)),
            |_, _, _| Ok(()),
            "a",
            Requirement::Mandatory,
        )
        .unwrap();
        m.connect();
        drop(m);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn dropped_host_ignores_delivery() {
        let bus = Bus::new();
        let (probe, mut m) = bound(&bus);
        m.attach_supplier(
            Some(BindingTarget::on(PING).field("x")),
            |_| json!(1),
            "x",
            Requirement::Mandatory,
        )
        .unwrap();
        m.connect();
        drop(probe);
        let ev = bus.publish(PING.instantiate()).unwrap();
        assert_eq!(ev.get("x"), None);
    }

    struct Panel {
        doc: Document,
        node: NodeId,
    }

    impl Host for Panel {
        fn document(&self) -> Option<Document> {
            Some(self.doc.clone())
        }

        fn node(&self) -> NodeId {
            self.node
        }
    }

    #[test]
    fn disabler_toggles_attribute() {
        let bus = Bus::new();
        let doc = Document::new();
        let node = doc.create_element("button");
        let panel = Rc::new(Panel { doc: doc.clone(), node });
        let mut m = BindingManager::with_bus("Panel", bus.clone());
        m.bind_host(&panel);
        m.attach_disabler(
            Some(BindingTarget::on(TOGGLE)),
            |p: &Panel| p.node,
            "lock",
            Requirement::Mandatory,
        )
        .unwrap();
        m.connect();

        bus.publish(yrf_bus::Event::with_payload(TOGGLE, json!(true))).unwrap();
        assert!(doc.has_attribute(node, "disabled"));
        bus.publish(yrf_bus::Event::with_payload(TOGGLE, json!("yes"))).unwrap();
        assert!(doc.has_attribute(node, "disabled"));
        bus.publish(yrf_bus::Event::with_payload(TOGGLE, json!(false))).unwrap();
        assert!(!doc.has_attribute(node, "disabled"));
    }

    const ALL_KINDS: [BindingKind; 8] = [
        BindingKind::Generic,
        BindingKind::Consumer,
        BindingKind::Supplier,
        BindingKind::Remover,
        BindingKind::Disabler,
        BindingKind::Source,
        BindingKind::Static,
        BindingKind::Trigger,
    ];

    /// Declare one binding of `kind` named `value` without configuration.
    fn declare_unconfigured(
        m: &mut BindingManager<Panel>,
        kind: BindingKind,
        requirement: Requirement,
    ) -> Result<(), BindingError> {
        let name = "value";
        match kind {
            BindingKind::Generic => m.attach_generic(None, |_, _, _| Ok(()), name, requirement),
            BindingKind::Consumer => m.attach_consumer(None, |_, _, _| Ok(()), name, requirement),
            BindingKind::Supplier => m.attach_supplier(None, |_| Value::Null, name, requirement),
            BindingKind::Remover => m.attach_remover(None, |_| true, name, requirement),
            BindingKind::Disabler => m.attach_disabler(None, |p: &Panel| p.node, name, requirement),
            BindingKind::Source => m.attach_source(None, name, requirement),
            BindingKind::Static => m.attach_static(None, |_, v| v.clone(), name, requirement),
            BindingKind::Trigger => m.attach_trigger(None, name, requirement),
        }
    }

    #[test]
    fn unconfigured_bindings_follow_their_requirement() {
        let doc = Document::new();
        let panel = Rc::new(Panel {
            node: doc.create_element("div"),
            doc,
        });

        for kind in ALL_KINDS {
            let mut m = BindingManager::with_bus("Panel", Bus::new());
            m.bind_host(&panel);

            let err = declare_unconfigured(&mut m, kind, Requirement::Mandatory).unwrap_err();
            assert!(
                matches!(
                    &err,
                    BindingError::MissingConfig { kind: k, name, owner }
                        if *k == kind && name == "value" && owner == "Panel"
                ),
                "{kind}: {err}"
            );
            assert_eq!(
                err.to_string(),
                format!("Missing config for mandatory {} 'value' at 'Panel'", kind.label())
            );
            assert!(m.is_empty(), "{kind} kept a binding after failing");

            declare_unconfigured(&mut m, kind, Requirement::Optional).unwrap();
            assert!(m.is_empty(), "{kind} kept a binding without configuration");
            assert_eq!(m.listener_count(), 0);
            assert!(!m.has_source("value"));
            assert!(!m.has_trigger("value"));
        }
    }
}
