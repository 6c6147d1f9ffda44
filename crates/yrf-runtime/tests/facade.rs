//! Adapted hosts driven by the tree bridge.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use yrf_bus::{Bus, Event, EventKind};
use yrf_core::{CallbackError, Document, ElementCallbacks, NodeId};
use yrf_runtime::{
    BindingError, BindingTarget, Child, Constructor, EventLoop, Facade, FacadeComponent, Factory,
    Props, Requirement, TreeBridge,
};

const ZOOM: EventKind = EventKind::new("zoom");

thread_local! {
    static ZOOMS: Cell<u32> = const { Cell::new(0) };
}

/// An external map widget that reacts to zoom events.
struct MapView;

impl FacadeComponent for MapView {
    const TAG: &'static str = "map-view";

    fn defaults() -> Props {
        Props::new().with("role", "img")
    }

    fn setup(facade: &mut Facade) -> Result<(), BindingError> {
        let target = facade.props().binding("yr:zoom");
        facade.events().attach_consumer(
            target,
            |_, _, _| {
                ZOOMS.with(|z| z.set(z.get() + 1));
                Ok(())
            },
            "zoom",
            Requirement::Optional,
        )
    }
}

fn factory() -> Factory {
    Factory::new(&Document::new()).with_bus(Bus::new())
}

fn make_map(f: &Factory, props: &Props) -> NodeId {
    match f.make(Constructor::facade::<MapView>(), props, Child::Empty).unwrap() {
        Child::Node(node) => node,
        other => panic!("expected a node, got {other:?}"),
    }
}

#[test]
fn bridge_connects_and_disconnects_adapted_nodes() {
    let f = factory();
    let doc = f.document();
    let looper = EventLoop::new(&f);
    let node = make_map(&f, &Props::new().with("yr:zoom", BindingTarget::on(ZOOM)));
    assert_eq!(doc.attribute(node, "role").as_deref(), Some("img"));
    assert!(doc.lifecycle(node).is_some());

    doc.append_child(doc.root(), node).unwrap();
    assert_eq!(f.bus().subscription_count(), 0);
    looper.run_until_idle().unwrap();
    assert_eq!(f.bus().subscription_count(), 1);

    let before = ZOOMS.with(Cell::get);
    f.bus().publish(Event::with_payload(ZOOM, json!(2))).unwrap();
    assert_eq!(ZOOMS.with(Cell::get), before + 1);

    doc.detach(node).unwrap();
    looper.run_until_idle().unwrap();
    assert_eq!(f.bus().subscription_count(), 0);
}

#[test]
fn unbound_facade_carries_no_lifecycle() {
    let f = factory();
    let doc = f.document();
    let node = make_map(&f, &Props::new());
    assert!(doc.lifecycle(node).is_none());

    let bridge = TreeBridge::global();
    let (connects, disconnects) = (bridge.connects(), bridge.disconnects());
    doc.append_child(doc.root(), node).unwrap();
    doc.deliver_mutations();
    doc.detach(node).unwrap();
    doc.deliver_mutations();
    assert_eq!(f.bus().subscription_count(), 0);
    assert_eq!(bridge.connects(), connects);
    assert_eq!(bridge.disconnects(), disconnects);
}

#[test]
fn batched_moves_connect_once() {
    let f = factory();
    let doc = f.document();
    let node = make_map(&f, &Props::new().with("yr:zoom", BindingTarget::on(ZOOM)));
    let a = doc.create_element("div");
    let b = doc.create_element("div");
    doc.append_child(doc.root(), a).unwrap();
    doc.append_child(doc.root(), b).unwrap();
    for _ in 0..3 {
        doc.append_child(a, node).unwrap();
        doc.append_child(b, node).unwrap();
    }
    assert!(doc.pending_records() > 3);
    EventLoop::new(&f).run_until_idle().unwrap();
    assert_eq!(f.bus().subscription_count(), 1);
}

#[derive(Default)]
struct Native {
    connected: Cell<u32>,
}

impl ElementCallbacks for Native {
    fn connected(&self, _: &Document, _: NodeId) -> Result<(), CallbackError> {
        self.connected.set(self.connected.get() + 1);
        Ok(())
    }

    fn disconnected(&self, _: &Document, _: NodeId) -> Result<(), CallbackError> {
        Ok(())
    }
}

#[test]
fn hooked_elements_bypass_the_bridge() {
    let f = factory();
    let doc = f.document().clone();
    let native = Rc::new(Native::default());
    let hook = Rc::clone(&native);
    doc.define(MapView::TAG, move || Rc::clone(&hook) as Rc<dyn ElementCallbacks>);

    let node = make_map(&f, &Props::new().with("yr:zoom", BindingTarget::on(ZOOM)));
    assert!(doc.lifecycle(node).is_none());

    doc.append_child(doc.root(), node).unwrap();
    assert_eq!(f.bus().subscription_count(), 1);
    assert_eq!(native.connected.get(), 1);

    EventLoop::new(&f).run_until_idle().unwrap();
    assert_eq!(f.bus().subscription_count(), 1);

    doc.detach(node).unwrap();
    assert_eq!(f.bus().subscription_count(), 0);
}

#[test]
fn facade_children_are_appended_immediately() {
    let f = factory();
    let doc = f.document();
    let Child::Node(node) = f
        .make(Constructor::facade::<MapView>(), &Props::new(), vec!["legend"])
        .unwrap()
    else {
        panic!("expected a node");
    };
    assert_eq!(doc.text_content(node).unwrap(), "legend");
}
