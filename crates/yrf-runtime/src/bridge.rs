#![forbid(unsafe_code)]

//! Tree-membership bridge.
//!
//! Elements adapted through a [`Facade`](crate::Facade) have no native
//! callbacks; their binding managers are reachable only through the node's
//! lifecycle back-reference. The bridge is a [`MutationObserver`] that
//! forwards tree membership to those back-references.
//!
//! One bridge exists per thread. It is created on first use and lives until
//! the thread exits; [`TreeBridge::watch`] registers it with a document.
//!
//! # Invariants
//!
//! 1. Within one batch each node is considered once, against its final
//!    membership. A node inserted and removed in the same batch is left
//!    alone.
//! 2. `connect` is forwarded only to disconnected managers and `disconnect`
//!    only to connected ones, so the bridge never doubles a transition.
//! 3. Nodes without a back-reference are skipped.

use std::cell::Cell;
use std::rc::Rc;

use ahash::AHashSet;
use tracing::{debug_span, trace};
use yrf_core::{Document, MutationObserver, MutationRecord};

thread_local! {
    static BRIDGE: Rc<TreeBridge> = Rc::new(TreeBridge::default());
}

/// Forwards tree membership to lifecycle back-references.
#[derive(Debug, Default)]
pub struct TreeBridge {
    connects: Cell<u64>,
    disconnects: Cell<u64>,
}

impl TreeBridge {
    /// The thread's bridge.
    #[must_use]
    pub fn global() -> Rc<Self> {
        BRIDGE.with(Rc::clone)
    }

    /// Register the thread's bridge with `doc`. Returns `false` if it was
    /// already registered.
    pub fn watch(doc: &Document) -> bool {
        doc.observe(Self::global())
    }

    /// Connects forwarded so far.
    #[must_use]
    pub fn connects(&self) -> u64 {
        self.connects.get()
    }

    /// Disconnects forwarded so far.
    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.disconnects.get()
    }
}

impl MutationObserver for TreeBridge {
    fn observe(&self, doc: &Document, records: &[MutationRecord]) {
        let _span = debug_span!("tree_bridge", records = records.len()).entered();
        let mut seen = AHashSet::new();
        for node in records.iter().flat_map(|r| r.touched.iter().copied()) {
            if !seen.insert(node) {
                continue;
            }
            let Some(lifecycle) = doc.lifecycle(node) else {
                continue;
            };
            match (doc.is_connected(node), lifecycle.is_connected()) {
                (true, false) => {
                    lifecycle.connect();
                    self.connects.set(self.connects.get() + 1);
                    trace!(%node, owner = lifecycle.owner(), "bridge connect");
                }
                (false, true) => {
                    lifecycle.disconnect();
                    self.disconnects.set(self.disconnects.get() + 1);
                    trace!(%node, owner = lifecycle.owner(), "bridge disconnect");
                }
                _ => {}
            }
        }
    }
}
