#![forbid(unsafe_code)]

//! Mutation records and observers.
//!
//! Structural changes under a connected parent are recorded and queued on
//! the document. [`Document::deliver_mutations`](crate::Document::deliver_mutations)
//! hands the queued batch to every registered [`MutationObserver`]; changes
//! inside detached subtrees are not recorded.

use crate::document::Document;
use crate::node::NodeId;

/// One structural change of the live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Parent whose child list changed.
    pub target: NodeId,
    /// Roots of inserted subtrees.
    pub added: Vec<NodeId>,
    /// Roots of removed subtrees.
    pub removed: Vec<NodeId>,
    /// Every node of the added and removed subtrees, in tree order, captured
    /// when the change happened.
    pub touched: Vec<NodeId>,
}

/// Receives batches of mutation records.
pub trait MutationObserver {
    /// Handle one batch. Records are in the order the changes happened.
    fn observe(&self, doc: &Document, records: &[MutationRecord]);
}
