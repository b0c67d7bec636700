//! Run-scoped entity deduplication and dangling-edge accounting.
//!
//! Multiple adapters legitimately produce overlapping entities (UniProt and
//! STRING both emit protein nodes). Each `(id, label)` node pair and each
//! edge key is forwarded at most once per run. Memory is proportional to
//! distinct entity count, not raw record count; full runs reach tens of
//! millions of edges so keys are FxHash sets, the same trusted-input
//! hashing used throughout.

use crate::models::{Edge, Node};
use rustc_hash::FxHashSet;

#[derive(Default)]
pub struct Deduplicator {
    node_keys: FxHashSet<String>,
    node_ids: FxHashSet<String>,
    edge_keys: FxHashSet<String>,
    /// Edge endpoints not yet seen as emitted nodes. Entries are removed
    /// when the node arrives later in the run; whatever remains at the end
    /// is the dangling-reference count.
    pending_refs: FxHashSet<String>,
    duplicate_nodes: u64,
    duplicate_edges: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the node is new and should be written.
    /// Duplicates are discarded silently but counted.
    pub fn accept_node(&mut self, node: &Node) -> bool {
        if self.node_keys.insert(node.dedup_key()) {
            self.node_ids.insert(node.id.clone());
            self.pending_refs.remove(&node.id);
            true
        } else {
            self.duplicate_nodes += 1;
            false
        }
    }

    /// Returns true when the edge is new and should be written. Endpoints
    /// that no emitted node covers yet are tracked as pending references.
    pub fn accept_edge(&mut self, edge: &Edge) -> bool {
        if self.edge_keys.insert(edge.dedup_key()) {
            if !self.node_ids.contains(&edge.source) {
                self.pending_refs.insert(edge.source.clone());
            }
            if !self.node_ids.contains(&edge.target) {
                self.pending_refs.insert(edge.target.clone());
            }
            true
        } else {
            self.duplicate_edges += 1;
            false
        }
    }

    pub fn duplicate_nodes(&self) -> u64 {
        self.duplicate_nodes
    }

    pub fn duplicate_edges(&self) -> u64 {
        self.duplicate_edges
    }

    /// Distinct endpoint ids referenced by edges but never emitted as
    /// nodes. Meaningful once all adapters have run.
    pub fn dangling_refs(&self) -> u64 {
        self.pending_refs.len() as u64
    }

    pub fn distinct_nodes(&self) -> usize {
        self.node_keys.len()
    }

    pub fn distinct_edges(&self) -> usize {
        self.edge_keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, Node};

    #[test]
    fn duplicate_node_rejected_and_counted() {
        let mut dedup = Deduplicator::new();
        let node = Node::new("uniprot:P04637", "protein");
        assert!(dedup.accept_node(&node));
        assert!(!dedup.accept_node(&node.clone()));
        assert_eq!(dedup.duplicate_nodes(), 1);
        assert_eq!(dedup.distinct_nodes(), 1);
    }

    #[test]
    fn same_id_different_label_is_distinct() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.accept_node(&Node::new("x:1", "protein")));
        assert!(dedup.accept_node(&Node::new("x:1", "gene")));
        assert_eq!(dedup.duplicate_nodes(), 0);
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut dedup = Deduplicator::new();
        let edge = Edge::new("a", "b", "interacts");
        assert!(dedup.accept_edge(&edge));
        assert!(!dedup.accept_edge(&edge.clone()));
        assert_eq!(dedup.duplicate_edges(), 1);
    }

    #[test]
    fn dangling_resolved_by_later_node() {
        let mut dedup = Deduplicator::new();
        dedup.accept_edge(&Edge::new("a", "b", "interacts"));
        assert_eq!(dedup.dangling_refs(), 2);

        // A later adapter emits one endpoint; cross-adapter linkage.
        dedup.accept_node(&Node::new("a", "protein"));
        assert_eq!(dedup.dangling_refs(), 1);

        dedup.accept_node(&Node::new("b", "protein"));
        assert_eq!(dedup.dangling_refs(), 0);
    }

    #[test]
    fn edge_after_node_is_not_dangling() {
        let mut dedup = Deduplicator::new();
        dedup.accept_node(&Node::new("a", "protein"));
        dedup.accept_node(&Node::new("b", "protein"));
        dedup.accept_edge(&Edge::new("a", "b", "interacts"));
        assert_eq!(dedup.dangling_refs(), 0);
    }

    #[test]
    fn duplicate_edges_do_not_double_count_refs() {
        let mut dedup = Deduplicator::new();
        dedup.accept_edge(&Edge::new("a", "b", "interacts"));
        dedup.accept_edge(&Edge::new("a", "b", "interacts"));
        assert_eq!(dedup.dangling_refs(), 2);
    }
}
