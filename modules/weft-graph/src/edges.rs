use std::collections::HashMap;

use uuid::Uuid;
use weft_common::Edge;

/// True iff an edge with the exact ordered (source, target) pair already
/// exists in the snapshot, excluding the edge under edit (`editing`) when
/// this is an update rather than a creation.
///
/// Advisory only: the snapshot may be stale, so the authoritative store
/// re-checks at write time ([`crate::GraphWriter::create_edge`]).
pub fn would_duplicate(
    source: Uuid,
    target: Uuid,
    existing: &[Edge],
    editing: Option<Uuid>,
) -> bool {
    existing.iter().any(|e| {
        e.source == source && e.target == target && Some(e.id) != editing
    })
}

/// Whether swapping source and target is allowed: the inverted ordered pair
/// must not already exist. The UI disables direction toggling while this
/// returns false.
pub fn can_invert(source: Uuid, target: Uuid, existing: &[Edge], editing: Option<Uuid>) -> bool {
    !would_duplicate(target, source, existing, editing)
}

/// Snapshot index over a space's edges: node id → ids of every edge touching
/// that node. Maintained alongside the edge list so "all edges touching X"
/// is a lookup, not a scan.
#[derive(Debug, Default)]
pub struct EdgeIndex {
    edges: HashMap<Uuid, Edge>,
    by_node: HashMap<Uuid, Vec<Uuid>>,
}

impl EdgeIndex {
    pub fn from_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.insert(edge);
        }
        index
    }

    pub fn insert(&mut self, edge: Edge) {
        if let Some(prev) = self.edges.remove(&edge.id) {
            self.unlink(&prev);
        }
        for node in [edge.source, edge.target] {
            let ids = self.by_node.entry(node).or_default();
            if !ids.contains(&edge.id) {
                ids.push(edge.id);
            }
        }
        self.edges.insert(edge.id, edge);
    }

    pub fn remove(&mut self, edge_id: Uuid) -> Option<Edge> {
        let edge = self.edges.remove(&edge_id)?;
        self.unlink(&edge);
        Some(edge)
    }

    fn unlink(&mut self, edge: &Edge) {
        for node in [edge.source, edge.target] {
            if let Some(ids) = self.by_node.get_mut(&node) {
                ids.retain(|id| *id != edge.id);
                if ids.is_empty() {
                    self.by_node.remove(&node);
                }
            }
        }
    }

    pub fn get(&self, edge_id: Uuid) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Every edge where the node appears as source or target.
    pub fn touching(&self, node_id: Uuid) -> Vec<&Edge> {
        self.by_node
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn all(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
