//! Staged, uncommitted writes of one transaction
//!
//! An entity that the transaction has touched is *dirty*: its full structural
//! record (or `None` once deleted) lives in `nodes` / `relationships`, and its
//! full property map in the matching [`PropertyStore`]. Dirty entities shadow
//! the committed snapshot completely, so commit can publish them as whole new
//! versions.

use crate::graph::{
    EntityId, Node, NodeId, NodeRecord, PropertyStore, Relationship, RelationshipId, RelationshipRecord,
};
use crate::index::LegacyOp;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct PendingWrites {
    pub nodes: IndexMap<NodeId, Option<NodeRecord>>,
    pub relationships: IndexMap<RelationshipId, Option<RelationshipRecord>>,
    pub node_props: PropertyStore<NodeId>,
    pub rel_props: PropertyStore<RelationshipId>,

    /// Entities that did not exist before this transaction
    pub created_nodes: FxHashSet<NodeId>,
    pub created_rels: FxHashSet<RelationshipId>,

    pub node_index_ops: Vec<LegacyOp<NodeId>>,
    pub rel_index_ops: Vec<LegacyOp<RelationshipId>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.relationships.is_empty()
            && self.node_index_ops.is_empty()
            && self.rel_index_ops.is_empty()
    }

    /// Staged state of a dirty node: `Some(None)` if deleted here
    pub fn node(&self, id: NodeId) -> Option<Option<Node>> {
        self.nodes.get(&id).map(|record| {
            record.as_ref().map(|record| {
                let properties = self.node_props.properties(id).cloned().unwrap_or_default();
                Node::new(record.clone(), properties)
            })
        })
    }

    /// Staged state of a dirty relationship: `Some(None)` if deleted here
    pub fn relationship(&self, id: RelationshipId) -> Option<Option<Relationship>> {
        self.relationships.get(&id).map(|record| {
            record.as_ref().map(|record| {
                let properties = self.rel_props.properties(id).cloned().unwrap_or_default();
                Relationship::new(record.clone(), properties)
            })
        })
    }

    /// Entities whose committed version must not have moved since the
    /// transaction started
    pub fn write_set(&self) -> impl Iterator<Item = EntityId> + '_ {
        let nodes = self
            .nodes
            .keys()
            .filter(|id| !self.created_nodes.contains(*id))
            .map(|id| EntityId::Node(*id));
        let rels = self
            .relationships
            .keys()
            .filter(|id| !self.created_rels.contains(*id))
            .map(|id| EntityId::Relationship(*id));
        nodes.chain(rels)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
