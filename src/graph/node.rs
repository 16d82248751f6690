//! Node implementation for the property graph
//!
//! A node is split in two while it is being written: the structural
//! [`NodeRecord`] (labels and adjacency) and its property map, which lives in
//! a [`PropertyStore`](super::PropertyStore). Committed versions join the two
//! back into a [`Node`].

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Structural state of a node: labels and adjacency lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Labels carried by the node
    pub labels: BTreeSet<Label>,

    /// Relationships starting at this node
    pub outgoing: Vec<RelationshipId>,

    /// Relationships ending at this node
    pub incoming: Vec<RelationshipId>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl NodeRecord {
    pub fn new(id: NodeId, labels: impl IntoIterator<Item = Label>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        NodeRecord {
            id,
            labels: labels.into_iter().collect(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a label, returning false if it was already present
    pub fn add_label(&mut self, label: Label) -> bool {
        let added = self.labels.insert(label);
        if added {
            self.touch();
        }
        added
    }

    /// Remove a label, returning false if it was not present
    pub fn remove_label(&mut self, label: &Label) -> bool {
        let removed = self.labels.remove(label);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Number of incident relationships (a self-loop counts twice)
    pub fn degree(&self) -> usize {
        self.outgoing.len() + self.incoming.len()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

/// A committed (or staged) node with its properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub record: NodeRecord,
    pub properties: PropertyMap,
}

impl Node {
    pub fn new(record: NodeRecord, properties: PropertyMap) -> Self {
        Node { record, properties }
    }

    pub fn id(&self) -> NodeId {
        self.record.id
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.record.labels.iter()
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.record.has_label(label)
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn label_count(&self) -> usize {
        self.record.labels.len()
    }

    pub fn outgoing(&self) -> &[RelationshipId] {
        &self.record.outgoing
    }

    pub fn incoming(&self) -> &[RelationshipId] {
        &self.record.incoming
    }

    pub fn degree(&self) -> usize {
        self.record.degree()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.record.id == other.record.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.record.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_labels() {
        let mut record = NodeRecord::new(NodeId::new(1), vec![Label::new("User")]);
        assert!(record.has_label(&Label::new("User")));

        assert!(record.add_label(Label::new("Admin")));
        assert!(!record.add_label(Label::new("Admin")));
        assert_eq!(record.labels.len(), 2);

        assert!(record.remove_label(&Label::new("User")));
        assert!(!record.remove_label(&Label::new("User")));
        assert_eq!(record.labels.len(), 1);
    }

    #[test]
    fn test_degree_counts_both_directions() {
        let mut record = NodeRecord::new(NodeId::new(1), Vec::new());
        record.outgoing.push(RelationshipId::new(1));
        record.incoming.push(RelationshipId::new(2));
        assert_eq!(record.degree(), 2);
    }

    #[test]
    fn test_node_view() {
        let mut props = PropertyMap::new();
        props.insert("username".to_string(), "user1@neo4j.org".into());
        let node = Node::new(NodeRecord::new(NodeId::new(3), vec![Label::new("User")]), props);

        assert_eq!(node.id(), NodeId::new(3));
        assert_eq!(node.label_count(), 1);
        assert!(node.has_property("username"));
        assert_eq!(node.get_property("username").unwrap().as_string(), Some("user1@neo4j.org"));
    }

    #[test]
    fn test_node_equality() {
        let a = Node::new(NodeRecord::new(NodeId::new(7), Vec::new()), PropertyMap::new());
        let b = Node::new(NodeRecord::new(NodeId::new(7), vec![Label::new("X")]), PropertyMap::new());
        let c = Node::new(NodeRecord::new(NodeId::new(8), Vec::new()), PropertyMap::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
