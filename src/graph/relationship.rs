//! Relationship implementation for the property graph
//!
//! A relationship is a directed, typed edge between two nodes. It is stored
//! once and referenced by id from the adjacency lists of both endpoints.

use super::property::{PropertyMap, PropertyValue};
use super::types::{Direction, NodeId, RelationshipId, RelationshipType};
use serde::{Deserialize, Serialize};

/// Structural state of a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Unique identifier for this relationship
    pub id: RelationshipId,

    /// Source node (relationship goes FROM this node)
    pub source: NodeId,

    /// Target node (relationship goes TO this node)
    pub target: NodeId,

    /// Type tag (e.g., "KNOWS")
    pub rel_type: RelationshipType,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl RelationshipRecord {
    pub fn new(
        id: RelationshipId,
        source: NodeId,
        target: NodeId,
        rel_type: impl Into<RelationshipType>,
    ) -> Self {
        RelationshipRecord {
            id,
            source,
            target,
            rel_type: rel_type.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Check if this relationship goes FROM a specific node
    pub fn starts_from(&self, node: NodeId) -> bool {
        self.source == node
    }

    /// Check if this relationship goes TO a specific node
    pub fn ends_at(&self, node: NodeId) -> bool {
        self.target == node
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint at all
    pub fn other_node(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Whether this relationship is attached to `node` in the given direction
    pub fn matches_direction(&self, node: NodeId, direction: Direction) -> bool {
        match direction {
            Direction::Outgoing => self.starts_from(node),
            Direction::Incoming => self.ends_at(node),
            Direction::Both => self.starts_from(node) || self.ends_at(node),
        }
    }
}

/// A committed (or staged) relationship with its properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub record: RelationshipRecord,
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(record: RelationshipRecord, properties: PropertyMap) -> Self {
        Relationship { record, properties }
    }

    pub fn id(&self) -> RelationshipId {
        self.record.id
    }

    pub fn source(&self) -> NodeId {
        self.record.source
    }

    pub fn target(&self) -> NodeId {
        self.record.target
    }

    pub fn rel_type(&self) -> &RelationshipType {
        &self.record.rel_type
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.record.id == other.record.id
    }
}

impl Eq for Relationship {}

impl std::hash::Hash for Relationship {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.record.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_direction() {
        let rel = RelationshipRecord::new(RelationshipId::new(2), NodeId::new(10), NodeId::new(20), "FOLLOWS");

        assert!(rel.starts_from(NodeId::new(10)));
        assert!(rel.ends_at(NodeId::new(20)));
        assert!(!rel.starts_from(NodeId::new(20)));
        assert!(rel.matches_direction(NodeId::new(10), Direction::Outgoing));
        assert!(!rel.matches_direction(NodeId::new(10), Direction::Incoming));
        assert!(rel.matches_direction(NodeId::new(20), Direction::Both));
    }

    #[test]
    fn test_other_node() {
        let rel = RelationshipRecord::new(RelationshipId::new(1), NodeId::new(1), NodeId::new(2), "KNOWS");
        assert_eq!(rel.other_node(NodeId::new(1)), Some(NodeId::new(2)));
        assert_eq!(rel.other_node(NodeId::new(2)), Some(NodeId::new(1)));
        assert_eq!(rel.other_node(NodeId::new(3)), None);
    }

    #[test]
    fn test_relationship_properties() {
        let mut props = PropertyMap::new();
        props.insert("message".to_string(), "brave Neo4j ".into());
        let rel = Relationship::new(
            RelationshipRecord::new(RelationshipId::new(3), NodeId::new(1), NodeId::new(2), "KNOWS"),
            props,
        );

        assert_eq!(rel.rel_type().as_str(), "KNOWS");
        assert_eq!(rel.get_property("message").unwrap().as_string(), Some("brave Neo4j "));
        assert_eq!(rel.property_count(), 1);
    }
}
