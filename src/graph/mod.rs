//! Core graph data model and committed storage
//!
//! This module implements the property graph data model with:
//! - Nodes with multiple labels and typed properties
//! - Directed, typed relationships with properties
//! - Multiple relationships between the same pair of nodes
//! - Multi-version committed storage for snapshot reads

pub mod event;
pub mod node;
pub mod property;
pub mod property_store;
pub mod relationship;
pub mod store;
pub mod types;
pub mod version;

// Re-export main types
pub use event::{EventBus, LifecycleEvent};
pub use node::{Node, NodeRecord};
pub use property::{PropertyArray, PropertyMap, PropertyValue};
pub use property_store::PropertyStore;
pub use relationship::{Relationship, RelationshipRecord};
pub use store::{GraphStore, VacuumStats};
pub use types::{Direction, EntityId, EntityKind, Label, NodeId, RelationshipId, RelationshipType};
pub use version::{Version, VersionChain};
