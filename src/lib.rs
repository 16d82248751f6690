//! Embergraph
//!
//! An embedded, transactional property-graph engine. Nodes carry labels and
//! properties, relationships are typed and directed, and every read or write
//! happens inside a snapshot-isolated [`Transaction`].
//!
//! # Architecture
//!
//! - [`graph`]: data model and the multi-versioned committed store
//! - [`index`]: automatic schema indexes and named legacy indexes
//! - [`transaction`]: staged writes, optimistic conflict detection, commit
//! - [`persistence`]: compressed whole-database snapshots
//!
//! ## Example Usage
//!
//! ```rust
//! use embergraph::{Direction, GraphDatabase};
//!
//! let db = GraphDatabase::in_memory();
//! db.schema().create_index("User", "username").unwrap();
//!
//! let mut tx = db.begin_tx().unwrap();
//! let alice = tx.create_node(["User"]).unwrap();
//! tx.set_node_property(alice, "username", "alice").unwrap();
//! let bob = tx.create_node(["User"]).unwrap();
//! tx.create_relationship(alice, bob, "KNOWS").unwrap();
//! tx.commit().unwrap();
//!
//! let tx = db.begin_tx().unwrap();
//! let hits = tx.find_nodes("User", "username", "alice").unwrap();
//! assert_eq!(hits.single().unwrap(), Some(alice));
//! assert_eq!(tx.relationships(alice, Direction::Outgoing, None).unwrap().len(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod error;
pub mod graph;
pub mod index;
pub mod persistence;
pub mod schema;
pub mod transaction;

// Re-export main types for convenience
pub use config::{ConfigError, EngineConfig};
pub use database::{DatabaseStats, GraphDatabase, VacuumReport};
pub use error::{ConstraintViolation, ErrorKind, GraphError, GraphResult};
pub use graph::{
    Direction, EntityId, EntityKind, Label, LifecycleEvent, Node, NodeId, PropertyMap, PropertyValue,
    Relationship, RelationshipId, RelationshipType,
};
pub use index::{IndexDefinition, IndexHits, IndexState};
pub use persistence::{PersistenceError, PersistenceResult};
pub use schema::Schema;
pub use transaction::{LegacyIndexHandle, Transaction, TxId, TxState};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
