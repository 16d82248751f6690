//! Persistence layer
//!
//! The engine keeps all state in memory; durability comes from whole-database
//! snapshots written on demand or at close and loaded on open.

pub mod snapshot;

pub use snapshot::{
    LegacyIndexSnapshot, PersistenceError, PersistenceResult, SchemaIndexEntry, Snapshot,
    SNAPSHOT_FORMAT_VERSION,
};
