//! Index subsystem
//!
//! Schema indexes are maintained automatically from committed node state;
//! legacy indexes are named and populated by hand. Both store their entries
//! as time-versioned postings so they answer snapshot reads.

pub mod hits;
pub mod legacy;
pub mod manager;
pub mod postings;
pub mod property_index;

pub use hits::IndexHits;
pub use legacy::{dedup_entities, IndexedEntity, LegacyIndex, LegacyIndexManager, LegacyOp, QueryPattern};
pub use manager::SchemaIndexManager;
pub use postings::{Interval, Postings};
pub use property_index::{IndexDefinition, IndexState, PropertyIndex, PropertyIndexKey};
