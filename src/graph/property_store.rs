//! Keyed property storage for graph entities
//!
//! A `PropertyStore` maps an entity id to its property map. It holds no
//! opinion about graph structure: dangling edges, labels and indexes are the
//! graph layer's concern. Transactions use one store per entity kind as their
//! staged property layer.

use super::property::{PropertyMap, PropertyValue};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Property maps keyed by entity id
#[derive(Debug, Clone)]
pub struct PropertyStore<I> {
    entries: FxHashMap<I, PropertyMap>,
}

impl<I> PropertyStore<I>
where
    I: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Insert or overwrite a property, returning the previous value
    pub fn set(&mut self, id: I, key: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.entries.entry(id).or_default().insert(key.into(), value)
    }

    /// Get a property value
    pub fn get(&self, id: I, key: &str) -> Option<&PropertyValue> {
        self.entries.get(&id).and_then(|props| props.get(key))
    }

    /// Remove a single property. No-op if absent.
    pub fn remove(&mut self, id: I, key: &str) -> Option<PropertyValue> {
        self.entries.get_mut(&id).and_then(|props| props.remove(key))
    }

    /// Purge every property of an entity
    pub fn delete(&mut self, id: I) -> Option<PropertyMap> {
        self.entries.remove(&id)
    }

    /// Whether this store holds a (possibly empty) map for the entity
    pub fn contains(&self, id: I) -> bool {
        self.entries.contains_key(&id)
    }

    /// All properties of an entity
    pub fn properties(&self, id: I) -> Option<&PropertyMap> {
        self.entries.get(&id)
    }

    /// Seed the map of an entity unless one is already present
    pub fn load(&mut self, id: I, properties: PropertyMap) {
        self.entries.entry(id).or_insert(properties);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I> Default for PropertyStore<I>
where
    I: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
