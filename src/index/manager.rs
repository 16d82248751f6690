//! Manager for schema indexes
//!
//! Handles registration, removal, and lookup of (label, property) indexes.
//! Population and commit ordering are driven by the database; this type only
//! owns the registry.

use super::property_index::{IndexDefinition, PropertyIndex, PropertyIndexKey};
use crate::error::{ConstraintViolation, GraphError, GraphResult};
use crate::graph::Label;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of all schema indexes
#[derive(Debug, Default)]
pub struct SchemaIndexManager {
    indices: RwLock<BTreeMap<PropertyIndexKey, Arc<PropertyIndex>>>,
}

impl SchemaIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, not yet populated index
    pub fn register(&self, label: Label, property: String, unique: bool) -> GraphResult<Arc<PropertyIndex>> {
        let key = PropertyIndexKey { label, property };
        let mut indices = self.indices.write();
        if indices.contains_key(&key) {
            return Err(ConstraintViolation::IndexAlreadyExists {
                label: key.label,
                property: key.property,
            }
            .into());
        }
        let index = Arc::new(PropertyIndex::new(key.clone(), unique));
        indices.insert(key, Arc::clone(&index));
        Ok(index)
    }

    /// Drop an index
    pub fn drop_index(&self, label: &Label, property: &str) -> GraphResult<Arc<PropertyIndex>> {
        let key = PropertyIndexKey::new(label, property);
        self.indices.write().remove(&key).ok_or_else(|| GraphError::IndexNotFound {
            label: label.clone(),
            property: property.to_string(),
        })
    }

    /// Check if an index exists
    pub fn has_index(&self, label: &Label, property: &str) -> bool {
        self.indices.read().contains_key(&PropertyIndexKey::new(label, property))
    }

    /// Get index for querying
    pub fn get_index(&self, label: &Label, property: &str) -> Option<Arc<PropertyIndex>> {
        self.indices.read().get(&PropertyIndexKey::new(label, property)).cloned()
    }

    /// Like [`get_index`](Self::get_index) but a missing index is an error
    pub fn require(&self, label: &Label, property: &str) -> GraphResult<Arc<PropertyIndex>> {
        self.get_index(label, property).ok_or_else(|| GraphError::IndexMissing {
            label: label.clone(),
            property: property.to_string(),
        })
    }

    /// All indexes, ordered by (label, property)
    pub fn all(&self) -> Vec<Arc<PropertyIndex>> {
        self.indices.read().values().cloned().collect()
    }

    pub fn for_label(&self, label: &Label) -> Vec<Arc<PropertyIndex>> {
        self.indices
            .read()
            .values()
            .filter(|index| index.label() == label)
            .cloned()
            .collect()
    }

    pub fn definitions(&self) -> Vec<IndexDefinition> {
        self.indices.read().values().map(|index| index.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.indices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.read().is_empty()
    }

    /// Prune postings intervals no snapshot at or after `horizon` can see
    pub fn vacuum(&self, horizon: u64) -> usize {
        self.all().iter().map(|index| index.vacuum(horizon)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_drop() {
        let manager = SchemaIndexManager::new();
        let label = Label::new("User");

        manager.register(label.clone(), "username".into(), false).unwrap();
        assert!(manager.has_index(&label, "username"));

        let err = manager.register(label.clone(), "username".into(), false).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Constraint(ConstraintViolation::IndexAlreadyExists { .. })
        ));

        manager.drop_index(&label, "username").unwrap();
        assert!(!manager.has_index(&label, "username"));
        assert!(matches!(
            manager.drop_index(&label, "username"),
            Err(GraphError::IndexNotFound { .. })
        ));
        assert!(matches!(
            manager.require(&label, "username"),
            Err(GraphError::IndexMissing { .. })
        ));
    }

    #[test]
    fn test_for_label() {
        let manager = SchemaIndexManager::new();
        manager.register("User".into(), "username".into(), false).unwrap();
        manager.register("User".into(), "email".into(), true).unwrap();
        manager.register("Company".into(), "name".into(), false).unwrap();

        let user_indexes = manager.for_label(&Label::new("User"));
        assert_eq!(user_indexes.len(), 2);
        assert_eq!(user_indexes[0].property(), "email");
        assert_eq!(manager.definitions().len(), 3);
    }
}
