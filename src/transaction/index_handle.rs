//! Transaction-scoped access to a legacy index
//!
//! Mutations are staged on the transaction and become visible to others only
//! when it commits. Reads overlay the staged mutations on the committed
//! entries as of the transaction's snapshot.

use super::pending::PendingWrites;
use super::tx::Transaction;
use crate::error::{GraphError, GraphResult};
use crate::graph::{NodeId, PropertyValue, RelationshipId};
use crate::index::{dedup_entities, IndexHits, IndexedEntity, LegacyIndex, LegacyOp, QueryPattern};
use std::sync::Arc;

/// Entity kinds whose legacy index mutations can be staged on a transaction
pub trait StagedEntity: IndexedEntity {
    fn staged_ops(pending: &PendingWrites) -> &[LegacyOp<Self>];

    fn staged_ops_mut(pending: &mut PendingWrites) -> &mut Vec<LegacyOp<Self>>;

    fn is_visible(tx: &Transaction, id: Self) -> bool;

    fn not_found(id: Self) -> GraphError;
}

impl StagedEntity for NodeId {
    fn staged_ops(pending: &PendingWrites) -> &[LegacyOp<Self>] {
        &pending.node_index_ops
    }

    fn staged_ops_mut(pending: &mut PendingWrites) -> &mut Vec<LegacyOp<Self>> {
        &mut pending.node_index_ops
    }

    fn is_visible(tx: &Transaction, id: Self) -> bool {
        tx.node_exists(id)
    }

    fn not_found(id: Self) -> GraphError {
        GraphError::NodeNotFound(id)
    }
}

impl StagedEntity for RelationshipId {
    fn staged_ops(pending: &PendingWrites) -> &[LegacyOp<Self>] {
        &pending.rel_index_ops
    }

    fn staged_ops_mut(pending: &mut PendingWrites) -> &mut Vec<LegacyOp<Self>> {
        &mut pending.rel_index_ops
    }

    fn is_visible(tx: &Transaction, id: Self) -> bool {
        tx.relationship_exists(id)
    }

    fn not_found(id: Self) -> GraphError {
        GraphError::RelationshipNotFound(id)
    }
}

/// A named legacy index bound to one transaction
pub struct LegacyIndexHandle<'tx, I: StagedEntity> {
    tx: &'tx mut Transaction,
    index: Arc<LegacyIndex<I>>,
}

impl<'tx, I: StagedEntity> LegacyIndexHandle<'tx, I> {
    pub(crate) fn new(tx: &'tx mut Transaction, index: Arc<LegacyIndex<I>>) -> Self {
        Self { tx, index }
    }

    pub fn name(&self) -> &str {
        self.index.name()
    }

    /// Staged ops on this index, in the order they were made
    fn ops(&self) -> impl Iterator<Item = &LegacyOp<I>> + '_ {
        I::staged_ops(&self.tx.pending)
            .iter()
            .filter(move |op| op.index() == self.index.name())
    }

    fn stage(&mut self, op: LegacyOp<I>) {
        I::staged_ops_mut(&mut self.tx.pending).push(op);
    }

    /// Store `entity` under (key, value). The entity must exist.
    pub fn add(&mut self, entity: I, key: impl Into<String>, value: impl Into<PropertyValue>) -> GraphResult<()> {
        self.tx.ensure_active()?;
        if !I::is_visible(self.tx, entity) {
            return Err(I::not_found(entity));
        }
        let op = LegacyOp::Add {
            index: self.index.name().to_string(),
            entity,
            key: key.into(),
            value: value.into(),
        };
        self.stage(op);
        Ok(())
    }

    /// Remove the (key, value) entry for `entity`
    pub fn remove(&mut self, entity: I, key: impl Into<String>, value: impl Into<PropertyValue>) -> GraphResult<()> {
        self.tx.ensure_active()?;
        let op = LegacyOp::Remove {
            index: self.index.name().to_string(),
            entity,
            key: key.into(),
            value: value.into(),
        };
        self.stage(op);
        Ok(())
    }

    /// Remove every entry for `entity` under `key`
    pub fn remove_key(&mut self, entity: I, key: &str) -> GraphResult<()> {
        self.tx.ensure_active()?;
        for (entry_key, value) in self.entries_of(entity) {
            if entry_key == key {
                self.remove(entity, entry_key, value)?;
            }
        }
        Ok(())
    }

    /// Remove every entry for `entity`
    pub fn remove_entity(&mut self, entity: I) -> GraphResult<()> {
        self.tx.ensure_active()?;
        for (key, value) in self.entries_of(entity) {
            self.remove(entity, key, value)?;
        }
        Ok(())
    }

    /// Entities stored under exactly (key, value).
    ///
    /// Entities deleted since they were added are still returned.
    pub fn get(&self, key: &str, value: impl Into<PropertyValue>) -> GraphResult<IndexHits<I>> {
        self.tx.ensure_active()?;
        let value = value.into();
        let mut hits = self.index.get(key, &value, self.tx.start_ts());
        for op in self.ops().filter(|op| op.key() == key && *op.value() == value) {
            match op {
                LegacyOp::Add { entity, .. } => {
                    if !hits.contains(entity) {
                        hits.push(*entity);
                    }
                }
                LegacyOp::Remove { entity, .. } => hits.retain(|id| id != entity),
            }
        }
        Ok(IndexHits::new(hits))
    }

    /// Entities under `key` whose value matches `pattern`.
    ///
    /// `*` matches any value; otherwise `*` and `?` are wildcards over string
    /// values and a pattern without wildcards matches a value exactly.
    pub fn query(&self, key: &str, pattern: &str) -> GraphResult<IndexHits<I>> {
        self.tx.ensure_active()?;
        let pattern = QueryPattern::parse(pattern);
        let mut entries = self.index.query(key, &pattern, self.tx.start_ts());
        for op in self.ops().filter(|op| op.key() == key && pattern.matches(op.value())) {
            let entry = (op.value().clone(), op.entity());
            match op {
                LegacyOp::Add { .. } => {
                    if !entries.contains(&entry) {
                        entries.push(entry);
                    }
                }
                LegacyOp::Remove { .. } => entries.retain(|e| *e != entry),
            }
        }
        Ok(IndexHits::new(dedup_entities(entries.into_iter().map(|(_, id)| id))))
    }

    fn entries_of(&self, entity: I) -> Vec<(String, PropertyValue)> {
        let mut entries = self.index.entries_of(entity, self.tx.start_ts());
        for op in self.ops().filter(|op| op.entity() == entity) {
            let entry = (op.key().to_string(), op.value().clone());
            match op {
                LegacyOp::Add { .. } => {
                    if !entries.contains(&entry) {
                        entries.push(entry);
                    }
                }
                LegacyOp::Remove { .. } => entries.retain(|e| *e != entry),
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use crate::error::GraphError;
    use crate::graph::NodeId;
    use crate::GraphDatabase;

    #[test]
    fn test_staged_entries_visible_to_writer_only() {
        let db = GraphDatabase::in_memory();
        let mut tx = db.begin_tx().unwrap();
        let neo = tx.create_node(["Person"]).unwrap();
        tx.node_index("people").add(neo, "name", "Thomas").unwrap();
        assert_eq!(
            tx.node_index("people").get("name", "Thomas").unwrap().single().unwrap(),
            Some(neo)
        );

        let mut other = db.begin_tx().unwrap();
        assert!(other.node_index("people").get("name", "Thomas").unwrap().is_empty());

        tx.commit().unwrap();
        let mut fresh = db.begin_tx().unwrap();
        assert_eq!(fresh.node_index("people").get("name", "Thomas").unwrap().len(), 1);
    }

    #[test]
    fn test_add_requires_existing_entity() {
        let db = GraphDatabase::in_memory();
        let mut tx = db.begin_tx().unwrap();
        let ghost = NodeId::new(42);
        assert!(matches!(
            tx.node_index("people").add(ghost, "name", "nobody"),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_remove_entity_and_key() {
        let db = GraphDatabase::in_memory();
        let mut tx = db.begin_tx().unwrap();
        let neo = tx.create_node(["Person"]).unwrap();
        {
            let mut index = tx.node_index("people");
            index.add(neo, "name", "Thomas").unwrap();
            index.add(neo, "alias", "Neo").unwrap();
            index.add(neo, "alias", "The One").unwrap();
        }
        tx.commit().unwrap();

        let mut tx = db.begin_tx().unwrap();
        tx.node_index("people").remove_key(neo, "alias").unwrap();
        {
            let index = tx.node_index("people");
            assert!(index.query("alias", "*").unwrap().is_empty());
            assert_eq!(index.get("name", "Thomas").unwrap().len(), 1);
        }
        tx.node_index("people").remove_entity(neo).unwrap();
        assert!(tx.node_index("people").get("name", "Thomas").unwrap().is_empty());
        tx.commit().unwrap();

        let mut tx = db.begin_tx().unwrap();
        assert!(tx.node_index("people").query("name", "*").unwrap().is_empty());
    }

    #[test]
    fn test_query_overlays_staged_ops() {
        let db = GraphDatabase::in_memory();
        let mut tx = db.begin_tx().unwrap();
        let a = tx.create_node(["Person"]).unwrap();
        let b = tx.create_node(["Person"]).unwrap();
        tx.node_index("people").add(a, "name", "Trinity").unwrap();
        tx.commit().unwrap();

        let mut tx = db.begin_tx().unwrap();
        let mut index = tx.node_index("people");
        index.add(b, "name", "Tank").unwrap();
        index.remove(a, "name", "Trinity").unwrap();
        let hits = index.query("name", "T*").unwrap();
        assert_eq!(hits.into_vec(), vec![b]);
    }
}
