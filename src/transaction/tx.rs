//! Transaction handle
//!
//! All graph reads and writes go through a [`Transaction`]. Reads see the
//! committed snapshot as of [`Transaction::start_ts`] with this transaction's
//! own staged writes laid over it. Structural checks (missing endpoints,
//! deleting a node that still has relationships, unique values) fail at the
//! call that breaks them; write conflicts with other transactions surface at
//! [`Transaction::commit`].

use super::commit;
use super::index_handle::LegacyIndexHandle;
use super::pending::PendingWrites;
use super::{TxId, TxState};
use crate::database::DatabaseInner;
use crate::error::{ConstraintViolation, GraphError, GraphResult};
use crate::graph::{
    Direction, Label, Node, NodeId, NodeRecord, PropertyMap, PropertyValue, Relationship, RelationshipId,
    RelationshipRecord, RelationshipType,
};
use crate::index::{IndexHits, PropertyIndex};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Transaction {
    id: TxId,
    start_ts: u64,
    state: TxState,
    db: Arc<DatabaseInner>,
    pub(crate) pending: PendingWrites,
}

impl Transaction {
    pub(crate) fn begin(db: Arc<DatabaseInner>) -> Self {
        let (id, start_ts) = db.transactions.begin();
        debug!("{} started at snapshot {}", id, start_ts);
        Self {
            id,
            start_ts,
            state: TxState::Active,
            db,
            pending: PendingWrites::new(),
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    /// Commit timestamp of the snapshot this transaction reads
    pub fn start_ts(&self) -> u64 {
        self.start_ts
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    pub(crate) fn ensure_active(&self) -> GraphResult<()> {
        if self.state != TxState::Active {
            return Err(GraphError::TransactionNotActive {
                tx_id: self.id,
                state: self.state,
            });
        }
        self.db.ensure_open()
    }

    // ===== Snapshot + staged view =====

    fn visible_node(&self, id: NodeId) -> Option<Node> {
        match self.pending.node(id) {
            Some(staged) => staged,
            None => self.db.store.node_at(id, self.start_ts),
        }
    }

    fn visible_relationship(&self, id: RelationshipId) -> Option<Relationship> {
        match self.pending.relationship(id) {
            Some(staged) => staged,
            None => self.db.store.relationship_at(id, self.start_ts),
        }
    }

    /// Make a node dirty, copying its snapshot state into the staged layer
    fn stage_node(&mut self, id: NodeId) -> GraphResult<&mut NodeRecord> {
        if !self.pending.nodes.contains_key(&id) {
            let node = self
                .db
                .store
                .node_at(id, self.start_ts)
                .ok_or(GraphError::NodeNotFound(id))?;
            self.pending.node_props.load(id, node.properties);
            self.pending.nodes.insert(id, Some(node.record));
        }
        match self.pending.nodes.get_mut(&id) {
            Some(Some(record)) => Ok(record),
            _ => Err(GraphError::NodeNotFound(id)),
        }
    }

    fn stage_relationship(&mut self, id: RelationshipId) -> GraphResult<&mut RelationshipRecord> {
        if !self.pending.relationships.contains_key(&id) {
            let rel = self
                .db
                .store
                .relationship_at(id, self.start_ts)
                .ok_or(GraphError::RelationshipNotFound(id))?;
            self.pending.rel_props.load(id, rel.properties);
            self.pending.relationships.insert(id, Some(rel.record));
        }
        match self.pending.relationships.get_mut(&id) {
            Some(Some(record)) => Ok(record),
            _ => Err(GraphError::RelationshipNotFound(id)),
        }
    }

    // ===== Nodes =====

    /// Create a node carrying `labels`
    pub fn create_node<I, L>(&mut self, labels: I) -> GraphResult<NodeId>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.ensure_active()?;
        let id = self.db.store.allocate_node_id();
        let record = NodeRecord::new(id, labels.into_iter().map(Into::into));
        self.pending.nodes.insert(id, Some(record));
        self.pending.node_props.load(id, PropertyMap::new());
        self.pending.created_nodes.insert(id);
        Ok(id)
    }

    /// Create a node without labels
    pub fn create_unlabeled_node(&mut self) -> GraphResult<NodeId> {
        self.create_node(std::iter::empty::<Label>())
    }

    /// Create a node with labels and initial properties
    pub fn create_node_with_properties<I, L>(&mut self, labels: I, properties: PropertyMap) -> GraphResult<NodeId>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let id = self.create_node(labels)?;
        for (key, value) in properties {
            self.set_node_property(id, key, value)?;
        }
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> GraphResult<Node> {
        self.ensure_active()?;
        self.visible_node(id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn node_exists(&self, id: NodeId) -> bool {
        match self.pending.nodes.get(&id) {
            Some(record) => record.is_some(),
            None => self.db.store.node_at(id, self.start_ts).is_some(),
        }
    }

    /// Delete a node. It must not have any relationships left.
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<()> {
        self.ensure_active()?;
        let node = self.visible_node(id).ok_or(GraphError::NodeNotFound(id))?;

        let attached: FxHashSet<RelationshipId> =
            node.outgoing().iter().chain(node.incoming()).copied().collect();
        if !attached.is_empty() {
            return Err(ConstraintViolation::NodeHasRelationships {
                node: id,
                count: attached.len(),
            }
            .into());
        }

        self.stage_node(id)?;
        self.pending.nodes.insert(id, None);
        self.pending.node_props.delete(id);
        Ok(())
    }

    /// Set a node property, returning the previous value
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        self.ensure_active()?;
        let key = key.into();
        let value = value.into();
        let node = self.visible_node(id).ok_or(GraphError::NodeNotFound(id))?;

        for index in self.db.schema.all() {
            if index.is_unique() && index.property() == key && node.has_label(index.label()) {
                self.check_unique(&index, &value, id)?;
            }
        }

        self.stage_node(id)?.touch();
        Ok(self.pending.node_props.set(id, key, value))
    }

    pub fn get_node_property(&self, id: NodeId, key: &str) -> GraphResult<Option<PropertyValue>> {
        self.ensure_active()?;
        let node = self.visible_node(id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(node.get_property(key).cloned())
    }

    /// Remove a node property. Removing an absent key is a no-op.
    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> GraphResult<Option<PropertyValue>> {
        self.ensure_active()?;
        let node = self.visible_node(id).ok_or(GraphError::NodeNotFound(id))?;
        if !node.has_property(key) {
            return Ok(None);
        }
        self.stage_node(id)?.touch();
        Ok(self.pending.node_props.remove(id, key))
    }

    /// Add a label. Returns false if the node already had it.
    pub fn add_label(&mut self, id: NodeId, label: impl Into<Label>) -> GraphResult<bool> {
        self.ensure_active()?;
        let label = label.into();
        let node = self.visible_node(id).ok_or(GraphError::NodeNotFound(id))?;
        if node.has_label(&label) {
            return Ok(false);
        }

        for index in self.db.schema.for_label(&label) {
            if let Some(value) = node.get_property(index.property()).filter(|_| index.is_unique()) {
                self.check_unique(&index, value, id)?;
            }
        }

        Ok(self.stage_node(id)?.add_label(label))
    }

    /// Remove a label. Returns false if the node did not have it.
    pub fn remove_label(&mut self, id: NodeId, label: impl Into<Label>) -> GraphResult<bool> {
        self.ensure_active()?;
        let label = label.into();
        let node = self.visible_node(id).ok_or(GraphError::NodeNotFound(id))?;
        if !node.has_label(&label) {
            return Ok(false);
        }
        Ok(self.stage_node(id)?.remove_label(&label))
    }

    /// Ids of nodes carrying `label`, ordered by id
    pub fn nodes_with_label(&self, label: impl Into<Label>) -> GraphResult<Vec<NodeId>> {
        self.ensure_active()?;
        let label = label.into();
        let mut ids: Vec<NodeId> = self
            .db
            .store
            .node_ids_with_label_at(&label, self.start_ts)
            .into_iter()
            .filter(|id| !self.pending.nodes.contains_key(id))
            .collect();
        ids.extend(
            self.pending
                .nodes
                .iter()
                .filter(|(_, record)| record.as_ref().map_or(false, |r| r.has_label(&label)))
                .map(|(id, _)| *id),
        );
        ids.sort();
        Ok(ids)
    }

    /// Every visible node, ordered by id
    pub fn all_nodes(&self) -> GraphResult<Vec<Node>> {
        self.ensure_active()?;
        let mut nodes: Vec<Node> = self
            .db
            .store
            .nodes_at(self.start_ts)
            .into_iter()
            .filter(|n| !self.pending.nodes.contains_key(&n.id()))
            .collect();
        nodes.extend(self.pending.nodes.keys().filter_map(|id| self.pending.node(*id).flatten()));
        nodes.sort_by_key(|n| n.id());
        Ok(nodes)
    }

    pub fn node_count(&self) -> GraphResult<usize> {
        self.ensure_active()?;
        let committed = self.db.store.node_count_at(self.start_ts);
        let shadowed = self
            .pending
            .nodes
            .keys()
            .filter(|id| !self.pending.created_nodes.contains(*id))
            .count();
        let staged = self.pending.nodes.values().filter(|r| r.is_some()).count();
        Ok(committed - shadowed + staged)
    }

    // ===== Relationships =====

    /// Create a directed relationship `source -[rel_type]-> target`
    pub fn create_relationship(
        &mut self,
        source: NodeId,
        target: NodeId,
        rel_type: impl Into<RelationshipType>,
    ) -> GraphResult<RelationshipId> {
        self.ensure_active()?;
        for endpoint in [source, target] {
            if !self.node_exists(endpoint) {
                return Err(GraphError::NodeNotFound(endpoint));
            }
        }

        let id = self.db.store.allocate_relationship_id();
        let source_record = self.stage_node(source)?;
        source_record.outgoing.push(id);
        source_record.touch();
        let target_record = self.stage_node(target)?;
        target_record.incoming.push(id);
        target_record.touch();

        self.pending
            .relationships
            .insert(id, Some(RelationshipRecord::new(id, source, target, rel_type)));
        self.pending.rel_props.load(id, PropertyMap::new());
        self.pending.created_rels.insert(id);
        Ok(id)
    }

    pub fn get_relationship(&self, id: RelationshipId) -> GraphResult<Relationship> {
        self.ensure_active()?;
        self.visible_relationship(id)
            .ok_or(GraphError::RelationshipNotFound(id))
    }

    pub fn relationship_exists(&self, id: RelationshipId) -> bool {
        match self.pending.relationships.get(&id) {
            Some(record) => record.is_some(),
            None => self.db.store.relationship_at(id, self.start_ts).is_some(),
        }
    }

    /// Delete a relationship and detach it from both endpoints
    pub fn delete_relationship(&mut self, id: RelationshipId) -> GraphResult<()> {
        self.ensure_active()?;
        let record = self.stage_relationship(id)?.clone();

        self.stage_node(record.source)?.outgoing.retain(|r| *r != id);
        self.stage_node(record.target)?.incoming.retain(|r| *r != id);
        if let Some(Some(source)) = self.pending.nodes.get_mut(&record.source) {
            source.touch();
        }
        if let Some(Some(target)) = self.pending.nodes.get_mut(&record.target) {
            target.touch();
        }

        self.pending.relationships.insert(id, None);
        self.pending.rel_props.delete(id);
        Ok(())
    }

    pub fn set_relationship_property(
        &mut self,
        id: RelationshipId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        self.ensure_active()?;
        self.stage_relationship(id)?;
        Ok(self.pending.rel_props.set(id, key, value.into()))
    }

    pub fn get_relationship_property(&self, id: RelationshipId, key: &str) -> GraphResult<Option<PropertyValue>> {
        self.ensure_active()?;
        let rel = self
            .visible_relationship(id)
            .ok_or(GraphError::RelationshipNotFound(id))?;
        Ok(rel.get_property(key).cloned())
    }

    pub fn remove_relationship_property(&mut self, id: RelationshipId, key: &str) -> GraphResult<Option<PropertyValue>> {
        self.ensure_active()?;
        let rel = self
            .visible_relationship(id)
            .ok_or(GraphError::RelationshipNotFound(id))?;
        if !rel.has_property(key) {
            return Ok(None);
        }
        self.stage_relationship(id)?;
        Ok(self.pending.rel_props.remove(id, key))
    }

    /// Relationships attached to `node` in `direction`, optionally of one type.
    ///
    /// With [`Direction::Both`] a self-loop is reported once.
    pub fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&RelationshipType>,
    ) -> GraphResult<Vec<Relationship>> {
        self.ensure_active()?;
        let node = self.visible_node(node).ok_or(GraphError::NodeNotFound(node))?;

        let mut ids: Vec<RelationshipId> = Vec::with_capacity(node.degree());
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            ids.extend_from_slice(node.outgoing());
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            for id in node.incoming() {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }

        Ok(ids
            .into_iter()
            .filter_map(|id| self.visible_relationship(id))
            .filter(|rel| rel_type.map_or(true, |t| rel.rel_type() == t))
            .collect())
    }

    /// The only relationship of `rel_type` in `direction`, if any.
    ///
    /// More than one is a constraint error.
    pub fn single_relationship(
        &self,
        node: NodeId,
        rel_type: &RelationshipType,
        direction: Direction,
    ) -> GraphResult<Option<Relationship>> {
        let mut rels = self.relationships(node, direction, Some(rel_type))?;
        match rels.len() {
            0 => Ok(None),
            1 => Ok(rels.pop()),
            count => Err(ConstraintViolation::NotSingle { count }.into()),
        }
    }

    pub fn relationship_count(&self) -> GraphResult<usize> {
        self.ensure_active()?;
        let committed = self.db.store.relationship_count_at(self.start_ts);
        let shadowed = self
            .pending
            .relationships
            .keys()
            .filter(|id| !self.pending.created_rels.contains(*id))
            .count();
        let staged = self.pending.relationships.values().filter(|r| r.is_some()).count();
        Ok(committed - shadowed + staged)
    }

    // ===== Indexes =====

    /// Nodes with `label` whose `key` equals `value`, through the schema index.
    ///
    /// Includes this transaction's own uncommitted changes. Fails with
    /// [`GraphError::IndexMissing`] if no such index exists.
    pub fn find_nodes(
        &self,
        label: impl Into<Label>,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<IndexHits<NodeId>> {
        self.ensure_active()?;
        let index = self.db.schema.require(&label.into(), key)?;
        Ok(IndexHits::new(self.index_lookup(&index, &value.into())))
    }

    fn index_lookup(&self, index: &PropertyIndex, value: &PropertyValue) -> Vec<NodeId> {
        index.await_online();

        let staged_value = |id: NodeId, record: &NodeRecord| -> bool {
            self.pending
                .node_props
                .properties(id)
                .and_then(|props| index.indexed_value(record, props))
                == Some(value)
        };

        let mut seen = FxHashSet::default();
        let mut hits: Vec<NodeId> = index
            .get(value, self.start_ts)
            .into_iter()
            .filter(|id| match self.pending.nodes.get(id) {
                None => true,
                Some(None) => false,
                Some(Some(record)) => staged_value(*id, record),
            })
            .filter(|id| seen.insert(*id))
            .collect();

        for (id, record) in &self.pending.nodes {
            if let Some(record) = record {
                if !seen.contains(id) && staged_value(*id, record) {
                    seen.insert(*id);
                    hits.push(*id);
                }
            }
        }
        hits
    }

    fn check_unique(&self, index: &PropertyIndex, value: &PropertyValue, id: NodeId) -> GraphResult<()> {
        match self.index_lookup(index, value).into_iter().find(|other| *other != id) {
            Some(existing) => Err(ConstraintViolation::UniqueValue {
                label: index.label().clone(),
                property: index.property().to_string(),
                value: value.clone(),
                existing,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Named legacy index over nodes, created on first use
    pub fn node_index(&mut self, name: &str) -> LegacyIndexHandle<'_, NodeId> {
        let index = self.db.legacy.for_nodes(name);
        LegacyIndexHandle::new(self, index)
    }

    /// Named legacy index over relationships, created on first use
    pub fn relationship_index(&mut self, name: &str) -> LegacyIndexHandle<'_, RelationshipId> {
        let index = self.db.legacy.for_relationships(name);
        LegacyIndexHandle::new(self, index)
    }

    // ===== Lifecycle =====

    /// Validate and atomically publish every staged change.
    ///
    /// On error nothing is published and the transaction ends rolled back.
    /// A [`GraphError::Conflict`] can be retried with a new transaction.
    pub fn commit(&mut self) -> GraphResult<()> {
        self.ensure_active()?;
        self.state = TxState::Committing;

        let pending = std::mem::take(&mut self.pending);
        let result = commit::commit(&self.db, self.start_ts, pending);
        self.db.transactions.end(self.id);

        match result {
            Ok(outcome) => {
                self.state = TxState::Committed;
                debug!(
                    "{} committed at ts {} ({} events)",
                    self.id, outcome.commit_ts, outcome.event_count
                );
                if let Some(count) = outcome.commit_count {
                    self.db.after_commit(count);
                }
                Ok(())
            }
            Err(e) => {
                self.state = TxState::RolledBack;
                if e.is_retryable() {
                    warn!("{} aborted: {}", self.id, e);
                } else {
                    debug!("{} failed to commit: {}", self.id, e);
                }
                Err(e)
            }
        }
    }

    /// Discard every staged change
    pub fn rollback(&mut self) -> GraphResult<()> {
        if self.state != TxState::Active {
            return Err(GraphError::TransactionNotActive {
                tx_id: self.id,
                state: self.state,
            });
        }
        self.abort();
        Ok(())
    }

    fn abort(&mut self) {
        self.state = TxState::RollingBack;
        self.pending.clear();
        self.db.transactions.end(self.id);
        self.state = TxState::RolledBack;
        debug!("{} rolled back", self.id);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TxState::Active {
            self.abort();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("start_ts", &self.start_ts)
            .field("state", &self.state)
            .field("dirty_nodes", &self.pending.nodes.len())
            .field("dirty_relationships", &self.pending.relationships.len())
            .finish()
    }
}
