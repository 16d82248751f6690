//! Database facade
//!
//! [`GraphDatabase`] owns the committed graph, both index managers, the
//! transaction manager and the lifecycle event bus. It is cheap to clone and
//! safe to share between threads; every clone refers to the same engine.

use crate::config::EngineConfig;
use crate::error::{GraphError, GraphResult};
use crate::graph::{EventBus, GraphStore, LifecycleEvent, NodeId, RelationshipId};
use crate::index::{IndexDefinition, IndexedEntity, LegacyIndexManager, SchemaIndexManager};
use crate::persistence::{LegacyIndexSnapshot, PersistenceError, SchemaIndexEntry, Snapshot};
use crate::schema::Schema;
use crate::transaction::{Transaction, TransactionManager};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// Shared engine state behind every [`GraphDatabase`] handle and transaction
#[derive(Debug)]
pub(crate) struct DatabaseInner {
    pub(crate) config: EngineConfig,
    pub(crate) store: GraphStore,
    pub(crate) schema: SchemaIndexManager,
    pub(crate) legacy: LegacyIndexManager,
    pub(crate) transactions: TransactionManager,
    pub(crate) events: EventBus,
    closed: AtomicBool,
}

impl DatabaseInner {
    fn new(config: EngineConfig) -> Self {
        Self {
            store: GraphStore::new(config.shard_count),
            schema: SchemaIndexManager::new(),
            legacy: LegacyIndexManager::new(),
            transactions: TransactionManager::new(),
            events: EventBus::new(),
            closed: AtomicBool::new(false),
            config,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> GraphResult<()> {
        if self.is_closed() {
            Err(GraphError::DatabaseClosed)
        } else {
            Ok(())
        }
    }

    /// Housekeeping after a published commit
    pub(crate) fn after_commit(&self, commit_count: u64) {
        let interval = self.config.gc_interval_commits;
        if interval > 0 && commit_count % interval == 0 {
            self.vacuum();
        }
    }

    pub(crate) fn vacuum(&self) -> VacuumReport {
        let horizon = self.transactions.oldest_snapshot();
        let graph = self.store.vacuum(horizon);
        let index_intervals_pruned = self.schema.vacuum(horizon) + self.legacy.vacuum(horizon);
        let report = VacuumReport {
            horizon,
            versions_pruned: graph.versions_pruned,
            chains_removed: graph.chains_removed,
            index_intervals_pruned,
        };
        debug!(
            "vacuum at horizon {}: {} versions, {} chains, {} index intervals pruned",
            horizon, report.versions_pruned, report.chains_removed, report.index_intervals_pruned
        );
        report
    }

    /// Capture the latest committed state
    fn snapshot(&self) -> Snapshot {
        // Pin the snapshot so vacuum keeps the versions we are about to read.
        let (pin, ts) = self.transactions.begin();

        let mut snapshot = Snapshot::new(ts);
        let (next_node_id, next_relationship_id) = self.store.id_watermarks();
        snapshot.next_node_id = next_node_id;
        snapshot.next_relationship_id = next_relationship_id;
        snapshot.nodes = self.store.nodes_at(ts);
        snapshot.relationships = self.store.relationships_at(ts);
        snapshot.schema_indexes = self
            .schema
            .all()
            .iter()
            .map(|index| SchemaIndexEntry {
                label: index.label().clone(),
                property: index.property().to_string(),
                unique: index.is_unique(),
            })
            .collect();
        snapshot.node_indexes = self.legacy_snapshot::<NodeId>(&self.legacy.node_index_names(), ts);
        snapshot.relationship_indexes =
            self.legacy_snapshot::<RelationshipId>(&self.legacy.relationship_index_names(), ts);

        self.transactions.end(pin);
        snapshot
    }

    fn legacy_snapshot<I: IndexedEntity>(&self, names: &[String], ts: u64) -> Vec<LegacyIndexSnapshot<I>> {
        names
            .iter()
            .filter_map(|name| self.legacy.existing::<I>(name))
            .map(|index| LegacyIndexSnapshot {
                name: index.name().to_string(),
                entries: index.all_entries(ts),
            })
            .collect()
    }

    /// Load a snapshot into an empty database
    fn restore(&self, snapshot: Snapshot) -> GraphResult<()> {
        let ts = snapshot.commit_ts;
        let node_count = snapshot.nodes.len();
        let rel_count = snapshot.relationships.len();

        for node in snapshot.nodes {
            self.store.restore_node(node, ts);
        }
        for rel in snapshot.relationships {
            self.store.restore_relationship(rel, ts);
        }
        self.store
            .reserve_ids(snapshot.next_node_id, snapshot.next_relationship_id);
        self.transactions.restore_clock(ts);

        for entry in snapshot.schema_indexes {
            let index = self.schema.register(entry.label, entry.property, entry.unique)?;
            index.populate(&self.store, ts);
            index.mark_online();
        }
        restore_legacy(&self.legacy, snapshot.node_indexes, ts);
        restore_legacy(&self.legacy, snapshot.relationship_indexes, ts);

        info!(
            "restored snapshot at ts {}: {} nodes, {} relationships",
            ts, node_count, rel_count
        );
        Ok(())
    }
}

fn restore_legacy<I: IndexedEntity>(manager: &LegacyIndexManager, indexes: Vec<LegacyIndexSnapshot<I>>, ts: u64) {
    for saved in indexes {
        let index = manager.index::<I>(&saved.name);
        for (key, value, entity) in saved.entries {
            index.apply(
                &crate::index::LegacyOp::Add {
                    index: saved.name.clone(),
                    entity,
                    key,
                    value,
                },
                ts,
            );
        }
    }
}

/// Outcome of [`GraphDatabase::vacuum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VacuumReport {
    /// Oldest snapshot still readable after the pass
    pub horizon: u64,
    pub versions_pruned: usize,
    pub chains_removed: usize,
    pub index_intervals_pruned: usize,
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub last_commit_ts: u64,
    pub commit_count: u64,
    pub active_transactions: usize,
    pub node_count: usize,
    pub relationship_count: usize,
    pub retained_versions: usize,
    pub schema_indexes: Vec<IndexDefinition>,
    pub legacy_indexes: Vec<IndexDefinition>,
    pub subscribers: usize,
}

impl fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", json)
    }
}

/// Embedded transactional property-graph database
#[derive(Debug, Clone)]
pub struct GraphDatabase {
    inner: Arc<DatabaseInner>,
}

impl GraphDatabase {
    /// Open a database, loading the configured snapshot if there is one
    pub fn open(config: EngineConfig) -> GraphResult<Self> {
        config.validate()?;
        let inner = DatabaseInner::new(config);

        if let Some(path) = inner.config.snapshot_path.clone() {
            if inner.config.load_snapshot_on_open && path.exists() {
                let snapshot = Snapshot::read_from(&path)?;
                inner.restore(snapshot)?;
            }
        }

        info!(
            "opened database ({} shards, snapshot: {:?})",
            inner.config.shard_count, inner.config.snapshot_path
        );
        Ok(Self { inner: Arc::new(inner) })
    }

    /// A database that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(DatabaseInner::new(EngineConfig::in_memory())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Start a transaction reading the latest committed state
    pub fn begin_tx(&self) -> GraphResult<Transaction> {
        self.inner.ensure_open()?;
        Ok(Transaction::begin(Arc::clone(&self.inner)))
    }

    /// Schema index administration
    pub fn schema(&self) -> Schema<'_> {
        Schema::new(&self.inner)
    }

    /// Registry of named legacy indexes
    pub fn legacy_indexes(&self) -> &LegacyIndexManager {
        &self.inner.legacy
    }

    /// Receive lifecycle events from now on
    pub fn subscribe(&self) -> UnboundedReceiver<LifecycleEvent> {
        self.inner.events.subscribe()
    }

    /// Write the latest committed state to `path`
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> GraphResult<()> {
        self.inner.ensure_open()?;
        self.inner.snapshot().write_to(path)?;
        Ok(())
    }

    /// Write the latest committed state to the configured snapshot path
    pub fn checkpoint(&self) -> GraphResult<()> {
        let path = self
            .inner
            .config
            .snapshot_path
            .clone()
            .ok_or(PersistenceError::NoSnapshotPath)?;
        self.save_snapshot(path)
    }

    /// Drop versions no active transaction can read any more
    pub fn vacuum(&self) -> VacuumReport {
        self.inner.vacuum()
    }

    pub fn stats(&self) -> DatabaseStats {
        let inner = &self.inner;
        let ts = inner.transactions.last_committed();
        DatabaseStats {
            last_commit_ts: ts,
            commit_count: inner.transactions.commit_count(),
            active_transactions: inner.transactions.active_count(),
            node_count: inner.store.node_count_at(ts),
            relationship_count: inner.store.relationship_count_at(ts),
            retained_versions: inner.store.version_count(),
            schema_indexes: inner.schema.definitions(),
            legacy_indexes: inner.legacy.definitions(),
            subscribers: inner.events.subscriber_count(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Shut the database down. Calling it again is a no-op.
    ///
    /// Waits for an in-flight commit, writes the snapshot if configured, and
    /// notifies subscribers. If the snapshot write fails the database stays
    /// open and `close` may be retried. Transactions still open afterwards can
    /// only be rolled back.
    pub fn close(&self) -> GraphResult<()> {
        let _sequencer = self.inner.transactions.lock_commits();
        if self.inner.is_closed() {
            return Ok(());
        }

        let active = self.inner.transactions.active_count();
        if active > 0 {
            warn!("closing with {} active transaction(s)", active);
        }

        // The database stays open if the final snapshot cannot be written.
        if self.inner.config.snapshot_on_close {
            if let Some(path) = &self.inner.config.snapshot_path {
                self.inner.snapshot().write_to(path)?;
            }
        }

        self.inner.closed.store(true, Ordering::Release);
        self.inner.events.publish(LifecycleEvent::Shutdown);
        info!("database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Label;

    #[test]
    fn test_close_is_idempotent() {
        let db = GraphDatabase::in_memory();
        let mut events = db.subscribe();

        db.close().unwrap();
        db.close().unwrap();

        assert!(db.is_closed());
        assert_eq!(events.try_recv().unwrap(), LifecycleEvent::Shutdown);
        assert!(events.try_recv().is_err());
        assert!(matches!(db.begin_tx(), Err(GraphError::DatabaseClosed)));
    }

    #[test]
    fn test_stats() {
        let db = GraphDatabase::in_memory();
        let mut tx = db.begin_tx().unwrap();
        let a = tx.create_node(["Person"]).unwrap();
        let b = tx.create_node(["Person"]).unwrap();
        tx.create_relationship(a, b, "KNOWS").unwrap();
        tx.commit().unwrap();

        let stats = db.stats();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.relationship_count, 1);
        assert_eq!(stats.commit_count, 1);
        assert_eq!(stats.active_transactions, 0);
        assert!(stats.to_string().contains("\"node_count\": 2"));
    }

    #[test]
    fn test_vacuum_after_updates() {
        let db = GraphDatabase::in_memory();
        let mut tx = db.begin_tx().unwrap();
        let id = tx.create_node([Label::new("Counter")]).unwrap();
        tx.commit().unwrap();

        for i in 0..3i64 {
            let mut tx = db.begin_tx().unwrap();
            tx.set_node_property(id, "value", i).unwrap();
            tx.commit().unwrap();
        }
        assert_eq!(db.stats().retained_versions, 4);

        let report = db.vacuum();
        assert_eq!(report.horizon, 4);
        assert_eq!(report.versions_pruned, 3);
        assert_eq!(db.stats().retained_versions, 1);
    }

    #[test]
    fn test_checkpoint_requires_path() {
        let db = GraphDatabase::in_memory();
        assert!(matches!(
            db.checkpoint(),
            Err(GraphError::Persistence(PersistenceError::NoSnapshotPath))
        ));
    }
}
