//! Committed graph storage
//!
//! Holds the canonical node and relationship records as version chains.
//! Nothing in here is transactional by itself: transactions stage their
//! writes privately and the commit path publishes whole versions through
//! [`GraphStore::publish_node`] / [`GraphStore::publish_relationship`] under
//! the commit sequencer.
//!
//! Storage is split into shards, each a lock over a map of chains, so readers
//! and the committer only contend when they touch the same shard.

use super::node::Node;
use super::relationship::Relationship;
use super::types::{Label, NodeId, RelationshipId};
use super::version::VersionChain;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type Shard<K, V> = RwLock<FxHashMap<K, VersionChain<V>>>;

/// Outcome of a garbage-collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VacuumStats {
    /// Versions dropped from surviving chains
    pub versions_pruned: usize,
    /// Chains removed entirely (tombstoned entities)
    pub chains_removed: usize,
}

impl std::ops::AddAssign for VacuumStats {
    fn add_assign(&mut self, other: Self) {
        self.versions_pruned += other.versions_pruned;
        self.chains_removed += other.chains_removed;
    }
}

/// Sharded, multi-version storage of committed nodes and relationships
#[derive(Debug)]
pub struct GraphStore {
    node_shards: Vec<Shard<NodeId, Node>>,
    rel_shards: Vec<Shard<RelationshipId, Relationship>>,

    /// Next node ID (monotonic, never reused)
    next_node_id: AtomicU64,

    /// Next relationship ID (monotonic, never reused)
    next_rel_id: AtomicU64,
}

impl GraphStore {
    /// Create an empty store with `shard_count` shards per entity kind
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        GraphStore {
            node_shards: (0..shard_count).map(|_| RwLock::new(FxHashMap::default())).collect(),
            rel_shards: (0..shard_count).map(|_| RwLock::new(FxHashMap::default())).collect(),
            next_node_id: AtomicU64::new(1),
            next_rel_id: AtomicU64::new(1),
        }
    }

    fn node_shard(&self, id: NodeId) -> &Shard<NodeId, Node> {
        &self.node_shards[(id.as_u64() as usize) % self.node_shards.len()]
    }

    fn rel_shard(&self, id: RelationshipId) -> &Shard<RelationshipId, Relationship> {
        &self.rel_shards[(id.as_u64() as usize) % self.rel_shards.len()]
    }

    pub fn allocate_node_id(&self) -> NodeId {
        NodeId::new(self.next_node_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn allocate_relationship_id(&self) -> RelationshipId {
        RelationshipId::new(self.next_rel_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Get a node as seen by a snapshot at `ts`
    pub fn node_at(&self, id: NodeId, ts: u64) -> Option<Node> {
        self.node_shard(id).read().get(&id).and_then(|c| c.visible_at(ts).cloned())
    }

    /// Get a relationship as seen by a snapshot at `ts`
    pub fn relationship_at(&self, id: RelationshipId, ts: u64) -> Option<Relationship> {
        self.rel_shard(id).read().get(&id).and_then(|c| c.visible_at(ts).cloned())
    }

    /// Commit timestamp of the newest version of a node, if it was ever committed
    pub fn node_latest_commit(&self, id: NodeId) -> Option<u64> {
        self.node_shard(id).read().get(&id).map(|c| c.latest_commit())
    }

    pub fn relationship_latest_commit(&self, id: RelationshipId) -> Option<u64> {
        self.rel_shard(id).read().get(&id).map(|c| c.latest_commit())
    }

    /// Newest committed node version, ignoring snapshots
    pub fn latest_node(&self, id: NodeId) -> Option<Node> {
        self.node_shard(id).read().get(&id).and_then(|c| c.latest().cloned())
    }

    /// Append a committed node version (`None` is a tombstone)
    pub fn publish_node(&self, id: NodeId, commit_ts: u64, node: Option<Node>) {
        self.node_shard(id).write().entry(id).or_default().push(commit_ts, node);
    }

    /// Append a committed relationship version (`None` is a tombstone)
    pub fn publish_relationship(&self, id: RelationshipId, commit_ts: u64, rel: Option<Relationship>) {
        self.rel_shard(id).write().entry(id).or_default().push(commit_ts, rel);
    }

    /// All nodes visible at `ts`, ordered by id
    pub fn nodes_at(&self, ts: u64) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .node_shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .values()
                    .filter_map(|c| c.visible_at(ts).cloned())
                    .collect::<Vec<_>>()
            })
            .collect();
        nodes.sort_by_key(|n| n.id());
        nodes
    }

    /// Ids of nodes carrying `label` at `ts`, ordered by id
    pub fn node_ids_with_label_at(&self, label: &Label, ts: u64) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .node_shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .iter()
                    .filter(|(_, c)| c.visible_at(ts).map_or(false, |n| n.has_label(label)))
                    .map(|(id, _)| *id)
                    .collect::<Vec<_>>()
            })
            .collect();
        ids.sort();
        ids
    }

    /// All relationships visible at `ts`, ordered by id
    pub fn relationships_at(&self, ts: u64) -> Vec<Relationship> {
        let mut rels: Vec<Relationship> = self
            .rel_shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .values()
                    .filter_map(|c| c.visible_at(ts).cloned())
                    .collect::<Vec<_>>()
            })
            .collect();
        rels.sort_by_key(|r| r.id());
        rels
    }

    pub fn node_count_at(&self, ts: u64) -> usize {
        self.node_shards
            .iter()
            .map(|s| s.read().values().filter(|c| c.visible_at(ts).is_some()).count())
            .sum()
    }

    pub fn relationship_count_at(&self, ts: u64) -> usize {
        self.rel_shards
            .iter()
            .map(|s| s.read().values().filter(|c| c.visible_at(ts).is_some()).count())
            .sum()
    }

    /// Total retained versions across all chains
    pub fn version_count(&self) -> usize {
        let nodes: usize = self.node_shards.iter().map(|s| s.read().values().map(|c| c.len()).sum::<usize>()).sum();
        let rels: usize = self.rel_shards.iter().map(|s| s.read().values().map(|c| c.len()).sum::<usize>()).sum();
        nodes + rels
    }

    /// Visit every node chain, one shard lock at a time
    pub fn visit_node_chains<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &VersionChain<Node>),
    {
        for shard in &self.node_shards {
            let guard = shard.read();
            for (id, chain) in guard.iter() {
                visit(*id, chain);
            }
        }
    }

    /// Drop versions invisible to every snapshot at or after `horizon`
    pub fn vacuum(&self, horizon: u64) -> VacuumStats {
        let mut stats = VacuumStats::default();
        for shard in &self.node_shards {
            stats += Self::vacuum_shard(&mut shard.write(), horizon);
        }
        for shard in &self.rel_shards {
            stats += Self::vacuum_shard(&mut shard.write(), horizon);
        }
        stats
    }

    fn vacuum_shard<K, V>(shard: &mut FxHashMap<K, VersionChain<V>>, horizon: u64) -> VacuumStats
    where
        K: std::hash::Hash + Eq,
    {
        let mut stats = VacuumStats::default();
        shard.retain(|_, chain| {
            stats.versions_pruned += chain.prune(horizon);
            if chain.is_dead(horizon) {
                stats.chains_removed += 1;
                false
            } else {
                true
            }
        });
        stats
    }

    /// Insert a node loaded from a snapshot, keeping its id.
    ///
    /// The id allocator is moved past the restored id.
    pub fn restore_node(&self, node: Node, commit_ts: u64) {
        let id = node.id();
        self.next_node_id.fetch_max(id.as_u64() + 1, Ordering::Relaxed);
        self.publish_node(id, commit_ts, Some(node));
    }

    /// Insert a relationship loaded from a snapshot, keeping its id
    pub fn restore_relationship(&self, rel: Relationship, commit_ts: u64) {
        let id = rel.id();
        self.next_rel_id.fetch_max(id.as_u64() + 1, Ordering::Relaxed);
        self.publish_relationship(id, commit_ts, Some(rel));
    }

    /// Make sure fresh ids start after `node_floor` / `rel_floor`
    pub fn reserve_ids(&self, node_floor: u64, rel_floor: u64) {
        self.next_node_id.fetch_max(node_floor, Ordering::Relaxed);
        self.next_rel_id.fetch_max(rel_floor, Ordering::Relaxed);
    }

    /// Next ids the allocators would hand out
    pub fn id_watermarks(&self) -> (u64, u64) {
        (
            self.next_node_id.load(Ordering::Relaxed),
            self.next_rel_id.load(Ordering::Relaxed),
        )
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(16)
    }
}
