//! Named, manually maintained indexes
//!
//! A legacy index maps (key, value) pairs to entity ids and is populated only
//! through explicit add/remove calls. It is never synchronised with property
//! changes: an entry outlives the property it was derived from, and even the
//! entity itself, until it is removed.

use super::postings::Postings;
use super::property_index::IndexDefinition;
use crate::graph::{EntityKind, NodeId, PropertyValue, RelationshipId};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

type Registry<I> = RwLock<BTreeMap<String, Arc<LegacyIndex<I>>>>;

/// Entity ids that can be stored in a legacy index
pub trait IndexedEntity: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    fn registry(manager: &LegacyIndexManager) -> &Registry<Self>;
}

impl IndexedEntity for NodeId {
    const KIND: EntityKind = EntityKind::Node;

    fn registry(manager: &LegacyIndexManager) -> &Registry<Self> {
        &manager.node_indexes
    }
}

impl IndexedEntity for RelationshipId {
    const KIND: EntityKind = EntityKind::Relationship;

    fn registry(manager: &LegacyIndexManager) -> &Registry<Self> {
        &manager.rel_indexes
    }
}

/// A staged legacy index mutation
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyOp<I> {
    Add {
        index: String,
        entity: I,
        key: String,
        value: PropertyValue,
    },
    Remove {
        index: String,
        entity: I,
        key: String,
        value: PropertyValue,
    },
}

impl<I: Copy> LegacyOp<I> {
    pub fn index(&self) -> &str {
        match self {
            LegacyOp::Add { index, .. } | LegacyOp::Remove { index, .. } => index,
        }
    }

    pub fn entity(&self) -> I {
        match self {
            LegacyOp::Add { entity, .. } | LegacyOp::Remove { entity, .. } => *entity,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            LegacyOp::Add { key, .. } | LegacyOp::Remove { key, .. } => key,
        }
    }

    pub fn value(&self) -> &PropertyValue {
        match self {
            LegacyOp::Add { value, .. } | LegacyOp::Remove { value, .. } => value,
        }
    }
}

/// Value pattern for [`LegacyIndex::query`]
#[derive(Debug, Clone)]
pub enum QueryPattern {
    /// `*`: every value of the key
    All,
    /// Glob with `*` and `?`, matched against string values
    Glob(Regex),
    /// Literal value, compared against strings as-is and other values by
    /// their textual form
    Exact(String),
}

impl QueryPattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            return QueryPattern::All;
        }
        if !pattern.contains(|c: char| c == '*' || c == '?') {
            return QueryPattern::Exact(pattern.to_string());
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        match Regex::new(&expr) {
            Ok(re) => QueryPattern::Glob(re),
            Err(e) => {
                tracing::warn!("invalid index pattern {:?}: {}; matching literally", pattern, e);
                QueryPattern::Exact(pattern.to_string())
            }
        }
    }

    pub fn matches(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (QueryPattern::All, _) => true,
            (QueryPattern::Glob(re), PropertyValue::String(s)) => re.is_match(s),
            (QueryPattern::Glob(_), _) => false,
            (QueryPattern::Exact(p), PropertyValue::String(s)) => p == s,
            (QueryPattern::Exact(p), other) => *p == other.to_string(),
        }
    }
}

/// One named legacy index
#[derive(Debug)]
pub struct LegacyIndex<I> {
    name: String,
    entries: RwLock<BTreeMap<String, Postings<I>>>,
}

impl<I: IndexedEntity> LegacyIndex<I> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> IndexDefinition {
        IndexDefinition::Legacy {
            name: self.name.clone(),
            entity: I::KIND,
        }
    }

    /// Entities stored under exactly (key, value) as of `ts`
    pub fn get(&self, key: &str, value: &PropertyValue, ts: u64) -> Vec<I> {
        self.entries
            .read()
            .get(key)
            .map(|postings| postings.get(value, ts))
            .unwrap_or_default()
    }

    /// (value, entity) pairs under `key` whose value matches `pattern`
    pub fn query(&self, key: &str, pattern: &QueryPattern, ts: u64) -> Vec<(PropertyValue, I)> {
        self.entries
            .read()
            .get(key)
            .map(|postings| postings.scan(ts, |v| pattern.matches(v)))
            .unwrap_or_default()
    }

    /// Every (key, value) under which `entity` is stored as of `ts`
    pub fn entries_of(&self, entity: I, ts: u64) -> Vec<(String, PropertyValue)> {
        let entries = self.entries.read();
        let mut out = Vec::new();
        for (key, postings) in entries.iter() {
            for (value, id) in postings.scan(ts, |_| true) {
                if id == entity {
                    out.push((key.clone(), value));
                }
            }
        }
        out
    }

    /// Every (key, value, entity) entry as of `ts`
    pub fn all_entries(&self, ts: u64) -> Vec<(String, PropertyValue, I)> {
        let entries = self.entries.read();
        entries
            .iter()
            .flat_map(|(key, postings)| {
                postings
                    .scan(ts, |_| true)
                    .into_iter()
                    .map(move |(value, id)| (key.clone(), value, id))
            })
            .collect()
    }

    /// Publish a committed operation at `ts`
    pub fn apply(&self, op: &LegacyOp<I>, ts: u64) -> bool {
        let mut entries = self.entries.write();
        match op {
            LegacyOp::Add { entity, key, value, .. } => {
                entries.entry(key.clone()).or_default().insert(value.clone(), *entity, ts)
            }
            LegacyOp::Remove { entity, key, value, .. } => entries
                .get_mut(key)
                .map_or(false, |postings| postings.remove(value, *entity, ts)),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vacuum(&self, horizon: u64) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.values_mut().map(|p| p.vacuum(horizon)).sum();
        entries.retain(|_, postings| postings.has_history());
        removed
    }
}

/// Registry of named node and relationship indexes
#[derive(Debug, Default)]
pub struct LegacyIndexManager {
    node_indexes: Registry<NodeId>,
    rel_indexes: Registry<RelationshipId>,
}

impl LegacyIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the named index, creating it on first use
    pub fn index<I: IndexedEntity>(&self, name: &str) -> Arc<LegacyIndex<I>> {
        if let Some(index) = I::registry(self).read().get(name) {
            return Arc::clone(index);
        }
        let mut registry = I::registry(self).write();
        let index = registry.entry(name.to_string()).or_insert_with(|| {
            tracing::info!("created {} index {:?}", I::KIND, name);
            Arc::new(LegacyIndex::new(name))
        });
        Arc::clone(index)
    }

    /// Get the named index without creating it
    pub fn existing<I: IndexedEntity>(&self, name: &str) -> Option<Arc<LegacyIndex<I>>> {
        I::registry(self).read().get(name).cloned()
    }

    pub fn for_nodes(&self, name: &str) -> Arc<LegacyIndex<NodeId>> {
        self.index(name)
    }

    pub fn for_relationships(&self, name: &str) -> Arc<LegacyIndex<RelationshipId>> {
        self.index(name)
    }

    pub fn exists_for_nodes(&self, name: &str) -> bool {
        self.node_indexes.read().contains_key(name)
    }

    pub fn exists_for_relationships(&self, name: &str) -> bool {
        self.rel_indexes.read().contains_key(name)
    }

    pub fn node_index_names(&self) -> Vec<String> {
        self.node_indexes.read().keys().cloned().collect()
    }

    pub fn relationship_index_names(&self) -> Vec<String> {
        self.rel_indexes.read().keys().cloned().collect()
    }

    /// Remove a named index and all its entries
    pub fn delete_index<I: IndexedEntity>(&self, name: &str) -> bool {
        let removed = I::registry(self).write().remove(name).is_some();
        if removed {
            tracing::info!("deleted {} index {:?}", I::KIND, name);
        }
        removed
    }

    pub fn definitions(&self) -> Vec<IndexDefinition> {
        let nodes = self.node_indexes.read();
        let rels = self.rel_indexes.read();
        nodes
            .values()
            .map(|i| i.definition())
            .chain(rels.values().map(|i| i.definition()))
            .collect()
    }

    pub fn vacuum(&self, horizon: u64) -> usize {
        let nodes: usize = self.node_indexes.read().values().map(|i| i.vacuum(horizon)).sum();
        let rels: usize = self.rel_indexes.read().values().map(|i| i.vacuum(horizon)).sum();
        nodes + rels
    }
}

/// Keep the first occurrence of each entity, preserving order
pub fn dedup_entities<I: IndexedEntity>(hits: impl IntoIterator<Item = I>) -> Vec<I> {
    let mut seen = HashSet::new();
    hits.into_iter().filter(|id| seen.insert(*id)).collect()
}
