//! Schema index over one (label, property) pair
//!
//! Holds value -> node postings with commit intervals. Content is derived from
//! committed node versions only: the commit path feeds it diffs, and
//! [`PropertyIndex::populate`] rebuilds it from retained version history.

use super::postings::Postings;
use crate::graph::{EntityKind, GraphStore, Label, NodeId, NodeRecord, PropertyMap, PropertyValue};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Key for identifying a schema index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyIndexKey {
    pub label: Label,
    pub property: String,
}

impl PropertyIndexKey {
    pub fn new(label: impl Into<Label>, property: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            property: property.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    Populating,
    Online,
}

/// Description of an index, schema-backed or legacy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexDefinition {
    Schema {
        label: Label,
        property: String,
        unique: bool,
        state: IndexState,
    },
    Legacy {
        name: String,
        entity: EntityKind,
    },
}

impl IndexDefinition {
    pub fn is_schema(&self) -> bool {
        matches!(self, IndexDefinition::Schema { .. })
    }

    pub fn label(&self) -> Option<&Label> {
        match self {
            IndexDefinition::Schema { label, .. } => Some(label),
            IndexDefinition::Legacy { .. } => None,
        }
    }
}

/// Index for a specific property on a specific label
#[derive(Debug)]
pub struct PropertyIndex {
    key: PropertyIndexKey,
    unique: bool,
    postings: RwLock<Postings<NodeId>>,

    /// Held while the index is being populated; commits that change this
    /// index's content queue on it.
    write_intent: Mutex<()>,
    online: AtomicBool,
}

impl PropertyIndex {
    pub fn new(key: PropertyIndexKey, unique: bool) -> Self {
        Self {
            key,
            unique,
            postings: RwLock::new(Postings::new()),
            write_intent: Mutex::new(()),
            online: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &PropertyIndexKey {
        &self.key
    }

    pub fn label(&self) -> &Label {
        &self.key.label
    }

    pub fn property(&self) -> &str {
        &self.key.property
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn state(&self) -> IndexState {
        if self.online.load(Ordering::Acquire) {
            IndexState::Online
        } else {
            IndexState::Populating
        }
    }

    pub fn definition(&self) -> IndexDefinition {
        IndexDefinition::Schema {
            label: self.key.label.clone(),
            property: self.key.property.clone(),
            unique: self.unique,
            state: self.state(),
        }
    }

    /// The value this index would hold for a node in the given state
    pub fn indexed_value<'a>(&self, record: &NodeRecord, properties: &'a PropertyMap) -> Option<&'a PropertyValue> {
        if record.has_label(&self.key.label) {
            properties.get(&self.key.property)
        } else {
            None
        }
    }

    /// Block commits that would change this index until the guard drops
    pub fn write_intent(&self) -> MutexGuard<'_, ()> {
        self.write_intent.lock()
    }

    /// Wait for an in-flight population to finish
    pub fn await_online(&self) {
        if self.state() == IndexState::Populating {
            drop(self.write_intent.lock());
        }
    }

    pub(crate) fn mark_online(&self) {
        self.online.store(true, Ordering::Release);
    }

    /// Nodes holding `value` as of snapshot `ts`
    pub fn get(&self, value: &PropertyValue, ts: u64) -> Vec<NodeId> {
        self.postings.read().get(value, ts)
    }

    /// Nodes holding `value` in the latest committed state
    pub fn current(&self, value: &PropertyValue) -> Vec<NodeId> {
        self.postings.read().current(value)
    }

    pub fn insert(&self, value: PropertyValue, node_id: NodeId, ts: u64) -> bool {
        self.postings.write().insert(value, node_id, ts)
    }

    pub fn remove(&self, value: &PropertyValue, node_id: NodeId, ts: u64) -> bool {
        self.postings.write().remove(value, node_id, ts)
    }

    /// A value currently shared by several nodes, if any
    pub fn first_duplicate(&self) -> Option<(PropertyValue, Vec<NodeId>)> {
        self.postings.read().first_duplicate()
    }

    /// Number of nodes currently indexed
    pub fn len(&self) -> usize {
        self.postings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vacuum(&self, horizon: u64) -> usize {
        self.postings.write().vacuum(horizon)
    }

    /// Rebuild postings from every retained node version committed at or
    /// before `as_of`.
    ///
    /// Entries are inserted in commit order, node id breaking ties, so that
    /// older snapshots see the same content they would have seen had the
    /// index existed all along. Returns the number of nodes currently indexed.
    pub fn populate(&self, store: &GraphStore, as_of: u64) -> usize {
        let mut transitions: Vec<(u64, NodeId, Option<PropertyValue>)> = Vec::new();

        store.visit_node_chains(|id, chain| {
            let mut current: Option<&PropertyValue> = None;
            for version in chain.versions().iter().take_while(|v| v.commit_ts <= as_of) {
                let entry = version
                    .value
                    .as_ref()
                    .and_then(|node| self.indexed_value(&node.record, &node.properties));
                if entry != current {
                    transitions.push((version.commit_ts, id, entry.cloned()));
                    current = entry;
                }
            }
        });
        transitions.sort_by_key(|(ts, id, _)| (*ts, *id));

        let mut postings = self.postings.write();
        let mut live: FxHashMap<NodeId, PropertyValue> = FxHashMap::default();
        for (ts, id, entry) in transitions {
            if let Some(old) = live.remove(&id) {
                postings.remove(&old, id, ts);
            }
            if let Some(value) = entry {
                postings.insert(value.clone(), id, ts);
                live.insert(id, value);
            }
        }
        live.len()
    }
}
