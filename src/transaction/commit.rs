//! Commit path
//!
//! Runs entirely under the commit sequencer: conflict detection, constraint
//! validation, then publication of node and relationship versions, schema
//! index postings and legacy index entries, all at one commit timestamp. The
//! timestamp becomes visible to new transactions only after everything has
//! been published. Lifecycle events go out before the sequencer is released.

use super::pending::PendingWrites;
use crate::database::DatabaseInner;
use crate::error::{ConstraintViolation, GraphError, GraphResult};
use crate::graph::{EntityId, LifecycleEvent, Node, NodeId, PropertyValue, Relationship};
use crate::index::{IndexState, IndexedEntity, LegacyOp, PropertyIndex};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct CommitOutcome {
    pub commit_ts: u64,
    /// Total commits after this one; `None` for a commit with nothing to write
    pub commit_count: Option<u64>,
    /// Lifecycle events already delivered to subscribers
    pub event_count: usize,
}

/// One node's entry moving within a schema index
struct IndexChange {
    node: NodeId,
    old: Option<PropertyValue>,
    new: Option<PropertyValue>,
}

pub(crate) fn commit(db: &DatabaseInner, start_ts: u64, pending: PendingWrites) -> GraphResult<CommitOutcome> {
    if pending.is_empty() {
        return Ok(CommitOutcome {
            commit_ts: start_ts,
            commit_count: None,
            event_count: 0,
        });
    }

    let sequencer = db.transactions.lock_commits();
    // `close` may have won the race for the sequencer.
    db.ensure_open()?;
    check_conflicts(db, start_ts, &pending)?;
    let commit_ts = db.transactions.next_commit_ts(&sequencer);

    // (id, latest committed, new version)
    let nodes: Vec<(NodeId, Option<Node>, Option<Node>)> = pending
        .nodes
        .iter()
        .filter(|(id, record)| record.is_some() || !pending.created_nodes.contains(*id))
        .map(|(id, record)| {
            let new = record.as_ref().map(|record| {
                Node::new(
                    record.clone(),
                    pending.node_props.properties(*id).cloned().unwrap_or_default(),
                )
            });
            (*id, db.store.latest_node(*id), new)
        })
        .collect();

    let changes = index_changes(&db.schema.all(), &nodes);

    // Indexes still populating hold their intent; wait for them.
    let intents: Vec<_> = changes.iter().map(|(index, _)| index.write_intent()).collect();
    let changes: Vec<&(Arc<PropertyIndex>, Vec<IndexChange>)> = changes
        .iter()
        .filter(|(index, _)| index.state() == IndexState::Online)
        .collect();

    for (index, diff) in changes.iter().map(|c| (&c.0, &c.1)) {
        if index.is_unique() {
            check_unique(index, diff)?;
        }
    }

    // Publish
    let mut events = Vec::new();
    for (id, old, new) in nodes {
        match (&new, pending.created_nodes.contains(&id)) {
            (Some(node), true) => events.push(LifecycleEvent::NodeCreated {
                id,
                labels: node.labels().cloned().collect(),
                commit_ts,
            }),
            (None, _) => events.push(LifecycleEvent::NodeDeleted {
                id,
                labels: old.map(|n| n.labels().cloned().collect()).unwrap_or_default(),
                commit_ts,
            }),
            _ => {}
        }
        db.store.publish_node(id, commit_ts, new);
    }

    for (id, record) in &pending.relationships {
        let created = pending.created_rels.contains(id);
        match record {
            Some(record) => {
                if created {
                    events.push(LifecycleEvent::RelationshipCreated {
                        id: *id,
                        source: record.source,
                        target: record.target,
                        rel_type: record.rel_type.clone(),
                        commit_ts,
                    });
                }
                let properties = pending.rel_props.properties(*id).cloned().unwrap_or_default();
                db.store
                    .publish_relationship(*id, commit_ts, Some(Relationship::new(record.clone(), properties)));
            }
            None if !created => {
                events.push(LifecycleEvent::RelationshipDeleted { id: *id, commit_ts });
                db.store.publish_relationship(*id, commit_ts, None);
            }
            None => {}
        }
    }

    for (index, diff) in changes.iter().map(|c| (&c.0, &c.1)) {
        for change in diff {
            if let Some(old) = &change.old {
                index.remove(old, change.node, commit_ts);
            }
            if let Some(new) = &change.new {
                index.insert(new.clone(), change.node, commit_ts);
            }
        }
    }

    apply_legacy(db, &pending.node_index_ops, commit_ts);
    apply_legacy(db, &pending.rel_index_ops, commit_ts);

    let commit_count = db.transactions.publish(commit_ts, &sequencer);
    drop(intents);
    // Under the sequencer: subscribers see commits in timestamp order, never
    // after `Shutdown`.
    let event_count = events.len();
    db.events.publish_all(events);
    drop(sequencer);

    debug!(
        "published commit {}: {} nodes, {} relationships, {} index ops",
        commit_ts,
        pending.nodes.len(),
        pending.relationships.len(),
        pending.node_index_ops.len() + pending.rel_index_ops.len()
    );
    Ok(CommitOutcome {
        commit_ts,
        commit_count: Some(commit_count),
        event_count,
    })
}

/// Fail if anything this transaction wrote was committed by someone else
/// after it started
fn check_conflicts(db: &DatabaseInner, start_ts: u64, pending: &PendingWrites) -> GraphResult<()> {
    for entity in pending.write_set() {
        let latest = match entity {
            EntityId::Node(id) => db.store.node_latest_commit(id),
            EntityId::Relationship(id) => db.store.relationship_latest_commit(id),
        };
        if let Some(committed_at) = latest {
            if committed_at > start_ts {
                return Err(GraphError::Conflict {
                    entity,
                    committed_at,
                    started_at: start_ts,
                });
            }
        }
    }
    Ok(())
}

/// Per-index entry moves implied by the new node versions
fn index_changes(
    indexes: &[Arc<PropertyIndex>],
    nodes: &[(NodeId, Option<Node>, Option<Node>)],
) -> Vec<(Arc<PropertyIndex>, Vec<IndexChange>)> {
    indexes
        .iter()
        .filter_map(|index| {
            let diff: Vec<IndexChange> = nodes
                .iter()
                .filter_map(|(id, old, new)| {
                    let before = old.as_ref().and_then(|n| index.indexed_value(&n.record, &n.properties));
                    let after = new.as_ref().and_then(|n| index.indexed_value(&n.record, &n.properties));
                    (before != after).then(|| IndexChange {
                        node: *id,
                        old: before.cloned(),
                        new: after.cloned(),
                    })
                })
                .collect();
            (!diff.is_empty()).then(|| (Arc::clone(index), diff))
        })
        .collect()
}

/// No two nodes may hold the same value once `diff` is applied
fn check_unique(index: &PropertyIndex, diff: &[IndexChange]) -> GraphResult<()> {
    let mut claimed: FxHashMap<&PropertyValue, NodeId> = FxHashMap::default();
    for change in diff {
        let Some(value) = &change.new else { continue };
        let clash = claimed.insert(value, change.node).or_else(|| {
            index
                .current(value)
                .into_iter()
                .find(|holder| *holder != change.node && !diff.iter().any(|c| c.node == *holder))
        });
        if let Some(existing) = clash {
            return Err(ConstraintViolation::UniqueValue {
                label: index.label().clone(),
                property: index.property().to_string(),
                value: value.clone(),
                existing,
            }
            .into());
        }
    }
    Ok(())
}

fn apply_legacy<I: IndexedEntity>(db: &DatabaseInner, ops: &[LegacyOp<I>], ts: u64) {
    for op in ops {
        match db.legacy.existing::<I>(op.index()) {
            Some(index) => {
                index.apply(op, ts);
            }
            None => warn!(
                "{} index {:?} was deleted before commit; dropping staged entry",
                I::KIND,
                op.index()
            ),
        }
    }
}
