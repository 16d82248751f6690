//! Time-versioned postings shared by schema and legacy indexes
//!
//! Every (value, entity) entry carries the commit intervals during which it
//! was present, so a reader at snapshot `ts` sees exactly the entries that
//! were live at `ts`. Within a value, entities keep the position at which
//! they were first inserted, which gives stable, insertion-ordered results.

use crate::graph::PropertyValue;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::hash::Hash;

/// Half-open presence interval `[added, removed)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub added: u64,
    pub removed: Option<u64>,
}

impl Interval {
    pub fn contains(&self, ts: u64) -> bool {
        self.added <= ts && self.removed.map_or(true, |r| ts < r)
    }

    pub fn is_open(&self) -> bool {
        self.removed.is_none()
    }
}

/// Value -> entity -> presence intervals
#[derive(Debug, Clone)]
pub struct Postings<I> {
    buckets: BTreeMap<PropertyValue, IndexMap<I, Vec<Interval>>>,
}

impl<I> Postings<I>
where
    I: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Open an entry at `ts`. Returns false if it is already present.
    pub fn insert(&mut self, value: PropertyValue, id: I, ts: u64) -> bool {
        let intervals = self.buckets.entry(value).or_default().entry(id).or_default();
        if intervals.last().map_or(false, Interval::is_open) {
            return false;
        }
        intervals.push(Interval { added: ts, removed: None });
        true
    }

    /// Close an entry at `ts`. Returns false if it was not present.
    pub fn remove(&mut self, value: &PropertyValue, id: I, ts: u64) -> bool {
        let open = self
            .buckets
            .get_mut(value)
            .and_then(|ids| ids.get_mut(&id))
            .and_then(|intervals| intervals.last_mut())
            .filter(|interval| interval.is_open());
        match open {
            // An entry added and removed at the same ts leaves an empty interval.
            Some(interval) => {
                interval.removed = Some(ts);
                true
            }
            None => false,
        }
    }

    /// Entities under `value` as of `ts`, in insertion order
    pub fn get(&self, value: &PropertyValue, ts: u64) -> Vec<I> {
        self.buckets
            .get(value)
            .map(|ids| Self::live_at(ids, ts).collect())
            .unwrap_or_default()
    }

    /// Entities currently present under `value` (ignores snapshots)
    pub fn current(&self, value: &PropertyValue) -> Vec<I> {
        self.buckets
            .get(value)
            .map(|ids| {
                ids.iter()
                    .filter(|(_, intervals)| intervals.last().map_or(false, Interval::is_open))
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `id` is currently present under `value`
    pub fn contains_current(&self, value: &PropertyValue, id: I) -> bool {
        self.buckets
            .get(value)
            .and_then(|ids| ids.get(&id))
            .and_then(|intervals| intervals.last())
            .map_or(false, Interval::is_open)
    }

    /// First value currently held by more than one entity
    pub fn first_duplicate(&self) -> Option<(PropertyValue, Vec<I>)> {
        self.buckets.keys().find_map(|value| {
            let holders = self.current(value);
            (holders.len() > 1).then(|| (value.clone(), holders))
        })
    }

    /// Every live (value, entity) pair at `ts` whose value passes `filter`,
    /// ordered by value, then insertion
    pub fn scan<F>(&self, ts: u64, mut filter: F) -> Vec<(PropertyValue, I)>
    where
        F: FnMut(&PropertyValue) -> bool,
    {
        let mut out = Vec::new();
        for (value, ids) in &self.buckets {
            if !filter(value) {
                continue;
            }
            out.extend(Self::live_at(ids, ts).map(|id| (value.clone(), id)));
        }
        out
    }

    fn live_at(ids: &IndexMap<I, Vec<Interval>>, ts: u64) -> impl Iterator<Item = I> + '_ {
        ids.iter()
            .filter(move |(_, intervals)| intervals.iter().any(|i| i.contains(ts)))
            .map(|(id, _)| *id)
    }

    /// Number of currently present entries
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|ids| ids.values())
            .filter(|intervals| intervals.last().map_or(false, Interval::is_open))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any interval, open or closed, is still retained
    pub fn has_history(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// Drop intervals that ended at or before `horizon`.
    ///
    /// Returns the number of intervals removed.
    pub fn vacuum(&mut self, horizon: u64) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, ids| {
            ids.retain(|_, intervals| {
                let before = intervals.len();
                intervals.retain(|i| i.removed.map_or(true, |r| r > horizon));
                removed += before - intervals.len();
                !intervals.is_empty()
            });
            !ids.is_empty()
        });
        removed
    }
}

impl<I> Default for Postings<I>
where
    I: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
