//! Multi-version records for snapshot reads
//!
//! Each entity keeps an append-only chain of versions ordered by commit
//! timestamp. A reader at snapshot `ts` sees the newest version whose commit
//! timestamp is `<= ts`. Deletion appends a tombstone (`value == None`).

/// One committed version of an entity
#[derive(Debug, Clone)]
pub struct Version<T> {
    pub commit_ts: u64,
    pub value: Option<T>,
}

/// Versions of a single entity, oldest first
#[derive(Debug, Clone)]
pub struct VersionChain<T> {
    versions: Vec<Version<T>>,
}

impl<T> VersionChain<T> {
    pub fn new() -> Self {
        Self { versions: Vec::new() }
    }

    /// Append a version. Commit timestamps must be non-decreasing.
    pub fn push(&mut self, commit_ts: u64, value: Option<T>) {
        debug_assert!(self.versions.last().map_or(true, |v| v.commit_ts <= commit_ts));
        self.versions.push(Version { commit_ts, value });
    }

    /// The value visible to a snapshot taken at `ts`
    pub fn visible_at(&self, ts: u64) -> Option<&T> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.commit_ts <= ts)
            .and_then(|v| v.value.as_ref())
    }

    /// The newest committed value, if not deleted
    pub fn latest(&self) -> Option<&T> {
        self.versions.last().and_then(|v| v.value.as_ref())
    }

    /// Commit timestamp of the newest version
    pub fn latest_commit(&self) -> u64 {
        self.versions.last().map_or(0, |v| v.commit_ts)
    }

    pub fn versions(&self) -> &[Version<T>] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Drop versions no snapshot at or after `horizon` can observe.
    ///
    /// Keeps the newest version with `commit_ts <= horizon` and everything
    /// after it. Returns the number of versions removed.
    pub fn prune(&mut self, horizon: u64) -> usize {
        let keep_from = match self.versions.iter().rposition(|v| v.commit_ts <= horizon) {
            Some(pos) => pos,
            None => return 0,
        };
        self.versions.drain(..keep_from);
        keep_from
    }

    /// True once the chain is a single tombstone older than `horizon`
    pub fn is_dead(&self, horizon: u64) -> bool {
        match self.versions.as_slice() {
            [only] => only.value.is_none() && only.commit_ts <= horizon,
            _ => false,
        }
    }
}

impl<T> Default for VersionChain<T> {
    fn default() -> Self {
        Self::new()
    }
}
