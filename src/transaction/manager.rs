//! Transaction bookkeeping
//!
//! Hands out transaction ids and start timestamps, tracks which snapshots are
//! still in use, and sequences commits. The commit clock only moves forward,
//! and a commit timestamp becomes visible to new transactions only after the
//! whole commit has been published.

use super::TxId;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct TransactionManager {
    next_tx_id: AtomicU64,

    /// Timestamp of the last fully published commit
    visible_ts: AtomicU64,

    /// Serialises commits
    commit_lock: Mutex<()>,

    /// Active transactions and their start timestamps
    active: Mutex<BTreeMap<TxId, u64>>,

    /// Commits published since startup
    commit_count: AtomicU64,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_tx_id: AtomicU64::new(1),
            visible_ts: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
            active: Mutex::new(BTreeMap::new()),
            commit_count: AtomicU64::new(0),
        }
    }

    /// Register a new transaction, returning its id and snapshot timestamp
    pub fn begin(&self) -> (TxId, u64) {
        let id = TxId(self.next_tx_id.fetch_add(1, Ordering::Relaxed));
        let mut active = self.active.lock();
        let start_ts = self.visible_ts.load(Ordering::Acquire);
        active.insert(id, start_ts);
        (id, start_ts)
    }

    /// Forget a finished transaction
    pub fn end(&self, id: TxId) {
        self.active.lock().remove(&id);
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Oldest snapshot any active transaction may still read.
    ///
    /// With no active transactions this is the last published commit.
    pub fn oldest_snapshot(&self) -> u64 {
        let active = self.active.lock();
        let visible = self.visible_ts.load(Ordering::Acquire);
        active.values().copied().min().unwrap_or(visible)
    }

    pub fn last_committed(&self) -> u64 {
        self.visible_ts.load(Ordering::Acquire)
    }

    /// Take the commit sequencer
    pub fn lock_commits(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock()
    }

    /// Timestamp for the commit holding the sequencer
    pub fn next_commit_ts(&self, _sequencer: &MutexGuard<'_, ()>) -> u64 {
        self.visible_ts.load(Ordering::Acquire) + 1
    }

    /// Make `ts` visible to new transactions. Returns the total commit count.
    pub fn publish(&self, ts: u64, _sequencer: &MutexGuard<'_, ()>) -> u64 {
        self.visible_ts.store(ts, Ordering::Release);
        self.commit_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count.load(Ordering::Relaxed)
    }

    /// Move the clock forward to `ts` (snapshot restore)
    pub fn restore_clock(&self, ts: u64) {
        self.visible_ts.fetch_max(ts, Ordering::AcqRel);
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_registers_snapshot() {
        let manager = TransactionManager::new();
        let (a, ts_a) = manager.begin();
        let (b, _) = manager.begin();
        assert_ne!(a, b);
        assert_eq!(ts_a, 0);
        assert_eq!(manager.active_count(), 2);

        manager.end(a);
        manager.end(b);
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_commit_clock() {
        let manager = TransactionManager::new();
        let (reader, start) = manager.begin();

        {
            let guard = manager.lock_commits();
            let ts = manager.next_commit_ts(&guard);
            assert_eq!(ts, 1);
            assert_eq!(manager.publish(ts, &guard), 1);
        }

        assert_eq!(manager.last_committed(), 1);
        assert_eq!(manager.oldest_snapshot(), start);
        manager.end(reader);
        assert_eq!(manager.oldest_snapshot(), 1);

        let (_, later) = manager.begin();
        assert_eq!(later, 1);
    }

    #[test]
    fn test_restore_clock_never_goes_back() {
        let manager = TransactionManager::new();
        manager.restore_clock(10);
        manager.restore_clock(3);
        assert_eq!(manager.last_committed(), 10);
    }
}
