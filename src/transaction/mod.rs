//! Transactions
//!
//! A [`Transaction`] reads committed state as of its start timestamp overlaid
//! with its own staged writes. Nothing it does is visible to anyone else until
//! [`Transaction::commit`] publishes the whole batch under the commit
//! sequencer. Write conflicts are detected optimistically at commit.

mod commit;
pub mod index_handle;
pub mod manager;
pub mod pending;
pub mod tx;

pub use index_handle::{LegacyIndexHandle, StagedEntity};
pub use manager::TransactionManager;
pub use pending::PendingWrites;
pub use tx::Transaction;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Transaction lifecycle state
///
/// `Active -> Committing -> Committed`, or `Active -> RollingBack -> RolledBack`.
/// A commit that fails validation ends in `RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxState {
    Active,
    Committing,
    Committed,
    RollingBack,
    RolledBack,
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Committed | TxState::RolledBack)
    }
}
