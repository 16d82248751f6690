//! Error types for the graph engine
//!
//! Every public operation returns [`GraphResult`]. Errors are handed back to
//! the immediate caller and never abort the surrounding transaction on their
//! own; the caller decides between rollback and retry.

use crate::config::ConfigError;
use crate::graph::{EntityId, Label, NodeId, PropertyValue, RelationshipId};
use crate::persistence::PersistenceError;
use crate::transaction::{TxId, TxState};
use thiserror::Error;

/// Structural invariants that a write would break
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    #[error("node {node} still has {count} relationship(s); delete them first")]
    NodeHasRelationships { node: NodeId, count: usize },

    #[error("node {existing} already has :{label}({property}) = {value}")]
    UniqueValue {
        label: Label,
        property: String,
        value: PropertyValue,
        existing: NodeId,
    },

    #[error("index on :{label}({property}) already exists")]
    IndexAlreadyExists { label: Label, property: String },

    #[error("expected at most one result, found {count}")]
    NotSingle { count: usize },
}

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Relationship {0} not found")]
    RelationshipNotFound(RelationshipId),

    /// Dropping or describing an index that does not exist
    #[error("No index on :{label}({property})")]
    IndexNotFound { label: Label, property: String },

    /// Querying through an index that was never created or has been dropped
    #[error("Index on :{label}({property}) is missing")]
    IndexMissing { label: Label, property: String },

    #[error("Constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),

    #[error("Write conflict on {entity}: committed at {committed_at}, after transaction start {started_at}")]
    Conflict {
        entity: EntityId,
        committed_at: u64,
        started_at: u64,
    },

    #[error("Transaction {tx_id} is not active (state: {state:?})")]
    TransactionNotActive { tx_id: TxId, state: TxState },

    #[error("Database is closed")]
    DatabaseClosed,

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of [`GraphError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Constraint,
    Conflict,
    IndexMissing,
    State,
    Persistence,
    Config,
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::NodeNotFound(_)
            | GraphError::RelationshipNotFound(_)
            | GraphError::IndexNotFound { .. } => ErrorKind::NotFound,
            GraphError::IndexMissing { .. } => ErrorKind::IndexMissing,
            GraphError::Constraint(_) => ErrorKind::Constraint,
            GraphError::Conflict { .. } => ErrorKind::Conflict,
            GraphError::TransactionNotActive { .. } | GraphError::DatabaseClosed => ErrorKind::State,
            GraphError::Persistence(_) => ErrorKind::Persistence,
            GraphError::Config(_) => ErrorKind::Config,
        }
    }

    /// Only write conflicts are worth retrying, and only as a whole new transaction
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(GraphError::NodeNotFound(NodeId::new(1)).kind(), ErrorKind::NotFound);
        assert_eq!(
            GraphError::IndexMissing {
                label: Label::new("User"),
                property: "username".into()
            }
            .kind(),
            ErrorKind::IndexMissing
        );
        assert_eq!(GraphError::DatabaseClosed.kind(), ErrorKind::State);
    }

    #[test]
    fn test_only_conflicts_retry() {
        let conflict = GraphError::Conflict {
            entity: NodeId::new(1).into(),
            committed_at: 5,
            started_at: 3,
        };
        assert!(conflict.is_retryable());

        let constraint: GraphError = ConstraintViolation::NotSingle { count: 2 }.into();
        assert!(!constraint.is_retryable());
    }

    #[test]
    fn test_constraint_message() {
        let err: GraphError = ConstraintViolation::NodeHasRelationships {
            node: NodeId::new(4),
            count: 1,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Constraint violation: node NodeId(4) still has 1 relationship(s); delete them first"
        );
    }
}
