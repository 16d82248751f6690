//! Schema index administration
//!
//! Index DDL is not transactional: an index exists from the moment
//! [`Schema::create_index`] registers it until [`Schema::drop_index`] removes
//! it, regardless of which transactions are open.

use crate::database::DatabaseInner;
use crate::error::{ConstraintViolation, GraphResult};
use crate::graph::{Label, LifecycleEvent};
use crate::index::{IndexDefinition, IndexState};
use tracing::{debug, info, warn};

/// Handle for creating, dropping and listing schema indexes
#[derive(Debug, Clone, Copy)]
pub struct Schema<'db> {
    db: &'db DatabaseInner,
}

impl<'db> Schema<'db> {
    pub(crate) fn new(db: &'db DatabaseInner) -> Self {
        Self { db }
    }

    /// Create an index on (label, property) and populate it from committed
    /// nodes.
    ///
    /// Returns once the index is online. Commits that change the index while
    /// it is populating wait for population to finish.
    pub fn create_index(&self, label: impl Into<Label>, property: impl Into<String>) -> GraphResult<IndexDefinition> {
        self.build(label.into(), property.into(), false)
    }

    /// Create a unique index on (label, property).
    ///
    /// Fails with a constraint error if committed nodes already share a value.
    pub fn create_unique_constraint(
        &self,
        label: impl Into<Label>,
        property: impl Into<String>,
    ) -> GraphResult<IndexDefinition> {
        self.build(label.into(), property.into(), true)
    }

    fn build(&self, label: Label, property: String, unique: bool) -> GraphResult<IndexDefinition> {
        self.db.ensure_open()?;

        // Register and claim the write intent while no commit is running, so
        // every commit after `as_of` sees the index and queues behind us.
        let sequencer = self.db.transactions.lock_commits();
        let index = self.db.schema.register(label, property, unique)?;
        let intent = index.write_intent();
        let as_of = self.db.transactions.last_committed();
        drop(sequencer);

        let indexed = index.populate(&self.db.store, as_of);

        if unique {
            if let Some((value, holders)) = index.first_duplicate() {
                // Never marked online, so queued commits skip it.
                if let Err(e) = self.db.schema.drop_index(index.label(), index.property()) {
                    debug!("rejected unique index already gone: {}", e);
                }
                drop(intent);
                warn!(
                    "unique constraint on :{}({}) rejected: value {} is shared by {} nodes",
                    index.label(),
                    index.property(),
                    value,
                    holders.len()
                );
                return Err(ConstraintViolation::UniqueValue {
                    label: index.label().clone(),
                    property: index.property().to_string(),
                    value,
                    existing: holders[0],
                }
                .into());
            }
        }

        index.mark_online();
        drop(intent);

        info!(
            "created {}index on :{}({}) with {} entries as of ts {}",
            if unique { "unique " } else { "" },
            index.label(),
            index.property(),
            indexed,
            as_of
        );
        self.db.events.publish(LifecycleEvent::IndexCreated {
            label: index.label().clone(),
            property: index.property().to_string(),
        });
        Ok(index.definition())
    }

    /// Drop an index. Lookups through it fail afterwards.
    pub fn drop_index(&self, label: impl Into<Label>, property: &str) -> GraphResult<()> {
        self.db.ensure_open()?;
        let label = label.into();
        let index = self.db.schema.drop_index(&label, property)?;
        info!("dropped index on :{}({})", index.label(), index.property());
        self.db.events.publish(LifecycleEvent::IndexDropped {
            label,
            property: property.to_string(),
        });
        Ok(())
    }

    pub fn has_index(&self, label: impl Into<Label>, property: &str) -> bool {
        self.db.schema.has_index(&label.into(), property)
    }

    /// Indexes on `label`, ordered by property
    pub fn get_indexes(&self, label: impl Into<Label>) -> Vec<IndexDefinition> {
        self.db
            .schema
            .for_label(&label.into())
            .iter()
            .map(|index| index.definition())
            .collect()
    }

    /// All schema indexes, ordered by (label, property)
    pub fn indexes(&self) -> Vec<IndexDefinition> {
        self.db.schema.definitions()
    }

    pub fn index_state(&self, label: impl Into<Label>, property: &str) -> GraphResult<IndexState> {
        Ok(self.db.schema.require(&label.into(), property)?.state())
    }

    /// Block until the index has finished populating
    pub fn await_index(&self, label: impl Into<Label>, property: &str) -> GraphResult<()> {
        self.db.schema.require(&label.into(), property)?.await_online();
        Ok(())
    }
}
