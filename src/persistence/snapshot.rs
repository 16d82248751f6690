//! Whole-database snapshot files
//!
//! A snapshot is the committed state as of one commit timestamp: nodes,
//! relationships, schema index definitions and legacy index entries. It is
//! bincode-encoded, gzip-compressed, and written through a temporary file
//! that is renamed into place.

use crate::graph::{Label, Node, NodeId, PropertyValue, Relationship, RelationshipId};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("No snapshot path configured")]
    NoSnapshotPath,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Schema index to rebuild on load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIndexEntry {
    pub label: Label,
    pub property: String,
    pub unique: bool,
}

/// Entries of one legacy index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyIndexSnapshot<I> {
    pub name: String,
    pub entries: Vec<(String, PropertyValue, I)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    /// Wall-clock time the snapshot was taken (Unix milliseconds)
    pub created_at: i64,
    /// Commit timestamp the snapshot reflects
    pub commit_ts: u64,
    pub next_node_id: u64,
    pub next_relationship_id: u64,
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub schema_indexes: Vec<SchemaIndexEntry>,
    pub node_indexes: Vec<LegacyIndexSnapshot<NodeId>>,
    pub relationship_indexes: Vec<LegacyIndexSnapshot<RelationshipId>>,
}

impl Snapshot {
    pub fn new(commit_ts: u64) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: chrono::Utc::now().timestamp_millis(),
            commit_ts,
            next_node_id: 1,
            next_relationship_id: 1,
            nodes: Vec::new(),
            relationships: Vec::new(),
            schema_indexes: Vec::new(),
            node_indexes: Vec::new(),
            relationship_indexes: Vec::new(),
        }
    }

    /// Write the snapshot to `path`, replacing any previous file
    pub fn write_to(&self, path: impl AsRef<Path>) -> PersistenceResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = temp_path(path);
        {
            let file = File::create(&tmp)?;
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            bincode::serialize_into(&mut encoder, self)?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;

        debug!(
            "wrote snapshot at ts {} ({} nodes, {} relationships) to {:?}",
            self.commit_ts,
            self.nodes.len(),
            self.relationships.len(),
            path
        );
        Ok(())
    }

    /// Read a snapshot written by [`Snapshot::write_to`]
    pub fn read_from(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let file = File::open(path.as_ref())?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot: Snapshot = bincode::deserialize_from(decoder)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeRecord, PropertyMap, RelationshipRecord};
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.snap");

        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "Thomas Anderson".into());
        let mut snapshot = Snapshot::new(7);
        snapshot.nodes.push(Node::new(
            NodeRecord::new(NodeId::new(1), vec![Label::new("Person")]),
            props,
        ));
        snapshot.relationships.push(Relationship::new(
            RelationshipRecord::new(RelationshipId::new(1), NodeId::new(1), NodeId::new(1), "KNOWS"),
            PropertyMap::new(),
        ));
        snapshot.node_indexes.push(LegacyIndexSnapshot {
            name: "nodes".into(),
            entries: vec![("name".into(), "Thomas Anderson".into(), NodeId::new(1))],
        });

        snapshot.write_to(&path).unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = Snapshot::read_from(&path).unwrap();
        assert_eq!(loaded.commit_ts, 7);
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(
            loaded.nodes[0].get_property("name").unwrap().as_string(),
            Some("Thomas Anderson")
        );
        assert_eq!(loaded.relationships[0].rel_type().as_str(), "KNOWS");
        assert_eq!(loaded.node_indexes[0].entries.len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Snapshot::read_from(dir.path().join("absent.snap")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.snap");
        std::fs::write(&path, b"not a snapshot").unwrap();
        assert!(Snapshot::read_from(&path).is_err());
    }
}
