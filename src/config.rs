//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of lock shards for committed node and relationship storage
    pub shard_count: usize,
    /// Snapshot file (None = in-memory only)
    pub snapshot_path: Option<PathBuf>,
    /// Load `snapshot_path` on open if the file exists
    pub load_snapshot_on_open: bool,
    /// Write `snapshot_path` on close
    pub snapshot_on_close: bool,
    /// Vacuum old versions every N commits (0 = only on demand)
    pub gc_interval_commits: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shard_count: 16,
            snapshot_path: None,
            load_snapshot_on_open: true,
            snapshot_on_close: true,
            gc_interval_commits: 1024,
        }
    }
}

impl EngineConfig {
    /// In-memory configuration with no snapshot file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Configuration persisting to `path`
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::Invalid("shard_count must be greater than 0".to_string()));
        }
        if let Some(path) = &self.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("snapshot_path must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.shard_count, 16);
        assert!(config.snapshot_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = EngineConfig::from_yaml_str("shard_count: 4\nsnapshot_path: /tmp/graph.snap\n").unwrap();
        assert_eq!(config.shard_count, 4);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/graph.snap")));
        assert_eq!(config.gc_interval_commits, 1024);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let err = EngineConfig::from_yaml_str("shard_count: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = EngineConfig::with_snapshot("data/graph.snap");
        let yaml = config.to_yaml().unwrap();
        assert_eq!(EngineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
