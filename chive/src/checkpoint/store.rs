//! Checkpoint store contract.
//!
//! A store persists one serialized value per [`RecordId`] (checkpoint key plus record name).
//! Saving the same record again overwrites it. Stores do not evict and do not lock.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use super::key::CheckpointKey;

/// Error from a checkpoint store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists at the requested location.
    #[error("checkpoint not found: {0}")]
    NotFound(String),

    /// The value could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Bytes were found but could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Reading or writing the backing medium failed.
    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Location of one checkpoint record: the dependency-scoped key and the record name
/// (the node's identity, or its save-name override).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub key: CheckpointKey,
    pub name: String,
}

impl RecordId {
    pub fn new(key: CheckpointKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.key, self.name)
        }
    }
}

/// Byte-level persistent save/load of node results.
///
/// **Interaction**: Called by `RecomputeController` (load during setup, save from a node's
/// save callback) and by the CLI `list` command.
pub trait CheckpointStore: Send + Sync {
    /// Serializes `value` and writes it at `record`, replacing any previous record.
    fn save(&self, record: &RecordId, value: &Value) -> Result<(), StoreError>;

    /// Reads and deserializes the value at `record`.
    fn load(&self, record: &RecordId) -> Result<Value, StoreError>;

    /// Lists every stored record.
    fn records(&self) -> Result<Vec<RecordId>, StoreError>;
}
