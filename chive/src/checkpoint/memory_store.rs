//! In-memory checkpoint store.
//!
//! Keeps serialized bytes per record in a map, so values go through the same serializer as a
//! [`FileStore`](super::FileStore). Lost when dropped. For tests and dry runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;

use super::serializer::{JsonSerializer, Serializer};
use super::store::{CheckpointStore, RecordId, StoreError};

/// In-memory checkpoint store.
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordId, Vec<u8>>>,
    serializer: Box<dyn Serializer>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            serializer: Box::new(JsonSerializer),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores raw bytes at `record`, bypassing the serializer.
    pub fn insert_raw(&self, record: RecordId, bytes: Vec<u8>) {
        if let Ok(mut guard) = self.records.write() {
            guard.insert(record, bytes);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&self, record: &RecordId, value: &Value) -> Result<(), StoreError> {
        let bytes = self.serializer.serialize(value)?;
        let mut guard = self
            .records
            .write()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        guard.insert(record.clone(), bytes);
        Ok(())
    }

    fn load(&self, record: &RecordId) -> Result<Value, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        let bytes = guard
            .get(record)
            .ok_or_else(|| StoreError::NotFound(record.to_string()))?;
        self.serializer.deserialize(bytes)
    }

    fn records(&self) -> Result<Vec<RecordId>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}
