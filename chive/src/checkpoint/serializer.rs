//! Serializer for checkpoint records (value <-> bytes).
//!
//! Used by [`FileStore`](super::FileStore) and [`MemoryStore`](super::MemoryStore).

use serde_json::Value;

use super::store::StoreError;

/// Serializes and deserializes node values for checkpoint storage.
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, StoreError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, StoreError>;
    /// File extension for records written with this serializer.
    fn extension(&self) -> &str;
}

/// JSON-based serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    fn extension(&self) -> &str {
        "json"
    }
}
