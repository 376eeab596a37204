//! Filesystem checkpoint store.
//!
//! Records live at `<root>/<key segments>/<name>.<ext>`. Missing directories are created on
//! save. Writes are plain `fs::write`: a crash mid-write can leave a truncated record, which
//! the next load reports as a deserialization miss.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use super::key::{CheckpointKey, KEY_SEPARATOR};
use super::serializer::{JsonSerializer, Serializer};
use super::store::{CheckpointStore, RecordId, StoreError};

/// Default root directory for checkpoints, relative to the working directory.
pub const DEFAULT_ROOT: &str = ".chive";

/// Checkpoint store backed by a directory tree.
pub struct FileStore {
    root: PathBuf,
    serializer: Box<dyn Serializer>,
}

impl FileStore {
    /// Store rooted at `root` using JSON records.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_serializer(root, Box::new(JsonSerializer))
    }

    pub fn with_serializer(root: impl Into<PathBuf>, serializer: Box<dyn Serializer>) -> Self {
        Self {
            root: root.into(),
            serializer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `record`. Always below [`root`](Self::root): `.` and `..`
    /// segments of hand-built keys are stored as `%2E` / `%2E%2E`.
    pub fn path_for(&self, record: &RecordId) -> PathBuf {
        let mut path = self.root.clone();
        for segment in record.key.segments() {
            match segment {
                "." | ".." => path.push(segment.replace('.', "%2E")),
                _ => path.push(segment),
            }
        }
        path.push(format!("{}.{}", record.name, self.serializer.extension()));
        path
    }

    fn record_for(&self, path: &Path) -> Option<RecordId> {
        if path.extension()?.to_str()? != self.serializer.extension() {
            return None;
        }
        let name = path.file_stem()?.to_str()?.to_string();
        let parent = path.parent()?.strip_prefix(&self.root).ok()?;
        let segments: Vec<&str> = parent
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        let key = CheckpointKey::from(segments.join(&KEY_SEPARATOR.to_string()));
        Some(RecordId::new(key, name))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl CheckpointStore for FileStore {
    fn save(&self, record: &RecordId, value: &Value) -> Result<(), StoreError> {
        let bytes = self.serializer.serialize(value)?;
        let path = self.path_for(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, bytes).map_err(|source| StoreError::Io { path, source })
    }

    fn load(&self, record: &RecordId) -> Result<Value, StoreError> {
        let path = self.path_for(record);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        self.serializer.deserialize(&bytes)
    }

    fn records(&self) -> Result<Vec<RecordId>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                StoreError::Io {
                    path,
                    source: e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed")),
                }
            })?;
            if entry.file_type().is_file() {
                if let Some(record) = self.record_for(entry.path()) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}
