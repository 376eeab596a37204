//! Shared test helpers: a store that counts calls, a store that cannot be reached, and the
//! two-node pipeline used by several scenarios.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chive::{
    CheckpointStore, MemoryStore, PipelineBuilder, PolicyDescriptor, RecordId, StoreError,
};
use serde_json::{json, Value};

/// Wraps a [`MemoryStore`] and counts save/load calls.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub saves: AtomicUsize,
    pub loads: AtomicUsize,
}

impl CountingStore {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl CheckpointStore for CountingStore {
    fn save(&self, record: &RecordId, value: &Value) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(record, value)
    }

    fn load(&self, record: &RecordId) -> Result<Value, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(record)
    }

    fn records(&self) -> Result<Vec<RecordId>, StoreError> {
        self.inner.records()
    }
}

/// Store whose backing medium is unreachable: every operation is an I/O error.
pub struct UnreachableStore;

impl UnreachableStore {
    fn error() -> StoreError {
        StoreError::Io {
            path: "/unreachable".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "store offline"),
        }
    }
}

impl CheckpointStore for UnreachableStore {
    fn save(&self, _: &RecordId, _: &Value) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn load(&self, _: &RecordId) -> Result<Value, StoreError> {
        Err(Self::error())
    }

    fn records(&self) -> Result<Vec<RecordId>, StoreError> {
        Err(Self::error())
    }
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(c: &AtomicUsize) -> usize {
    c.load(Ordering::SeqCst)
}

/// `node_1` (constant 1) → `node_2` (checkpoint over `node_1` and `dataset`) → `report`.
///
/// Returns the builder plus call counters for `node_1` and `node_2`.
pub fn hello_pipeline(
    datasets: &[&str],
    policy: PolicyDescriptor,
) -> (PipelineBuilder, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let node_1_calls = counter();
    let node_2_calls = counter();
    let mut b = PipelineBuilder::new();
    let c1 = node_1_calls.clone();
    let c2 = node_2_calls.clone();
    b.add_param("dataset", datasets.iter().copied())
        .add_node("node_1", &[], move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(json!(1))
        })
        .add_checkpoint("node_2", &["node_1", "dataset"], policy, move |args| {
            c2.fetch_add(1, Ordering::SeqCst);
            let dataset: String = args.parse("dataset")?;
            Ok(json!(format!("{}:{}", dataset, args.get("node_1").cloned().unwrap_or_default())))
        })
        .add_output("other_function", &["dataset", "node_2"], |args| {
            Ok(args.get("node_2").cloned().unwrap_or_default())
        });
    (b, node_1_calls, node_2_calls)
}
