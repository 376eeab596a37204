//! # Checkpoints: keys, stores and recompute policies
//!
//! ## Overview
//!
//! A checkpointed step persists its value under a [`RecordId`]: the dependency-scoped
//! [`CheckpointKey`] plus a record name. The key only contains the parameters the step
//! transitively depends on, so two run instances that differ elsewhere share the record.
//!
//! [`RecomputeController`] ties the pieces together. Per run instance it decides, for each
//! checkpointed step, between serving the stored value and running the function (and then
//! saving its result).
//!
//! ## Store implementations
//!
//! | Type            | Persistence      | Use case               |
//! |-----------------|------------------|------------------------|
//! | [`FileStore`]   | Directory tree   | Resumable runs         |
//! | [`MemoryStore`] | In-memory        | Tests, dry runs        |
//!
//! Both serialize through a [`Serializer`]; [`JsonSerializer`] is the default.

mod controller;
mod file_store;
mod key;
mod memory_store;
mod policy;
mod serializer;
mod store;

pub use controller::{CheckpointState, Evaluation, RecomputeController, SetupError};
pub use file_store::{FileStore, DEFAULT_ROOT};
pub use key::{
    build_key, dependency_closure, render_value, CheckpointKey, DependencySource, KeyBuilder,
    CONTEXT_ARG, KEY_SEPARATOR,
};
pub use memory_store::MemoryStore;
pub use policy::{PolicyDescriptor, PolicyOverride, Recompute};
pub use serializer::{JsonSerializer, Serializer};
pub use store::{CheckpointStore, RecordId, StoreError};
