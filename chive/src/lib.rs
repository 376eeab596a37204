//! # chive
//!
//! Lazy, memoized pipeline nodes whose results are checkpointed under keys built from only
//! the parameters each node depends on. Expensive steps run at most once per distinct
//! parameter combination, and runs resume from the store across executions.
//!
//! ## Design Principles
//!
//! - **Lazy nodes**: a [`LazyNode`] runs its function on first demand and memoizes the value
//!   or the error. Later invokes never re-run it.
//! - **Dependency-scoped keys**: a checkpoint key holds only the parameters in the node's
//!   transitive dependency closure, in binding order (`dataset=x/k=3`).
//! - **Explicit lifecycle**: the [`RecomputeController`] decides per node and run instance
//!   between the stored value and a recompute; the [`Runner`] calls it during setup and
//!   teardown.
//! - **Explicit session**: parameter values, the force-recompute flag and policy overrides
//!   live in a [`SessionContext`] passed by reference.
//!
//! ## Main Modules
//!
//! - [`lazy`]: `LazyNode`, `Arg`, `Args`.
//! - [`checkpoint`]: keys, `CheckpointStore` (`FileStore`, `MemoryStore`), policies, controller.
//! - [`graph`]: `PipelineBuilder`, `Pipeline`, `Runner`, reports.
//! - [`session`]: `SessionContext`, `ParamBinding`.
//!
//! ## Features
//!
//! - `tracing` (default): structured logs through the `tracing` crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chive::{FileStore, PipelineBuilder, PolicyDescriptor, Runner, SessionContext};
//! use serde_json::json;
//!
//! let mut builder = PipelineBuilder::new();
//! builder
//!     .add_param("dataset", ["x", "y"])
//!     .add_checkpoint("load", &["dataset"], PolicyDescriptor::new(), |args| {
//!         let dataset: String = args.parse("dataset")?;
//!         Ok(json!(dataset.len()))
//!     })
//!     .add_output("check", &["load"], |args| Ok(args.get("load").cloned().unwrap_or_default()));
//! let pipeline = builder.compile().unwrap();
//!
//! let mut session = SessionContext::new();
//! pipeline.register_params(&mut session);
//! let report = Runner::new(&pipeline, &session, Arc::new(FileStore::default())).run();
//! assert!(report.is_success());
//! ```

pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod lazy;
pub mod logging;
pub mod session;

pub use checkpoint::{
    CheckpointKey, CheckpointState, CheckpointStore, Evaluation, FileStore, JsonSerializer,
    KeyBuilder, MemoryStore, PolicyDescriptor, PolicyOverride, Recompute, RecomputeController,
    RecordId, Serializer, SetupError, StoreError,
};
pub use error::{BoxError, NodeError};
pub use graph::{
    CompilationError, InstanceReport, Outcome, Pipeline, PipelineBuilder, RunError, RunReport,
    Runner, StepKind,
};
pub use lazy::{Arg, ArgError, Args, LazyNode, NodeFn};
pub use session::{ParamBinding, SessionContext};
