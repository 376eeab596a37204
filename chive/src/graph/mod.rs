//! Pipeline graph: declare steps, compile, run instances.
//!
//! Steps are registered explicitly on a [`PipelineBuilder`], validated by `compile`, and
//! executed by a [`Runner`], which acts as the host for the recompute controller's
//! lifecycle call-ins.

mod compile_error;
mod pipeline;
mod pipeline_builder;
mod report;
mod runner;

pub use compile_error::CompilationError;
pub use pipeline::{Pipeline, Step, StepKind};
pub use pipeline_builder::{PipelineBuilder, SAVE_PATH_NODE};
pub use report::{InstanceReport, Outcome, RunReport};
pub use runner::{RunError, Runner};
