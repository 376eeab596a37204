//! Pipeline compilation error.
//!
//! Returned by `PipelineBuilder::compile` when step declarations are inconsistent. Raised
//! before any run instance executes.

use thiserror::Error;

/// Error when compiling a pipeline (e.g. unknown argument, cycle, invalid checkpoint name).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompilationError {
    /// Two steps or parameters share a name.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// A step or parameter uses a name reserved for the run context.
    #[error("`{0}` is reserved and cannot name a step or parameter")]
    ReservedName(String),

    /// A step argument is neither a parameter, a step, nor the context argument.
    #[error("step `{step}` depends on unknown name `{arg}`")]
    UnknownArgument { step: String, arg: String },

    /// An output was listed as another step's argument; outputs are terminal.
    #[error("step `{step}` depends on output `{output}`; outputs cannot be dependencies")]
    OutputAsDependency { step: String, output: String },

    /// A parameter was declared without values.
    #[error("parameter `{0}` has no values")]
    EmptyParam(String),

    /// A checkpointed step has no usable record name.
    #[error("checkpoint `{step}` has invalid record name `{name}`: {reason}")]
    InvalidRecordName {
        step: String,
        name: String,
        reason: String,
    },

    /// Step dependencies form a cycle.
    #[error("dependency cycle: {0}")]
    Cycle(String),
}
