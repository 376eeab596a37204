//! Run reports: outcome of every output instance.

use serde_json::Value;

use crate::checkpoint::{CheckpointState, SetupError};
use crate::error::NodeError;
use crate::session::ParamBinding;

/// Result of one run instance.
#[derive(Debug)]
pub enum Outcome {
    /// The output evaluated to this value.
    Passed(Value),
    /// The output or one of the nodes it demanded failed.
    Failed(NodeError),
    /// Setup aborted before evaluation (e.g. a required checkpoint was missing).
    SetupFailed(SetupError),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed(_) => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::SetupFailed(_) => "setup failed",
        }
    }
}

/// Outcome of one output under one parameter binding.
#[derive(Debug)]
pub struct InstanceReport {
    pub output: String,
    pub binding: ParamBinding,
    pub outcome: Outcome,
    /// State of each checkpointed step just before teardown, in setup order.
    pub checkpoints: Vec<(String, CheckpointState)>,
}

impl InstanceReport {
    /// `output[a=1, b=x]`, or just the output name without parameters.
    pub fn id(&self) -> String {
        if self.binding.is_empty() {
            self.output.clone()
        } else {
            format!("{}[{}]", self.output, self.binding)
        }
    }

    pub fn checkpoint_state(&self, step: &str) -> Option<CheckpointState> {
        self.checkpoints
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, s)| *s)
    }
}

/// All instances executed by a run, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub instances: Vec<InstanceReport>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.instances.iter().filter(|i| i.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.instances.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn extend(&mut self, instances: impl IntoIterator<Item = InstanceReport>) {
        self.instances.extend(instances);
    }
}
