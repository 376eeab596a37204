//! Built-in workflows selectable by name from the CLI or config files.

mod hello;
mod sweep;

use chive::PipelineBuilder;

/// Workflow run when neither options nor config files name one.
pub const DEFAULT_WORKFLOW: &str = "hello";

const WORKFLOWS: &[(&str, fn() -> PipelineBuilder)] =
    &[("hello", hello::builder), ("sweep", sweep::builder)];

/// Names of all built-in workflows.
pub fn workflow_names() -> impl Iterator<Item = &'static str> {
    WORKFLOWS.iter().map(|(name, _)| *name)
}

/// Builder for the built-in workflow `name`.
pub fn builtin(name: &str) -> Option<PipelineBuilder> {
    WORKFLOWS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, build)| build())
}
