//! Compiled pipeline: immutable step declarations and parameter defaults.
//!
//! Built by `PipelineBuilder::compile`. Provides dependency closures for key building and the
//! parameter bindings (run instances) of each output.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::checkpoint::{dependency_closure, DependencySource, PolicyDescriptor, CONTEXT_ARG};
use crate::lazy::NodeFn;
use crate::session::{ParamBinding, SessionContext};

/// Role of a step in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Evaluated eagerly during setup.
    Input,
    /// Lazy, memoized node.
    Node,
    /// Lazy node whose value is checkpointed under the given policy.
    Checkpoint(PolicyDescriptor),
    /// Terminal step; each output is run once per parameter binding.
    Output,
}

/// One declared step: a function plus the names of its arguments.
#[derive(Clone)]
pub struct Step {
    pub(super) name: String,
    pub(super) argnames: Vec<String>,
    pub(super) func: NodeFn,
    pub(super) kind: StepKind,
}

impl Step {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn func(&self) -> &NodeFn {
        &self.func
    }

    /// Checkpoint policy, when the step is checkpointed.
    pub fn policy(&self) -> Option<&PolicyDescriptor> {
        match &self.kind {
            StepKind::Checkpoint(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_output(&self) -> bool {
        self.kind == StepKind::Output
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("argnames", &self.argnames)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Validated set of steps and parameters.
#[derive(Clone, Debug)]
pub struct Pipeline {
    pub(super) params: IndexMap<String, Vec<Value>>,
    pub(super) steps: IndexMap<String, Step>,
}

impl Pipeline {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Step> {
        self.steps.values().filter(|s| s.is_output())
    }

    /// Declared parameters and their default values, in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&String, &Vec<Value>)> {
        self.params.iter()
    }

    /// Registers declared parameter defaults without replacing values already in `session`.
    pub fn register_params(&self, session: &mut SessionContext) {
        for (name, values) in &self.params {
            session.load_param(name.clone(), values.clone(), false);
        }
    }

    /// Transitive dependency names of `step`.
    pub fn closure(&self, step: &str) -> BTreeSet<String> {
        dependency_closure(self, step)
    }

    /// Whether `step` or any step upstream of it reads the run context.
    pub fn uses_context(&self, step: &str) -> bool {
        std::iter::once(step.to_string())
            .chain(self.closure(step))
            .filter_map(|name| self.step(&name))
            .any(|s| s.argnames().iter().any(|a| a == CONTEXT_ARG))
    }

    /// Parameter bindings under which `output` runs: the cartesian product of the value lists
    /// of the parameters in its closure, in declaration order, first parameter varying slowest.
    ///
    /// Values come from `session` when registered there, else from the declared defaults.
    pub fn instances(&self, output: &str, session: &SessionContext) -> Vec<ParamBinding> {
        let closure = self.closure(output);
        let mut bindings = vec![ParamBinding::new()];
        for (name, declared) in &self.params {
            if !closure.contains(name) {
                continue;
            }
            let values = session.param_values(name).unwrap_or(declared);
            let mut next = Vec::with_capacity(bindings.len() * values.len());
            for binding in &bindings {
                for value in values {
                    let mut b = binding.clone();
                    b.insert(name.clone(), value.clone());
                    next.push(b);
                }
            }
            bindings = next;
        }
        bindings
    }
}

impl DependencySource for Pipeline {
    fn argnames(&self, step: &str) -> Option<&[String]> {
        self.steps.get(step).map(|s| s.argnames.as_slice())
    }
}
