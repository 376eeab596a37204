//! Pipeline builder: explicit registration of parameters and steps.
//!
//! Add parameters with `add_param`, steps with `add_input` / `add_node` / `add_checkpoint` /
//! `add_output`, then `compile` to get a validated [`Pipeline`].

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::checkpoint::{PolicyDescriptor, CONTEXT_ARG, KEY_SEPARATOR};
use crate::error::BoxError;
use crate::lazy::Args;

use super::compile_error::CompilationError;
use super::pipeline::{Pipeline, Step, StepKind};

/// Name of the built-in node registered by [`PipelineBuilder::add_save_path_node`].
pub const SAVE_PATH_NODE: &str = "save_path";

/// Builder for a [`Pipeline`].
///
/// **Interaction**: Produces `Pipeline`, which `Runner` executes against a
/// `SessionContext` and a `CheckpointStore`.
#[derive(Default)]
pub struct PipelineBuilder {
    params: IndexMap<String, Vec<Value>>,
    steps: Vec<Step>,
    duplicate_params: Vec<String>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares parameter `name` with its default values. Order of declaration is the order
    /// of checkpoint key segments.
    pub fn add_param<I, V>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        let values = values.into_iter().map(Into::into).collect();
        if self.params.insert(name.clone(), values).is_some() {
            self.duplicate_params.push(name);
        }
        self
    }

    /// Adds a step evaluated eagerly during setup.
    pub fn add_input<F>(&mut self, name: impl Into<String>, argnames: &[&str], f: F) -> &mut Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.push(name, argnames, StepKind::Input, f)
    }

    /// Adds a lazy, memoized node.
    pub fn add_node<F>(&mut self, name: impl Into<String>, argnames: &[&str], f: F) -> &mut Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.push(name, argnames, StepKind::Node, f)
    }

    /// Adds a lazy node whose value is checkpointed under `policy`.
    pub fn add_checkpoint<F>(
        &mut self,
        name: impl Into<String>,
        argnames: &[&str],
        policy: PolicyDescriptor,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.push(name, argnames, StepKind::Checkpoint(policy), f)
    }

    /// Adds a terminal step, run once per parameter binding of its closure.
    pub fn add_output<F>(&mut self, name: impl Into<String>, argnames: &[&str], f: F) -> &mut Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.push(name, argnames, StepKind::Output, f)
    }

    /// Adds the `save_path` node: the unfiltered key of the current instance, for steps that
    /// write their own files next to the checkpoints.
    pub fn add_save_path_node(&mut self) -> &mut Self {
        self.add_node(SAVE_PATH_NODE, &[CONTEXT_ARG], |args| {
            let context = args
                .get(CONTEXT_ARG)
                .ok_or_else(|| BoxError::from("run context not provided"))?;
            Ok(context.get("save_path").cloned().unwrap_or(Value::Null))
        })
    }

    fn push<F>(&mut self, name: impl Into<String>, argnames: &[&str], kind: StepKind, f: F) -> &mut Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.steps.push(Step {
            name: name.into(),
            argnames: argnames.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(f),
            kind,
        });
        self
    }

    /// Validates declarations and builds the pipeline.
    ///
    /// Fails on duplicate or reserved names, unknown arguments, outputs used as dependencies,
    /// empty parameters, unusable checkpoint record names and dependency cycles.
    pub fn compile(self) -> Result<Pipeline, CompilationError> {
        if let Some(name) = self.duplicate_params.into_iter().next() {
            return Err(CompilationError::DuplicateName(name));
        }
        let mut params = IndexMap::new();
        for (name, values) in self.params {
            if name == CONTEXT_ARG {
                return Err(CompilationError::ReservedName(name));
            }
            if values.is_empty() {
                return Err(CompilationError::EmptyParam(name));
            }
            params.insert(name, values);
        }

        let mut steps: IndexMap<String, Step> = IndexMap::new();
        for step in self.steps {
            if step.name == CONTEXT_ARG {
                return Err(CompilationError::ReservedName(step.name));
            }
            if params.contains_key(&step.name) || steps.contains_key(&step.name) {
                return Err(CompilationError::DuplicateName(step.name));
            }
            if let StepKind::Checkpoint(policy) = &step.kind {
                validate_record_name(&step.name, policy.record_name(&step.name))?;
            }
            steps.insert(step.name.clone(), step);
        }

        for step in steps.values() {
            for arg in &step.argnames {
                if arg == CONTEXT_ARG || params.contains_key(arg) {
                    continue;
                }
                match steps.get(arg) {
                    Some(dep) if dep.is_output() => {
                        return Err(CompilationError::OutputAsDependency {
                            step: step.name.clone(),
                            output: arg.clone(),
                        })
                    }
                    Some(_) => {}
                    None => {
                        return Err(CompilationError::UnknownArgument {
                            step: step.name.clone(),
                            arg: arg.clone(),
                        })
                    }
                }
            }
        }

        detect_cycles(&steps)?;

        Ok(Pipeline { params, steps })
    }
}

fn validate_record_name(step: &str, name: &str) -> Result<(), CompilationError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains(KEY_SEPARATOR) || name.contains('\\') {
        Some("name contains a path separator")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CompilationError::InvalidRecordName {
            step: step.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Depth-first search over step → step edges; reports the first cycle found as `a -> b -> a`.
fn detect_cycles(steps: &IndexMap<String, Step>) -> Result<(), CompilationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        steps: &'a IndexMap<String, Step>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), CompilationError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(name);
                return Err(CompilationError::Cycle(cycle.join(" -> ")));
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        path.push(name);
        if let Some(step) = steps.get(name) {
            for arg in &step.argnames {
                if steps.contains_key(arg.as_str()) {
                    visit(arg, steps, marks, path)?;
                }
            }
        }
        path.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    for name in steps.keys() {
        visit(name, steps, &mut marks, &mut path)?;
    }
    Ok(())
}
