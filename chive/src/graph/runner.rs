//! Runner: drives run instances of a compiled pipeline.
//!
//! For each output and each of its parameter bindings the runner sets up every step of the
//! output's closure (dependencies first), asking the [`RecomputeController`] how each step is
//! evaluated, then invokes the output. Only nodes the output actually demands are computed;
//! a cache hit cuts off everything upstream of it. Teardown runs for every step that was set
//! up, in reverse order, whether or not setup or evaluation failed.
//!
//! Plain and input nodes are shared across instances whose bindings agree on the node's
//! dependency closure, so each runs at most once per filtered key. Checkpointed steps, outputs
//! and nodes that read the run context are set up again in every instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use serde_json::{json, Value};
use thiserror::Error;

use crate::checkpoint::{
    build_key, CheckpointKey, CheckpointStore, Evaluation, KeyBuilder, RecomputeController,
    SetupError, CONTEXT_ARG,
};
use crate::lazy::{Arg, LazyNode};
use crate::logging;
use crate::session::{ParamBinding, SessionContext};

use super::pipeline::{Pipeline, StepKind};
use super::report::{InstanceReport, Outcome, RunReport};

/// Error when asking the runner for something the pipeline does not declare.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown output: {0}")]
    UnknownOutput(String),

    #[error("output `{output}` needs parameter `{param}` which the binding does not provide")]
    MissingParameter { output: String, param: String },
}

/// Shared nodes by step name and the step's filtered key.
type SharedNodes = HashMap<(String, CheckpointKey), Arc<LazyNode>>;

/// Steps set up so far in one instance.
struct InstanceSetup<'b> {
    binding: &'b ParamBinding,
    context: Value,
    nodes: IndexMap<String, Arc<LazyNode>>,
    order: Vec<String>,
}

/// Executes pipeline outputs against a session and a checkpoint store.
pub struct Runner<'a> {
    pipeline: &'a Pipeline,
    session: &'a SessionContext,
    controller: RecomputeController,
    shared: Mutex<SharedNodes>,
}

impl<'a> Runner<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        session: &'a SessionContext,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            pipeline,
            session,
            controller: RecomputeController::new(store),
            shared: Mutex::new(HashMap::new()),
        }
    }

    pub fn controller(&self) -> &RecomputeController {
        &self.controller
    }

    /// Runs every output under each of its parameter bindings.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        for output in self.pipeline.outputs() {
            for binding in self.pipeline.instances(output.name(), self.session) {
                report.instances.push(self.execute(output.name(), &binding));
            }
        }
        report
    }

    /// Runs one output under each of its parameter bindings.
    pub fn run_output(&self, output: &str) -> Result<Vec<InstanceReport>, RunError> {
        self.check_output(output)?;
        Ok(self
            .pipeline
            .instances(output, self.session)
            .iter()
            .map(|binding| self.execute(output, binding))
            .collect())
    }

    /// Runs one output under an explicit binding. The binding must cover every parameter in
    /// the output's closure; extra entries are ignored by filtered keys.
    pub fn run_instance(
        &self,
        output: &str,
        binding: &ParamBinding,
    ) -> Result<InstanceReport, RunError> {
        self.check_output(output)?;
        let closure = self.pipeline.closure(output);
        if let Some((param, _)) = self
            .pipeline
            .params()
            .find(|(name, _)| closure.contains(*name) && !binding.contains(name))
        {
            return Err(RunError::MissingParameter {
                output: output.to_string(),
                param: param.clone(),
            });
        }
        Ok(self.execute(output, binding))
    }

    fn check_output(&self, output: &str) -> Result<(), RunError> {
        match self.pipeline.step(output) {
            Some(step) if step.is_output() => Ok(()),
            _ => Err(RunError::UnknownOutput(output.to_string())),
        }
    }

    fn execute(&self, output: &str, binding: &ParamBinding) -> InstanceReport {
        let params = binding.to_string();
        logging::log_instance_start(output, &params);
        self.controller.begin_instance();

        let mut setup = InstanceSetup {
            binding,
            context: json!({
                "output": output,
                "params": binding.to_value(),
                "save_path": build_key(binding, None).as_str(),
            }),
            nodes: IndexMap::new(),
            order: Vec::new(),
        };

        let outcome = match self.setup_step(output, &mut setup) {
            Ok(node) => match node.invoke() {
                Ok(value) => Outcome::Passed(value),
                Err(e) => Outcome::Failed(e),
            },
            Err(e) => Outcome::SetupFailed(e),
        };

        let checkpoints = self.controller.states();
        for step in setup.order.iter().rev() {
            self.controller.after_teardown(step);
        }
        logging::log_instance_complete(output, &params, outcome.label());

        InstanceReport {
            output: output.to_string(),
            binding: binding.clone(),
            outcome,
            checkpoints,
        }
    }

    fn setup_step(
        &self,
        name: &str,
        setup: &mut InstanceSetup<'_>,
    ) -> Result<Arc<LazyNode>, SetupError> {
        if let Some(node) = setup.nodes.get(name) {
            return Ok(node.clone());
        }
        let step = self
            .pipeline
            .step(name)
            .expect("compiled pipeline has all steps");

        let shared_key = self.shareable(name).then(|| {
            let key = KeyBuilder::new(self.pipeline).key_for(name, setup.binding);
            (name.to_string(), key)
        });
        if let Some(key) = &shared_key {
            let existing = self.shared_nodes().get(key).cloned();
            if let Some(node) = existing {
                logging::log_node_reused(name, &key.1);
                if *step.kind() == StepKind::Input {
                    invoke_input(name, &node)?;
                }
                setup.nodes.insert(name.to_string(), node.clone());
                return Ok(node);
            }
        }

        let mut kwargs = Vec::with_capacity(step.argnames().len());
        for arg in step.argnames() {
            let value = if arg == CONTEXT_ARG {
                Arg::Value(setup.context.clone())
            } else if self.pipeline.step(arg).is_some() {
                Arg::Lazy(self.setup_step(arg, setup)?)
            } else {
                Arg::Value(setup.binding.get(arg).cloned().unwrap_or(Value::Null))
            };
            kwargs.push((arg.clone(), value));
        }

        setup.order.push(name.to_string());
        let policy = self.session.effective_policy(name, step.policy());
        let evaluation = self.controller.before_evaluate(
            name,
            policy.as_ref(),
            setup.binding,
            self.pipeline,
            self.session,
        )?;

        let node = match evaluation {
            Evaluation::UseCache(value) => LazyNode::constant(name, value),
            Evaluation::Compute { save_to } => {
                let node = kwargs
                    .into_iter()
                    .fold(LazyNode::from_fn(name, step.func().clone()), |node, (k, a)| {
                        node.with_kwarg(k, a)
                    });
                if let Some(record) = save_to {
                    self.controller.attach_save(&node, record);
                }
                node
            }
        };
        let node = Arc::new(node);
        if let Some(key) = shared_key {
            self.shared_nodes().insert(key, node.clone());
        }

        if *step.kind() == StepKind::Input {
            invoke_input(name, &node)?;
        }

        setup.nodes.insert(name.to_string(), node.clone());
        Ok(node)
    }

    /// Plain and input steps that do not depend on the run context.
    fn shareable(&self, name: &str) -> bool {
        self.pipeline.step(name).map_or(false, |step| {
            matches!(step.kind(), StepKind::Node | StepKind::Input)
                && !self.pipeline.uses_context(name)
        })
    }

    fn shared_nodes(&self) -> MutexGuard<'_, SharedNodes> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn invoke_input(name: &str, node: &LazyNode) -> Result<Value, SetupError> {
    node.invoke().map_err(|source| SetupError::Input {
        node: name.to_string(),
        source,
    })
}
