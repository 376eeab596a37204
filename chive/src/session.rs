//! Session context: run-scoped parameter sets, the force-recompute flag and policy overrides.
//!
//! Created once per run and passed by reference to every evaluation. Parameter value lists
//! declared by a pipeline are defaults; values loaded from configuration overwrite them.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checkpoint::{render_value, PolicyDescriptor, PolicyOverride};

/// Ordered parameter name → value mapping for one run instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBinding(IndexMap<String, Value>);

impl ParamBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Binding as a JSON object, preserving order.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for ParamBinding {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        ParamBinding(iter.into_iter().collect())
    }
}

/// `a=1, b=x`, as shown in logs and reports.
impl fmt::Display for ParamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, render_value(v))?;
        }
        Ok(())
    }
}

/// Run-scoped state consumed by the recompute controller and the runner.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    params: IndexMap<String, Vec<Value>>,
    force_recompute: bool,
    policy_overrides: HashMap<String, PolicyOverride>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_recompute(mut self, force: bool) -> Self {
        self.force_recompute = force;
        self
    }

    pub fn set_force_recompute(&mut self, force: bool) {
        self.force_recompute = force;
    }

    /// When set, every checkpointed node bypasses cache loads.
    pub fn force_recompute(&self) -> bool {
        self.force_recompute
    }

    /// Registers the value list of parameter `name`.
    ///
    /// Without `overwrite`, an already registered list is kept; this is how declared
    /// defaults yield to values loaded earlier from configuration.
    pub fn load_param(&mut self, name: impl Into<String>, values: Vec<Value>, overwrite: bool) {
        let name = name.into();
        if overwrite || !self.params.contains_key(&name) {
            self.params.insert(name, values);
        }
    }

    pub fn param_values(&self, name: &str) -> Option<&[Value]> {
        self.params.get(name).map(Vec::as_slice)
    }

    /// Parameters in registration order.
    pub fn params(&self) -> impl Iterator<Item = (&String, &Vec<Value>)> {
        self.params.iter()
    }

    pub fn override_policy(&mut self, step: impl Into<String>, over: PolicyOverride) {
        self.policy_overrides.insert(step.into(), over);
    }

    pub fn policy_override(&self, step: &str) -> Option<&PolicyOverride> {
        self.policy_overrides.get(step)
    }

    /// Declared policy of `step` with any configured override applied.
    ///
    /// Overrides only apply to steps that declare a policy; they never turn a plain node
    /// into a checkpointed one.
    pub fn effective_policy(
        &self,
        step: &str,
        declared: Option<&PolicyDescriptor>,
    ) -> Option<PolicyDescriptor> {
        let declared = declared?;
        Some(match self.policy_overrides.get(step) {
            Some(over) => declared.merged(over),
            None => declared.clone(),
        })
    }
}
