//! Dependency-scoped checkpoint keys.
//!
//! A node's key only contains the parameters it transitively depends on, so sweeping an
//! unrelated parameter reuses the same checkpoint. Entries keep the binding's order rather
//! than being sorted, which keeps keys readable but ties them to declaration order.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::session::ParamBinding;

/// Separator between key segments; also the directory separator of file stores.
pub const KEY_SEPARATOR: char = '/';

/// Reserved argument name that hands a node its run context instead of a parameter.
/// Never part of a dependency closure.
pub const CONTEXT_ARG: &str = "context";

/// Checkpoint key: percent-encoded `name=value` segments joined by [`KEY_SEPARATOR`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointKey(String);

impl CheckpointKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_SEPARATOR).filter(|s| !s.is_empty())
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckpointKey {
    fn from(s: &str) -> Self {
        CheckpointKey(s.to_string())
    }
}

impl From<String> for CheckpointKey {
    fn from(s: String) -> Self {
        CheckpointKey(s)
    }
}

/// Source of per-step argument names used to compute dependency closures.
pub trait DependencySource {
    /// Declared argument names of `step`, or `None` when `step` is not a declared step
    /// (e.g. a plain parameter).
    fn argnames(&self, step: &str) -> Option<&[String]>;
}

/// Transitive set of names `step` depends on, excluding [`CONTEXT_ARG`].
///
/// Contains parameter names and the names of upstream steps; only the former ever match a
/// binding entry.
pub fn dependency_closure<D>(deps: &D, step: &str) -> BTreeSet<String>
where
    D: DependencySource + ?Sized,
{
    let mut closure = BTreeSet::new();
    if let Some(names) = deps.argnames(step) {
        add_dependencies(deps, names, &mut closure);
    }
    closure
}

fn add_dependencies<D>(deps: &D, names: &[String], closure: &mut BTreeSet<String>)
where
    D: DependencySource + ?Sized,
{
    for name in names {
        if name == CONTEXT_ARG || !closure.insert(name.clone()) {
            continue;
        }
        if let Some(nested) = deps.argnames(name) {
            add_dependencies(deps, nested, closure);
        }
    }
}

/// Builds a key from `binding`, keeping only names in `closure` when one is given.
///
/// Names and rendered values are percent-encoded, so a segment never contains
/// [`KEY_SEPARATOR`], a backslash or `=` of its own and always stays one path component.
pub fn build_key(binding: &ParamBinding, closure: Option<&BTreeSet<String>>) -> CheckpointKey {
    let segments: Vec<String> = binding
        .iter()
        .filter(|(name, _)| closure.map_or(true, |c| c.contains(name.as_str())))
        .map(|(name, value)| encode_segment(name, value))
        .collect();
    CheckpointKey(segments.join(&KEY_SEPARATOR.to_string()))
}

/// `name=value` with both sides percent-encoded (`x/..` becomes `x%2F..`).
fn encode_segment(name: &str, value: &Value) -> String {
    format!(
        "{}={}",
        urlencoding::encode(name),
        urlencoding::encode(&render_value(value))
    )
}

/// Strings render raw, everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Computes checkpoint keys for the steps of one dependency graph.
pub struct KeyBuilder<'a, D: ?Sized> {
    deps: &'a D,
    filter_dependencies: bool,
}

impl<'a, D> KeyBuilder<'a, D>
where
    D: DependencySource + ?Sized,
{
    /// Builder that restricts keys to each step's dependency closure.
    pub fn new(deps: &'a D) -> Self {
        Self {
            deps,
            filter_dependencies: true,
        }
    }

    /// Toggles dependency filtering; when off every binding entry is used.
    pub fn filter_dependencies(mut self, filter: bool) -> Self {
        self.filter_dependencies = filter;
        self
    }

    pub fn key_for(&self, step: &str, binding: &ParamBinding) -> CheckpointKey {
        if self.filter_dependencies {
            let closure = dependency_closure(self.deps, step);
            build_key(binding, Some(&closure))
        } else {
            build_key(binding, None)
        }
    }
}
