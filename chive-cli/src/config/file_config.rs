//! YAML config files.
//!
//! ```yaml
//! parameters:
//!   dataset: [a, b]
//! checkpoints:
//!   node_2: { recompute: always, save_name: node_2_v2 }
//! recompute: false
//! workflows: [hello]
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chive::{PolicyOverride, SessionContext};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Error when reading or applying a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown workflow `{0}`")]
    UnknownWorkflow(String),
}

/// Values of one parameter: a list, or a single scalar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValues {
    Many(Vec<Value>),
    One(Value),
}

impl ParamValues {
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            ParamValues::Many(values) => values,
            ParamValues::One(value) => vec![value],
        }
    }
}

/// Contents of one YAML config file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Parameter values; replace the values declared by workflows.
    pub parameters: IndexMap<String, ParamValues>,
    /// Per-checkpoint policy overrides.
    pub checkpoints: HashMap<String, PolicyOverride>,
    /// Global force-recompute flag. `true` turns force-recompute on; `false` is accepted but
    /// never clears the flag once `CHIVE_RECOMPUTE`, `--recompute` or an earlier file set it.
    pub recompute: Option<bool>,
    /// Built-in workflows to run.
    pub workflows: Vec<String>,
}

impl FileConfig {
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        // An empty file parses as null.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &text)
    }

    /// Loads parameters (overwriting), policy overrides and the recompute flag into `session`.
    ///
    /// A `recompute: true` turns force-recompute on; `false` leaves it as it was.
    pub fn apply(&self, session: &mut SessionContext) {
        for (name, values) in &self.parameters {
            session.load_param(name.clone(), values.clone().into_vec(), true);
        }
        for (name, over) in &self.checkpoints {
            let merged = merge_override(session.policy_override(name), over);
            session.override_policy(name.clone(), merged);
        }
        if self.recompute == Some(true) {
            session.set_force_recompute(true);
        }
    }
}

/// Later files override earlier ones field by field.
fn merge_override(current: Option<&PolicyOverride>, over: &PolicyOverride) -> PolicyOverride {
    match current {
        Some(current) => PolicyOverride {
            recompute: over.recompute.or(current.recompute),
            save_name: over.save_name.clone().or_else(|| current.save_name.clone()),
        },
        None => over.clone(),
    }
}
