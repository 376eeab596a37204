//! Recompute policies attached to checkpointed steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Whether an existing checkpoint may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recompute {
    /// Always run the function and overwrite the checkpoint.
    Always,
    /// Use the checkpoint when present, otherwise compute and save.
    #[default]
    Never,
    /// Use the checkpoint; a missing or unreadable one aborts the run instance.
    ErrorOnMiss,
}

impl fmt::Display for Recompute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recompute::Always => "always",
            Recompute::Never => "never",
            Recompute::ErrorOnMiss => "error-on-miss",
        })
    }
}

impl FromStr for Recompute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" | "true" => Ok(Recompute::Always),
            "never" | "false" => Ok(Recompute::Never),
            "error-on-miss" | "error" => Ok(Recompute::ErrorOnMiss),
            other => Err(format!(
                "unknown recompute policy `{}` (expected always, never or error-on-miss)",
                other
            )),
        }
    }
}

/// Accepts `true`/`false` as well as the policy names, matching hand-written config files.
impl<'de> Deserialize<'de> for Recompute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Recompute::Always),
            Raw::Flag(false) => Ok(Recompute::Never),
            Raw::Name(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Checkpoint declaration of a step.
///
/// Presence of a descriptor is what makes a step checkpointed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDescriptor {
    pub recompute: Recompute,
    /// Save-path override: the record's file name within its key directory, used instead of
    /// the step name. The key directory itself always comes from the dependency closure.
    pub save_name: Option<String>,
    /// Reserved marker; carried but not acted on.
    pub replicate: Option<Value>,
}

impl PolicyDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recompute(mut self, recompute: Recompute) -> Self {
        self.recompute = recompute;
        self
    }

    pub fn save_as(mut self, name: impl Into<String>) -> Self {
        self.save_name = Some(name.into());
        self
    }

    pub fn replicate(mut self, marker: Value) -> Self {
        self.replicate = Some(marker);
        self
    }

    /// Record name for a step called `step`.
    pub fn record_name<'a>(&'a self, step: &'a str) -> &'a str {
        self.save_name.as_deref().unwrap_or(step)
    }

    /// Returns this descriptor with `over`'s fields applied on top.
    pub fn merged(&self, over: &PolicyOverride) -> Self {
        Self {
            recompute: over.recompute.unwrap_or(self.recompute),
            save_name: over.save_name.clone().or_else(|| self.save_name.clone()),
            replicate: self.replicate.clone(),
        }
    }
}

/// Per-step policy override supplied by configuration (e.g. a `checkpoints:` section).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PolicyOverride {
    #[serde(default)]
    pub recompute: Option<Recompute>,
    #[serde(default)]
    pub save_name: Option<String>,
}
