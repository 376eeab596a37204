//! Optional overrides for a run (CLI args or programmatic).
//!
//! Used by [`RunConfig::apply_options`](super::RunConfig::apply_options) and
//! [`run_with_options`](crate::run_with_options).

use std::path::PathBuf;

/// Optional overrides for a run: checkpoint root, recompute, config files, workflows.
///
/// All fields are optional; only set fields override the base config (from env).
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Override the checkpoint root directory.
    pub root: Option<PathBuf>,
    /// Force recomputation of every checkpoint.
    pub recompute: bool,
    /// Extra YAML config files, applied after those from env.
    pub config_files: Vec<PathBuf>,
    /// Workflows to run instead of the configured ones.
    pub workflows: Vec<String>,
    /// Print per-instance details.
    pub verbose: bool,
}
