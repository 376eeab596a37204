//! Run config: checkpoint root, force-recompute flag, config files and workflows. Can be
//! filled from env / .env.
//!
//! Interacts with [`RunOptions`](super::RunOptions), [`FileConfig`](super::FileConfig) and
//! [`run_with_config`](crate::run_with_config).

use std::path::PathBuf;

use chive::checkpoint::DEFAULT_ROOT;

use super::RunOptions;

/// Error type used for config loading and runs.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Run config: where checkpoints live, what to run and how. Can be filled from env / .env.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Checkpoint root directory. Default: `.chive`.
    pub root: PathBuf,
    /// Recompute every checkpoint regardless of stored records.
    pub recompute: bool,
    /// YAML config files, applied in order.
    pub config_files: Vec<PathBuf>,
    /// Built-in workflows to run, in addition to those named by config files.
    pub workflows: Vec<String>,
    /// When true, print every instance and checkpoint state.
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            recompute: false,
            config_files: Vec::new(),
            workflows: Vec::new(),
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Fill config from env vars (and .env). Requires `dotenv::dotenv().ok()` or load inside
    /// `run()`.
    ///
    /// `CHIVE_ROOT` (checkpoint directory), `CHIVE_RECOMPUTE` (true|false|1|0|yes|no) and
    /// `CHIVE_CONFIG` (config files, separated like `PATH`) are all optional.
    pub fn from_env() -> Result<Self, Error> {
        let root = std::env::var("CHIVE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROOT));
        let recompute = match std::env::var("CHIVE_RECOMPUTE") {
            Ok(v) => parse_flag(&v).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("CHIVE_RECOMPUTE must be true or false, got `{}`", v),
                )
            })?,
            Err(_) => false,
        };
        let config_files = std::env::var_os("CHIVE_CONFIG")
            .map(|v| {
                std::env::split_paths(&v)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            root,
            recompute,
            config_files,
            workflows: Vec::new(),
            verbose: false,
        })
    }

    /// Apply optional overrides from `RunOptions` to this config.
    ///
    /// `root` replaces the env value when set; config files are appended after those from
    /// env; workflows replace the configured list when any are given.
    pub fn apply_options(&mut self, options: &RunOptions) {
        if let Some(root) = &options.root {
            self.root = root.clone();
        }
        if options.recompute {
            self.recompute = true;
        }
        self.config_files.extend(options.config_files.iter().cloned());
        if !options.workflows.is_empty() {
            self.workflows = options.workflows.clone();
        }
        self.verbose = options.verbose;
    }

    /// Use `root` as the checkpoint directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Add a built-in workflow to run.
    pub fn with_workflow(mut self, name: impl Into<String>) -> Self {
        self.workflows.push(name.into());
        self
    }

    /// Add a YAML config file.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push(path.into());
        self
    }
}

pub(crate) fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
