//! Run entry points: run with default config, run_with_config, or run_with_options.
//!
//! Re-exports [`run`], [`run_with_config`], [`run_with_options`], [`list_records`] and
//! [`RunSummary`].

pub use crate::config::Error;

mod run_with_config;
mod summary;

use std::path::Path;

use chive::{CheckpointStore, FileStore, RecordId};

use crate::config::{RunConfig, RunOptions};

pub use run_with_config::run_with_config;
pub use summary::RunSummary;

/// Run workflows with default config (from .env).
///
/// Loads `.env` internally, then calls `run_with_config`.
pub fn run() -> Result<RunSummary, Error> {
    dotenv::dotenv().ok();
    let config = RunConfig::from_env()?;
    run_with_config(&config)
}

/// Run workflows with config from env and optional overrides (e.g. from CLI).
///
/// Loads `.env`, builds `RunConfig` from env, applies `options`, then runs.
pub fn run_with_options(options: &RunOptions) -> Result<RunSummary, Error> {
    dotenv::dotenv().ok();
    let mut config = RunConfig::from_env()?;
    config.apply_options(options);
    run_with_config(&config)
}

/// Checkpoint records stored under `root`, sorted by path.
pub fn list_records(root: &Path) -> Result<Vec<RecordId>, Error> {
    Ok(FileStore::new(root).records()?)
}
