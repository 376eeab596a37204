//! Configuration for running workflows.
//!
//! Re-exports [`RunConfig`], [`RunOptions`], [`FileConfig`] and config errors.

mod file_config;
mod run_config;
mod run_options;

pub use file_config::{ConfigError, FileConfig, ParamValues};
pub use run_config::{Error, RunConfig};
pub use run_options::RunOptions;
