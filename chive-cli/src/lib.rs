//! chive-cli library: run built-in workflows against a checkpoint directory.
//!
//! Reads settings from env (and `.env`), merges YAML config files, compiles the selected
//! workflows and runs every output instance, resuming from checkpoints under the root.
//!
//! ## Usage
//!
//! ```rust,no_run
//! let summary = chive_cli::run()?;
//! for (workflow, report) in &summary.workflows {
//!     println!("{}: {} passed, {} failed", workflow, report.passed(), report.failed());
//! }
//! # Ok::<(), chive_cli::Error>(())
//! ```

mod config;
mod run;
mod workflows;

pub use config::{ConfigError, Error, FileConfig, ParamValues, RunConfig, RunOptions};
pub use run::{list_records, run, run_with_config, run_with_options, RunSummary};
pub use workflows::{builtin, workflow_names, DEFAULT_WORKFLOW};

#[cfg(test)]
mod tests;
