//! Runs the configured workflows against a file store.

use std::sync::Arc;

use chive::{CheckpointStore, FileStore, Runner, SessionContext};

use super::{Error, RunSummary};
use crate::config::{ConfigError, FileConfig, RunConfig};
use crate::workflows::{builtin, DEFAULT_WORKFLOW};

/// Runs every selected workflow and returns the per-workflow reports.
///
/// Config files are applied in order to one session shared by all workflows. Workflows come
/// from `config.workflows` followed by those named in config files; when none are named,
/// [`DEFAULT_WORKFLOW`] runs. Failing instances are reported, not returned as errors.
pub fn run_with_config(config: &RunConfig) -> Result<RunSummary, Error> {
    let mut session = SessionContext::new().with_force_recompute(config.recompute);
    let mut names = config.workflows.clone();
    for path in &config.config_files {
        let file = FileConfig::load(path)?;
        tracing::debug!(path = %path.display(), "applying config file");
        file.apply(&mut session);
        names.extend(file.workflows);
    }
    if names.is_empty() {
        names.push(DEFAULT_WORKFLOW.to_string());
    }
    let mut seen = std::collections::HashSet::new();
    names.retain(|n| seen.insert(n.clone()));

    let store: Arc<dyn CheckpointStore> = Arc::new(FileStore::new(&config.root));
    let mut summary = RunSummary::default();
    for name in names {
        let builder = builtin(&name).ok_or_else(|| ConfigError::UnknownWorkflow(name.clone()))?;
        let pipeline = builder.compile()?;
        pipeline.register_params(&mut session);
        tracing::info!(workflow = %name, root = %config.root.display(), "running workflow");
        let report = Runner::new(&pipeline, &session, store.clone()).run();
        tracing::info!(
            workflow = %name,
            passed = report.passed(),
            failed = report.failed(),
            "workflow complete"
        );
        summary.workflows.push((name, report));
    }
    Ok(summary)
}
