//! Result of a CLI run: one [`RunReport`] per workflow.

use std::fmt::Write;

use chive::{Outcome, RunReport};

#[derive(Debug, Default)]
pub struct RunSummary {
    pub workflows: Vec<(String, RunReport)>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.workflows.iter().map(|(_, r)| r.passed()).sum()
    }

    pub fn failed(&self) -> usize {
        self.workflows.iter().map(|(_, r)| r.failed()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// One line per instance (`PASSED hello::other_function[dataset=x]`), with the failure
    /// cause for failed ones; checkpoint states too when `verbose`.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        for (workflow, report) in &self.workflows {
            for instance in &report.instances {
                let label = instance.outcome.label().to_uppercase();
                let _ = write!(out, "{} {}::{}", label, workflow, instance.id());
                match &instance.outcome {
                    Outcome::Passed(value) if verbose => {
                        let _ = write!(out, " = {}", value);
                    }
                    Outcome::Passed(_) => {}
                    Outcome::Failed(e) => {
                        let _ = write!(out, ": {}", e);
                    }
                    Outcome::SetupFailed(e) => {
                        let _ = write!(out, ": {}", e);
                    }
                }
                out.push('\n');
                if verbose {
                    for (step, state) in &instance.checkpoints {
                        let _ = writeln!(out, "    {}: {:?}", step, state);
                    }
                }
            }
        }
        let _ = writeln!(out, "{} passed, {} failed", self.passed(), self.failed());
        out
    }
}
