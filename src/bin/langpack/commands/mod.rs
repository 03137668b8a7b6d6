//! Command implementations

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use langpack::pipeline::RunReport;
use langpack::RootContext;

pub mod build;
pub mod completions;
pub mod languages;
pub mod pin;
pub mod process;
pub mod vendor;

/// Resolve the workspace root from `--root`, the environment, or the
/// current directory.
fn workspace_context(root: Option<PathBuf>) -> Result<RootContext> {
    match root {
        Some(root) => Ok(RootContext::with_root(root)),
        None => RootContext::new(),
    }
}

/// `--only` style selections: empty means the whole catalog.
fn selection(names: &[String]) -> Option<&[String]> {
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Spinner shown while a pipeline phase runs; per-language detail goes to
/// the log.
fn phase_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Turn a pipeline report into the command's exit status.
fn finish(report: RunReport) -> Result<()> {
    if report.is_success() {
        Ok(())
    } else {
        let failed = report.failed_languages();
        anyhow::bail!("{} language(s) failed: {}", failed.len(), failed.join(", "))
    }
}
