//! `langpack pin` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::PinArgs;
use langpack::pipeline::pin::pin;
use langpack::util::config::load_merged_config;

use super::{finish, phase_spinner, selection, workspace_context};

pub fn execute(args: PinArgs, root: Option<PathBuf>) -> Result<()> {
    let ctx = workspace_context(root)?;
    let mut config = load_merged_config(&ctx);

    // Workers: CLI > config > auto-detect
    if let Some(workers) = args.workers {
        config.pipeline.workers = Some(workers);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let spinner = phase_spinner("Resolving upstream revisions");
    let report = runtime.block_on(pin(
        &ctx,
        &config,
        selection(&args.languages),
        args.only_missing,
    ));
    spinner.finish_and_clear();
    finish(report?)
}
