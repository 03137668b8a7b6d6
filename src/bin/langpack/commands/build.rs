//! `langpack build` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::BuildArgs;
use langpack::builder::{build_all, plan, PlatformProfile};
use langpack::util::config::load_merged_config;

use super::{finish, phase_spinner, workspace_context};

pub fn execute(args: BuildArgs, root: Option<PathBuf>) -> Result<()> {
    let ctx = workspace_context(root)?;
    let config = load_merged_config(&ctx);
    let profile = PlatformProfile::host();

    let build_plan = plan(&ctx, &profile)?;
    if args.plan {
        println!("{}", build_plan.to_json()?);
        return Ok(());
    }

    // Jobs: CLI > config > auto-detect
    let workers = args.jobs.unwrap_or_else(|| config.effective_workers());

    let runtime = tokio::runtime::Runtime::new()?;
    let spinner = phase_spinner("Compiling grammar modules");
    let report = runtime.block_on(build_all(build_plan, profile, workers));
    spinner.finish_and_clear();
    finish(report)
}
