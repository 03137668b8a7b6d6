//! `langpack process` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::ProcessArgs;
use langpack::pipeline;
use langpack::util::config::load_merged_config;

use super::{finish, phase_spinner, selection, workspace_context};

pub fn execute(args: ProcessArgs, root: Option<PathBuf>) -> Result<()> {
    let ctx = workspace_context(root)?;
    let config = load_merged_config(&ctx);

    let runtime = tokio::runtime::Runtime::new()?;
    let spinner = phase_spinner("Processing vendored grammars");
    let report = runtime.block_on(pipeline::process(&ctx, &config, selection(&args.only)));
    spinner.finish_and_clear();
    finish(report?)
}
