//! `langpack vendor` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::VendorArgs;
use langpack::pipeline;
use langpack::util::config::load_merged_config;

use super::{finish, phase_spinner, selection, workspace_context};

pub fn execute(args: VendorArgs, root: Option<PathBuf>) -> Result<()> {
    let ctx = workspace_context(root)?;
    let config = load_merged_config(&ctx);

    let runtime = tokio::runtime::Runtime::new()?;
    let spinner = phase_spinner("Vendoring grammars");
    let report = runtime.block_on(pipeline::vendor(&ctx, &config, selection(&args.only)));
    spinner.finish_and_clear();
    finish(report?)
}
