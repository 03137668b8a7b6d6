//! `langpack languages` command

use std::path::PathBuf;

use anyhow::Result;

use langpack::Registry;

use super::workspace_context;

pub fn execute(root: Option<PathBuf>) -> Result<()> {
    let ctx = workspace_context(root)?;
    let registry = Registry::new(&ctx);

    for name in registry.supported_names() {
        println!("{name}");
    }

    Ok(())
}
