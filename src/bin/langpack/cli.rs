//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Langpack - a vendoring pipeline and runtime registry for tree-sitter grammars
#[derive(Parser)]
#[command(name = "langpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace root holding sources/, vendor/, parsers/ and bindings/
    #[arg(long, global = true, env = "LANGPACK_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone every catalog grammar and relocate its sources
    Vendor(VendorArgs),

    /// Re-run generation and relocation against existing checkouts
    Process(ProcessArgs),

    /// Pin catalog entries to their current branch heads
    Pin(PinArgs),

    /// Compile relocated parser sources into loadable modules
    Build(BuildArgs),

    /// List the languages the registry accepts
    Languages,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct VendorArgs {
    /// Restrict the run to these languages
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Restrict the run to these languages
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,
}

#[derive(Args)]
pub struct PinArgs {
    /// Pin only these languages
    #[arg(long, value_name = "NAME")]
    pub languages: Vec<String>,

    /// Skip entries that already carry a revision
    #[arg(long)]
    pub only_missing: bool,

    /// Number of concurrent revision lookups
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Emit the build plan as JSON (no build)
    #[arg(long)]
    pub plan: bool,

    /// Number of parallel compile jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
