//! Langpack CLI - grammar vendoring pipeline and runtime registry

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("langpack=debug")
    } else {
        EnvFilter::new("langpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Vendor(args) => commands::vendor::execute(args, cli.root),
        Commands::Process(args) => commands::process::execute(args, cli.root),
        Commands::Pin(args) => commands::pin::execute(args, cli.root),
        Commands::Build(args) => commands::build::execute(args, cli.root),
        Commands::Languages => commands::languages::execute(cli.root),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
