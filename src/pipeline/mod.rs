//! Vendoring pipeline orchestration.
//!
//! A pipeline run fans out one task per language with no ordering between
//! languages; within a language the stages are strictly fetch, then
//! generate (when flagged), then relocate. Stage failures are isolated to
//! their language and collected into a [`RunReport`]; only pre-flight
//! problems (missing catalog, missing tree-sitter CLI, missing checkouts in
//! process mode) abort the whole run before any task is scheduled.

pub mod fetch;
pub mod generate;
pub mod pin;
pub mod relocate;

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::info;

use crate::builder::platform::PlatformProfile;
use crate::catalog::{Catalog, CatalogStore, LanguageEntry};
use crate::error::PipelineError;
use crate::util::config::Config;
use crate::util::context::RootContext;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::process::find_executable;

/// Outcome of a fan-out run, with per-language failures kept out-of-band.
#[derive(Debug)]
pub struct RunReport {
    stage: String,
    succeeded: Vec<String>,
    failures: Vec<PipelineError>,
}

impl RunReport {
    pub fn new(stage: impl Into<String>) -> Self {
        RunReport {
            stage: stage.into(),
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_ok(&mut self, language: String) {
        self.succeeded.push(language);
    }

    pub fn record_err(&mut self, err: PipelineError) {
        match err.language() {
            Some(language) => {
                tracing::error!("{} failed for `{}`: {}", self.stage, language, DisplayChain(&err))
            }
            None => tracing::error!("{} failed: {}", self.stage, DisplayChain(&err)),
        }
        self.failures.push(err);
    }

    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    pub fn failures(&self) -> &[PipelineError] {
        &self.failures
    }

    /// Languages that failed, sorted and deduplicated.
    pub fn failed_languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .failures
            .iter()
            .filter_map(|err| err.language())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Log the terminal summary for this run.
    pub fn log_summary(&self) {
        let mut succeeded = self.succeeded.clone();
        succeeded.sort_unstable();
        if self.is_success() {
            info!("{} complete: {} language(s)", self.stage, succeeded.len());
        } else {
            let failed = self.failed_languages();
            tracing::warn!(
                "{} finished with failures: {} succeeded, {} failed ({})",
                self.stage,
                succeeded.len(),
                failed.len(),
                failed.join(", ")
            );
        }
    }
}

/// Renders an error with its source chain on one line.
struct DisplayChain<'a>(&'a PipelineError);

impl std::fmt::Display for DisplayChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(cause) = source {
            write!(f, ": {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}

/// Load the catalog, restricted to `selection` when given.
fn load_selected(ctx: &RootContext, selection: Option<&[String]>) -> crate::error::Result<Catalog> {
    let catalog = CatalogStore::new(ctx.catalog_path()).load()?;
    match selection {
        Some(names) => catalog.subset(names),
        None => Ok(catalog),
    }
}

/// Resolve the tree-sitter CLI if any selected entry needs generation.
///
/// Returns `None` when no entry generates; errors when generation is needed
/// but the tool cannot be found.
fn preflight_generator(
    config: &Config,
    catalog: &Catalog,
) -> crate::error::Result<Option<PathBuf>> {
    if !catalog.iter().any(|(_, entry)| entry.generate) {
        return Ok(None);
    }

    if let Some(configured) = &config.tools.tree_sitter {
        if configured.is_file() {
            return Ok(Some(configured.clone()));
        }
        return Err(PipelineError::Configuration(format!(
            "configured tree-sitter CLI not found at {}",
            configured.display()
        )));
    }

    find_executable("tree-sitter").map(Some).ok_or_else(|| {
        PipelineError::Configuration(
            "tree-sitter CLI not found on PATH; install it with `npm i -g tree-sitter-cli` \
             or set `tree-sitter` under [tools] in the config"
                .to_string(),
        )
    })
}

/// Clear stale state for the languages about to be processed.
///
/// A full run wipes the vendor and parsers roots wholesale; a selective run
/// only clears the selected languages so sibling artifacts survive.
fn reset_language_dirs(
    ctx: &RootContext,
    catalog: &Catalog,
    selective: bool,
    include_vendor: bool,
) -> anyhow::Result<()> {
    if selective {
        for name in catalog.names() {
            if include_vendor {
                remove_dir_all_if_exists(&ctx.vendor_dir().join(name))?;
            }
            remove_dir_all_if_exists(&ctx.parsers_dir().join(name))?;
        }
    } else {
        if include_vendor {
            remove_dir_all_if_exists(&ctx.vendor_dir())?;
        }
        remove_dir_all_if_exists(&ctx.parsers_dir())?;
    }
    ensure_dir(&ctx.parsers_dir())?;
    Ok(())
}

async fn collect(mut tasks: JoinSet<crate::error::Result<String>>, stage: &str) -> RunReport {
    let mut report = RunReport::new(stage);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(language)) => report.record_ok(language),
            Ok(Err(err)) => report.record_err(err),
            Err(err) => report.record_err(PipelineError::Configuration(format!(
                "pipeline task failed to join: {err}"
            ))),
        }
    }
    report
}

/// Fetch, generate, and relocate in sequence for one language.
async fn run_language(
    language: String,
    entry: LanguageEntry,
    vendor_dir: PathBuf,
    parsers_dir: PathBuf,
    tool: Option<PathBuf>,
    profile: PlatformProfile,
    fetch_first: bool,
    clone_depth: Option<i32>,
) -> crate::error::Result<String> {
    if fetch_first {
        fetch::fetch(&language, &entry, &vendor_dir, clone_depth).await?;
    }
    if entry.generate {
        let tool = tool.as_deref().ok_or_else(|| {
            PipelineError::Configuration("generation requested but no tree-sitter CLI resolved".to_string())
        })?;
        generate::generate(&language, &entry, &vendor_dir, tool, profile).await?;
    }
    relocate::relocate(&language, entry.directory.clone(), &vendor_dir, &parsers_dir).await?;
    Ok(language)
}

/// Run the full pipeline: clone every selected language, generate where
/// flagged, and relocate sources into the parsers root.
pub async fn vendor(
    ctx: &RootContext,
    config: &Config,
    selection: Option<&[String]>,
) -> anyhow::Result<RunReport> {
    let catalog = load_selected(ctx, selection)?;
    let tool = preflight_generator(config, &catalog)?;
    reset_language_dirs(ctx, &catalog, selection.is_some(), true)?;

    info!("Vendoring {} language(s)", catalog.len());

    let vendor_dir = ctx.vendor_dir();
    let parsers_dir = ctx.parsers_dir();
    let profile = PlatformProfile::host();

    let mut tasks: JoinSet<crate::error::Result<String>> = JoinSet::new();
    for (name, entry) in catalog {
        tasks.spawn(run_language(
            name,
            entry,
            vendor_dir.clone(),
            parsers_dir.clone(),
            tool.clone(),
            profile,
            true,
            config.pipeline.clone_depth,
        ));
    }

    let report = collect(tasks, "vendor").await;
    report.log_summary();
    Ok(report)
}

/// Re-run generation and relocation against existing vendor checkouts.
pub async fn process(
    ctx: &RootContext,
    config: &Config,
    selection: Option<&[String]>,
) -> anyhow::Result<RunReport> {
    let catalog = load_selected(ctx, selection)?;
    let tool = preflight_generator(config, &catalog)?;
    ensure_checkouts_exist(&ctx.vendor_dir(), &catalog)?;
    reset_language_dirs(ctx, &catalog, selection.is_some(), false)?;

    info!("Processing {} vendored language(s)", catalog.len());

    let vendor_dir = ctx.vendor_dir();
    let parsers_dir = ctx.parsers_dir();
    let profile = PlatformProfile::host();

    let mut tasks: JoinSet<crate::error::Result<String>> = JoinSet::new();
    for (name, entry) in catalog {
        tasks.spawn(run_language(
            name,
            entry,
            vendor_dir.clone(),
            parsers_dir.clone(),
            tool.clone(),
            profile,
            false,
            None,
        ));
    }

    let report = collect(tasks, "process").await;
    report.log_summary();
    Ok(report)
}

/// Every selected language must already have a non-empty checkout before
/// process mode may touch the parsers root.
fn ensure_checkouts_exist(vendor_dir: &Path, catalog: &Catalog) -> crate::error::Result<()> {
    let mut missing: Vec<&str> = Vec::new();
    for name in catalog.names() {
        let checkout = vendor_dir.join(name);
        let populated = std::fs::read_dir(&checkout)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !populated {
            missing.push(name);
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Configuration(format!(
            "no vendor checkout for: {}; run `langpack vendor` first",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn test_report_partitions_outcomes() {
        let mut report = RunReport::new("vendor");
        report.record_ok("ada".to_string());
        report.record_err(PipelineError::MissingSource {
            language: "zig".to_string(),
            path: PathBuf::from("vendor/zig/src"),
        });

        assert!(!report.is_success());
        assert_eq!(report.succeeded(), ["ada"]);
        assert_eq!(report.failed_languages(), ["zig"]);
    }

    #[test]
    fn test_preflight_skipped_without_generation() {
        let mut catalog = Catalog::new();
        catalog.insert("widgetlang", LanguageEntry::new("https://example.com/w"));

        let tool = preflight_generator(&Config::default(), &catalog).unwrap();
        assert!(tool.is_none());
    }

    #[test]
    fn test_preflight_rejects_bad_override() {
        let mut catalog = Catalog::new();
        let mut entry = LanguageEntry::new("https://example.com/w");
        entry.generate = true;
        catalog.insert("widgetlang", entry);

        let mut config = Config::default();
        config.tools.tree_sitter = Some(PathBuf::from("/nonexistent/tree-sitter"));

        let err = preflight_generator(&config, &catalog).unwrap_err();
        assert!(err.is_fatal_to_run());
    }

    #[test]
    fn test_missing_checkouts_are_preflight_errors() {
        let tmp = TempDir::new().unwrap();
        let vendor_dir = tmp.path().join("vendor");
        fs::create_dir_all(vendor_dir.join("ada")).unwrap();
        fs::write(vendor_dir.join("ada").join("grammar.js"), "x").unwrap();
        // zig has an empty checkout, ada a populated one.
        fs::create_dir_all(vendor_dir.join("zig")).unwrap();

        let mut catalog = Catalog::new();
        catalog.insert("ada", LanguageEntry::new("https://example.com/a"));
        catalog.insert("zig", LanguageEntry::new("https://example.com/z"));

        let err = ensure_checkouts_exist(&vendor_dir, &catalog).unwrap_err();
        assert!(err.to_string().contains("zig"));
        assert!(!err.to_string().contains("ada,"));
    }
}
