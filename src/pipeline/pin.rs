//! Revision pinning.
//!
//! Resolves each catalog entry's branch head to a commit id and records
//! it as the entry's `rev`, so later vendor runs are reproducible. Every
//! resolution happens in a throwaway clone that is deleted whether or not
//! the lookup succeeds; nothing under the workspace root is touched except
//! the catalog file itself.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::catalog::CatalogStore;
use crate::error::PipelineError;
use crate::pipeline::{fetch, RunReport};
use crate::util::{Config, RootContext};

/// Pin selected catalog entries to their current branch heads.
///
/// Entries that fail to resolve keep their previous revision; the merged
/// catalog is written back even when some lookups fail, so a partial run
/// still makes progress.
pub async fn pin(
    ctx: &RootContext,
    config: &Config,
    selection: Option<&[String]>,
    only_missing: bool,
) -> anyhow::Result<RunReport> {
    let store = CatalogStore::new(ctx.catalog_path());
    let mut catalog = store.load()?;
    let selected = match selection {
        Some(names) => catalog.subset(names)?,
        None => catalog.clone(),
    };

    let workers = config.effective_workers();
    debug!("Pinning with up to {} concurrent lookups", workers);
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks: JoinSet<crate::error::Result<(String, String)>> = JoinSet::new();

    for (language, entry) in selected {
        if only_missing && entry.rev.is_some() {
            info!("Skipping {} (already pinned)", language);
            continue;
        }
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // Closed only on runtime shutdown.
            let _permit = semaphore.acquire_owned().await.map_err(|err| {
                PipelineError::Configuration(format!("worker pool closed: {err}"))
            })?;
            let task_language = language.clone();
            tokio::task::spawn_blocking(move || {
                resolve_head(&task_language, &entry.repo, entry.branch.as_deref())
                    .map(|rev| (task_language.clone(), rev))
            })
            .await
            .map_err(|err| PipelineError::Io {
                language,
                source: std::io::Error::other(err.to_string()),
            })?
        });
    }

    let mut report = RunReport::new("pin");
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((language, rev))) => {
                info!("Pinned {} to {}", language, rev);
                catalog.set_revision(&language, rev);
                report.record_ok(language);
            }
            Ok(Err(err)) => report.record_err(err),
            Err(err) => report.record_err(PipelineError::Configuration(format!(
                "pin task failed to join: {err}"
            ))),
        }
    }

    store.save(&catalog)?;
    report.log_summary();
    Ok(report)
}

/// Resolve the head commit of `url` (on `branch` when given) via a
/// temporary clone.
fn resolve_head(language: &str, url: &str, branch: Option<&str>) -> crate::error::Result<String> {
    let clone_error = |source: git2::Error| PipelineError::Clone {
        language: language.to_string(),
        url: url.to_string(),
        source,
    };

    let tmp = tempfile::TempDir::new().map_err(|source| PipelineError::Io {
        language: language.to_string(),
        source,
    })?;

    debug!("Resolving head of {} in {}", url, tmp.path().display());
    let repo = fetch::clone_repository(url, branch, Some(1), tmp.path()).map_err(clone_error)?;
    let head = repo.head().map_err(clone_error)?;
    let commit = head.peel_to_commit().map_err(clone_error)?;
    Ok(commit.id().to_string())
}
