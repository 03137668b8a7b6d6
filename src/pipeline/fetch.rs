//! Vendor fetching - cloning grammar repositories.
//!
//! Unpinned entries get a shallow clone of the requested branch; pinned
//! entries need the full history so the recorded revision is reachable,
//! then a hard reset to it. Shallow fetch only works over real transports,
//! so local-path repositories are always cloned in full.

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{FetchOptions, Repository, ResetType};
use tracing::{debug, info};

use crate::catalog::LanguageEntry;
use crate::error::PipelineError;

/// Whether a repo location supports shallow fetch.
///
/// libgit2's local transport rejects depth-limited fetches, and scp-style
/// remotes don't parse as URLs, so only explicit network schemes qualify.
fn supports_shallow(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "git" | "ssh"),
        Err(_) => false,
    }
}

/// Clone `url` into `dest`, depth-limited when a depth is given and the
/// transport allows it. `None` means full history.
pub(crate) fn clone_repository(
    url: &str,
    branch: Option<&str>,
    depth: Option<i32>,
    dest: &Path,
) -> Result<Repository, git2::Error> {
    let mut fetch_options = FetchOptions::new();
    if let Some(depth) = depth {
        if supports_shallow(url) {
            fetch_options.depth(depth);
        }
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }
    builder.clone(url, dest)
}

/// Clone depth for an entry: pinned revisions need full history so the
/// recorded commit is reachable; everything else takes the configured
/// depth, defaulting to 1.
fn clone_depth_for(rev: Option<&str>, configured: Option<i32>) -> Option<i32> {
    match rev {
        Some(_) => None,
        None => Some(configured.unwrap_or(1).max(1)),
    }
}

/// Fetch one language's repository into `vendor_dir/<language>`.
pub async fn fetch(
    language: &str,
    entry: &LanguageEntry,
    vendor_dir: &Path,
    clone_depth: Option<i32>,
) -> crate::error::Result<()> {
    let dest = vendor_dir.join(language);
    info!("Cloning {}", entry.repo);

    let url = entry.repo.clone();
    let branch = entry.branch.clone();
    let rev = entry.rev.clone();
    let depth = clone_depth_for(entry.rev.as_deref(), clone_depth);
    let task_language = language.to_string();

    let result = tokio::task::spawn_blocking(move || -> Result<(), git2::Error> {
        let repo = clone_repository(&url, branch.as_deref(), depth, &dest)?;
        if let Some(rev) = rev {
            let object = repo.revparse_single(&rev)?;
            repo.reset(&object, ResetType::Hard, None)?;
            debug!("Checked out {} at {}", task_language, rev);
        }
        Ok(())
    })
    .await;

    let clone_error = |source: git2::Error| PipelineError::Clone {
        language: language.to_string(),
        url: entry.repo.clone(),
        source,
    };

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(clone_error(err)),
        Err(join_err) => Err(clone_error(git2::Error::from_str(&join_err.to_string()))),
    }
}
