//! Source relocation and include rewriting.
//!
//! Relocation empties the grammar's `src/` into `parsers/<language>/`,
//! bringing the shared `common/` directory along when the checkout has
//! one. Grammar sources reference common through parent-relative includes
//! written for the checkout layout (`"../../common/scanner.h"`); once the
//! files move those paths dangle, so every compiled source under the
//! target is rewritten with the correct relative path from its own
//! location to the relocated `common/`. The rewrite is per-file because
//! files sit at different depths.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::PipelineError;
use crate::util::fs::{forward_slashed, move_dir, move_dir_entries, relative_path};

/// Any run of parent segments ending in a `common` segment, with either
/// separator so sources written on Windows match too.
static COMMON_INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\.[/\\](?:\.\.[/\\])*common[/\\]").unwrap());

/// Relocate one language's sources out of its vendor checkout.
pub async fn relocate(
    language: &str,
    subdirectory: Option<String>,
    vendor_dir: &Path,
    parsers_dir: &Path,
) -> crate::error::Result<()> {
    let task_language = language.to_string();
    let vendor_dir = vendor_dir.to_path_buf();
    let parsers_dir = parsers_dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        relocate_language(
            &task_language,
            subdirectory.as_deref(),
            &vendor_dir,
            &parsers_dir,
        )
    })
    .await
    .map_err(|join_err| PipelineError::Io {
        language: language.to_string(),
        source: std::io::Error::other(join_err.to_string()),
    })?
}

/// Blocking core of [`relocate`].
pub fn relocate_language(
    language: &str,
    subdirectory: Option<&str>,
    vendor_dir: &Path,
    parsers_dir: &Path,
) -> crate::error::Result<()> {
    let checkout = vendor_dir.join(language);
    let grammar_dir = match subdirectory {
        Some(dir) => checkout.join(dir),
        None => checkout.clone(),
    };
    let source_dir = grammar_dir.join("src");
    if !source_dir.is_dir() {
        return Err(PipelineError::MissingSource {
            language: language.to_string(),
            path: source_dir,
        });
    }

    let io_error = |err: anyhow::Error| PipelineError::Io {
        language: language.to_string(),
        source: std::io::Error::other(err),
    };

    debug!("Relocating {} sources", language);
    let target = parsers_dir.join(language);
    move_dir_entries(&source_dir, &target).map_err(io_error)?;

    // The shared directory lives at the checkout root even for monorepo
    // grammars.
    let common_dir = checkout.join("common");
    if common_dir.is_dir() {
        debug!("Relocating {} common sources", language);
        move_dir(&common_dir, &target.join("common")).map_err(io_error)?;
        rewrite_common_includes(language, &target)?;
    }

    Ok(())
}

/// Rewrite `common` includes in every compiled source under `target`.
pub fn rewrite_common_includes(language: &str, target: &Path) -> crate::error::Result<()> {
    let common = target.join("common");

    for entry in WalkDir::new(target).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("c") {
            continue;
        }

        let rewrite_error = |source: std::io::Error| PipelineError::Rewrite {
            language: language.to_string(),
            path: path.to_path_buf(),
            source,
        };

        let contents = std::fs::read_to_string(path).map_err(rewrite_error)?;

        let parent = path.parent().unwrap_or(target);
        let rel = relative_path(parent, &common);
        // A file inside common/ itself resolves to an empty relative path.
        let mut replacement = if rel.as_os_str().is_empty() {
            ".".to_string()
        } else {
            forward_slashed(&rel)
        };
        replacement.push('/');

        match COMMON_INCLUDE_RE.replace_all(&contents, NoExpand(&replacement)) {
            Cow::Owned(rewritten) => {
                debug!("Rewrote common includes in {}", path.display());
                std::fs::write(path, rewritten).map_err(rewrite_error)?;
            }
            Cow::Borrowed(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_relocation_flattens_src() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        let parsers = tmp.path().join("parsers");

        let src = vendor.join("widgetlang").join("src");
        fs::create_dir_all(src.join("tree_sitter")).unwrap();
        fs::write(src.join("parser.c"), "int x;").unwrap();
        fs::write(src.join("tree_sitter").join("parser.h"), "// h").unwrap();

        relocate_language("widgetlang", None, &vendor, &parsers).unwrap();

        let target = parsers.join("widgetlang");
        assert!(target.join("parser.c").exists());
        assert!(target.join("tree_sitter").join("parser.h").exists());
    }

    #[test]
    fn test_relocation_honors_subdirectory_and_common() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        let parsers = tmp.path().join("parsers");

        let checkout = vendor.join("phplang");
        let src = checkout.join("php_only").join("src");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(checkout.join("common")).unwrap();
        fs::write(
            src.join("scanner.c"),
            "#include \"../../common/scanner.h\"\n",
        )
        .unwrap();
        fs::write(checkout.join("common").join("scanner.h"), "// h").unwrap();

        relocate_language("phplang", Some("php_only"), &vendor, &parsers).unwrap();

        let target = parsers.join("phplang");
        assert!(target.join("common").join("scanner.h").exists());
        assert_eq!(
            read(&target.join("scanner.c")),
            "#include \"common/scanner.h\"\n"
        );
    }

    #[test]
    fn test_missing_src_is_fatal_for_language() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        let parsers = tmp.path().join("parsers");
        fs::create_dir_all(vendor.join("widgetlang")).unwrap();

        let err = relocate_language("widgetlang", None, &vendor, &parsers).unwrap_err();
        match err {
            PipelineError::MissingSource { language, path } => {
                assert_eq!(language, "widgetlang");
                assert!(path.ends_with("src"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rewrite_is_depth_correct() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("parsers").join("widgetlang");
        fs::create_dir_all(target.join("common")).unwrap();
        fs::create_dir_all(target.join("nested")).unwrap();
        fs::write(target.join("common").join("x.h"), "// h").unwrap();
        fs::write(target.join("top.c"), "#include \"../common/x.h\"\n").unwrap();
        fs::write(
            target.join("nested").join("deep.c"),
            "#include \"../../common/x.h\"\n",
        )
        .unwrap();

        rewrite_common_includes("widgetlang", &target).unwrap();

        // Each file gets the relative path correct for its own depth.
        assert_eq!(read(&target.join("top.c")), "#include \"common/x.h\"\n");
        assert_eq!(
            read(&target.join("nested").join("deep.c")),
            "#include \"../common/x.h\"\n"
        );

        // Both rewritten includes resolve to the same physical header.
        let top_resolved = target.join("common/x.h").canonicalize().unwrap();
        let deep_resolved = target
            .join("nested")
            .join("../common/x.h")
            .canonicalize()
            .unwrap();
        assert_eq!(top_resolved, deep_resolved);
    }

    #[test]
    fn test_rewrite_handles_deep_parent_chains_and_backslashes() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("parsers").join("widgetlang");
        fs::create_dir_all(target.join("common")).unwrap();
        fs::write(
            target.join("a.c"),
            "#include \"../../../common/y.h\"\n#include \"..\\..\\common\\z.h\"\n",
        )
        .unwrap();

        rewrite_common_includes("widgetlang", &target).unwrap();

        assert_eq!(
            read(&target.join("a.c")),
            "#include \"common/y.h\"\n#include \"common/z.h\"\n"
        );
    }

    #[test]
    fn test_rewrite_inside_common_itself() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("parsers").join("widgetlang");
        fs::create_dir_all(target.join("common")).unwrap();
        fs::write(
            target.join("common").join("helper.c"),
            "#include \"../common/scanner.h\"\n",
        )
        .unwrap();

        rewrite_common_includes("widgetlang", &target).unwrap();

        assert_eq!(
            read(&target.join("common").join("helper.c")),
            "#include \"./scanner.h\"\n"
        );
    }

    #[test]
    fn test_headers_are_left_alone() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("parsers").join("widgetlang");
        fs::create_dir_all(target.join("common")).unwrap();
        fs::write(target.join("scanner.h"), "#include \"../common/x.h\"\n").unwrap();

        rewrite_common_includes("widgetlang", &target).unwrap();

        assert_eq!(read(&target.join("scanner.h")), "#include \"../common/x.h\"\n");
    }
}
