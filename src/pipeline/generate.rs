//! Grammar generation via the tree-sitter CLI.
//!
//! Generation runs `tree-sitter generate --abi <N>` inside the grammar's
//! checkout directory. A non-zero exit is advisory: several grammars ship
//! sources that only partially regenerate, and the relocation stage will
//! catch the ones that produced nothing. Failing to invoke the tool at all
//! is fatal for the language.

use std::path::Path;

use tracing::{info, warn};

use crate::builder::platform::PlatformProfile;
use crate::catalog::LanguageEntry;
use crate::error::PipelineError;

/// Run generation for one language inside its vendor checkout.
pub async fn generate(
    language: &str,
    entry: &LanguageEntry,
    vendor_dir: &Path,
    tool: &Path,
    profile: PlatformProfile,
) -> crate::error::Result<()> {
    let checkout = vendor_dir.join(language);
    let target_dir = match &entry.directory {
        Some(dir) => checkout.join(dir),
        None => checkout,
    };

    info!("Generating {} with tree-sitter", language);

    let abi = entry.abi_version.to_string();
    let invocation = profile
        .tool_invocation(tool, &["generate", "--abi", &abi])
        .cwd(&target_dir);

    let output = invocation
        .exec_async()
        .await
        .map_err(|source| PipelineError::Generation {
            language: language.to_string(),
            source,
        })?;

    if output.status.success() {
        info!("Generated {} parser", language);
    } else {
        // Advisory only; a grammar that produced no sources fails at
        // relocation instead.
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            "tree-sitter generate exited with {:?} for `{}`: {}",
            output.status.code(),
            language,
            stderr.trim()
        );
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use tempfile::TempDir;

    fn fake_tool(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("tree-sitter");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn test_generate_runs_in_checkout_dir() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        std::fs::create_dir_all(vendor.join("widgetlang")).unwrap();
        let tool = fake_tool(tmp.path(), "echo \"$@\" > generated.txt");

        let entry = LanguageEntry::new("https://example.com/w");
        generate(
            "widgetlang",
            &entry,
            &vendor,
            &tool,
            PlatformProfile::host(),
        )
        .await
        .unwrap();

        let recorded =
            std::fs::read_to_string(vendor.join("widgetlang").join("generated.txt")).unwrap();
        assert_eq!(recorded.trim(), "generate --abi 14");
    }

    #[tokio::test]
    async fn test_generate_respects_subdirectory_and_abi() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        std::fs::create_dir_all(vendor.join("phplang").join("php_only")).unwrap();
        let tool = fake_tool(tmp.path(), "pwd > where.txt; echo \"$@\" >> where.txt");

        let mut entry = LanguageEntry::new("https://example.com/php");
        entry.directory = Some("php_only".to_string());
        entry.abi_version = 15;
        generate("phplang", &entry, &vendor, &tool, PlatformProfile::host())
            .await
            .unwrap();

        let recorded = std::fs::read_to_string(
            vendor.join("phplang").join("php_only").join("where.txt"),
        )
        .unwrap();
        assert!(recorded.contains("php_only"));
        assert!(recorded.contains("generate --abi 15"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_advisory() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        std::fs::create_dir_all(vendor.join("widgetlang")).unwrap();
        let tool = fake_tool(tmp.path(), "echo broken >&2; exit 3");

        let entry = LanguageEntry::new("https://example.com/w");
        let result = generate(
            "widgetlang",
            &entry,
            &vendor,
            &tool,
            PlatformProfile::host(),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_tool_is_fatal_for_language() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        std::fs::create_dir_all(vendor.join("widgetlang")).unwrap();

        let entry = LanguageEntry::new("https://example.com/w");
        let err = generate(
            "widgetlang",
            &entry,
            &vendor,
            Path::new("/nonexistent/tree-sitter"),
            PlatformProfile::host(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Generation { .. }));
        assert_eq!(err.language(), Some("widgetlang"));
    }
}
