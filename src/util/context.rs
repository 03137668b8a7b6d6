//! Root context for langpack operations.
//!
//! Provides centralized access to the project root and the directory layout
//! hanging off it. Every pipeline stage takes paths from here rather than
//! computing them ad hoc, so the layout is defined in exactly one place:
//!
//! - `sources/languages.json` - the language catalog
//! - `sources/language-binding.c` - the shared binding glue compiled into
//!   every grammar module
//! - `vendor/` - cloned grammar repositories
//! - `parsers/` - relocated, compilable sources per language
//! - `bindings/` - compiled grammar modules

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Environment variable overriding the project root.
pub const ROOT_ENV: &str = "LANGPACK_ROOT";

/// Project directories for langpack
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "langpack", "langpack"));

/// Root context containing the resolved project root and global paths.
#[derive(Debug, Clone)]
pub struct RootContext {
    /// Project root holding sources/, vendor/, parsers/ and bindings/
    root: PathBuf,

    /// Home directory for global langpack data (~/.langpack/)
    home: PathBuf,
}

impl RootContext {
    /// Create a context, resolving the root from `LANGPACK_ROOT` or the
    /// current directory.
    pub fn new() -> Result<Self> {
        let root = match std::env::var_os(ROOT_ENV) {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().context("failed to get current directory")?,
        };
        Ok(Self::with_root(root))
    }

    /// Create a context rooted at a specific directory.
    pub fn with_root(root: PathBuf) -> Self {
        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.config_dir().to_path_buf()
        } else {
            // Fallback to ~/.langpack
            directories::BaseDirs::new()
                .map(|b| b.home_dir().join(".langpack"))
                .unwrap_or_else(|| PathBuf::from(".langpack"))
        };

        RootContext { root, home }
    }

    /// Get the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory holding the catalog and binding glue.
    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    /// Get the language catalog path.
    pub fn catalog_path(&self) -> PathBuf {
        self.sources_dir().join("languages.json")
    }

    /// Get the binding glue source compiled into every grammar module.
    pub fn binding_source_path(&self) -> PathBuf {
        self.sources_dir().join("language-binding.c")
    }

    /// Get the directory grammar repositories are cloned into.
    pub fn vendor_dir(&self) -> PathBuf {
        self.root.join("vendor")
    }

    /// Get the directory relocated parser sources live in.
    pub fn parsers_dir(&self) -> PathBuf {
        self.root.join("parsers")
    }

    /// Get the directory compiled grammar modules are written to.
    pub fn bindings_dir(&self) -> PathBuf {
        self.root.join("bindings")
    }

    /// Get the global configuration file path.
    pub fn global_config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project-local configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        self.root.join(".langpack").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_hangs_off_root() {
        let ctx = RootContext::with_root(PathBuf::from("/work/pack"));
        assert_eq!(ctx.root(), Path::new("/work/pack"));
        assert_eq!(
            ctx.catalog_path(),
            Path::new("/work/pack/sources/languages.json")
        );
        assert_eq!(
            ctx.binding_source_path(),
            Path::new("/work/pack/sources/language-binding.c")
        );
        assert_eq!(ctx.vendor_dir(), Path::new("/work/pack/vendor"));
        assert_eq!(ctx.parsers_dir(), Path::new("/work/pack/parsers"));
        assert_eq!(ctx.bindings_dir(), Path::new("/work/pack/bindings"));
    }

    #[test]
    fn test_project_config_is_under_root() {
        let ctx = RootContext::with_root(PathBuf::from("/work/pack"));
        assert_eq!(
            ctx.project_config_path(),
            Path::new("/work/pack/.langpack/config.toml")
        );
    }
}
