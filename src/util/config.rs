//! Configuration file support for langpack.
//!
//! langpack supports two configuration file locations:
//! - Global: `~/.langpack/config.toml` - User-wide defaults
//! - Project: `.langpack/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::context::RootContext;

/// langpack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool overrides
    pub tools: ToolsConfig,

    /// Pipeline settings
    pub pipeline: PipelineConfig,
}

/// External tool overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the tree-sitter CLI (e.g. /usr/local/bin/tree-sitter).
    /// When unset, the CLI is discovered on PATH.
    #[serde(rename = "tree-sitter")]
    pub tree_sitter: Option<PathBuf>,
}

/// Pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of concurrent clone/process workers (None = auto-detect)
    pub workers: Option<usize>,

    /// Git clone depth for remote repositories (None = shallow, depth 1)
    pub clone_depth: Option<i32>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't
    /// exist or is malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).context("failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.tree_sitter.is_some() {
            self.tools.tree_sitter = other.tools.tree_sitter;
        }
        if other.pipeline.workers.is_some() {
            self.pipeline.workers = other.pipeline.workers;
        }
        if other.pipeline.clone_depth.is_some() {
            self.pipeline.clone_depth = other.pipeline.clone_depth;
        }
    }

    /// The effective worker count: configured value, or `min(32, cpus * 2)`.
    pub fn effective_workers(&self) -> usize {
        match self.pipeline.workers {
            Some(workers) if workers > 0 => workers,
            _ => default_worker_count(),
        }
    }
}

/// Default worker count when none is configured.
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).min(32)
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.langpack/config.toml)
/// 2. Global config (~/.langpack/config.toml)
/// 3. Defaults
pub fn load_merged_config(ctx: &RootContext) -> Config {
    let mut config = Config::default();

    let global_path = ctx.global_config_path();
    if global_path.exists() {
        config.merge(Config::load_or_default(&global_path));
    }

    let project_path = ctx.project_config_path();
    if project_path.exists() {
        config.merge(Config::load_or_default(&project_path));
    }

    config
}
