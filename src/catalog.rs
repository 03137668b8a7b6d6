//! Language catalog parsing and persistence.
//!
//! The catalog is a JSON document mapping language names to grammar
//! definitions: where the grammar lives, which branch or commit to fetch,
//! and how to turn the checkout into compilable sources. It is the single
//! input that drives vendoring, generation, and the build plan.
//!
//! Entries are kept in a `BTreeMap` so every walk over the catalog is in
//! sorted name order, which keeps scheduling and reporting deterministic.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// ABI version passed to `tree-sitter generate` when an entry does not
/// request one explicitly.
pub const DEFAULT_ABI_VERSION: u32 = 14;

/// A single grammar definition from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    /// Git URL (or local path) of the grammar repository.
    pub repo: String,

    /// Branch to clone. Falls back to the repository default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Subdirectory of the repository holding the grammar, for monorepos
    /// that ship several grammars (e.g. `php/php_only`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Whether `tree-sitter generate` must run before the sources exist.
    #[serde(default, skip_serializing_if = "is_false")]
    pub generate: bool,

    /// Whether the grammar's sources reference a shared `common/` directory
    /// that the relocator must rewrite includes against.
    #[serde(default, skip_serializing_if = "is_false")]
    pub rewrite_targets: bool,

    /// ABI version for generation. Only meaningful when `generate` is set.
    #[serde(default = "default_abi_version", skip_serializing_if = "is_default_abi")]
    pub abi_version: u32,

    /// Pinned commit SHA. Absent until a pin run records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

fn default_abi_version() -> u32 {
    DEFAULT_ABI_VERSION
}

fn is_default_abi(version: &u32) -> bool {
    *version == DEFAULT_ABI_VERSION
}

fn is_false(value: &bool) -> bool {
    !value
}

impl LanguageEntry {
    /// Create an entry with only a repository URL, all knobs at their
    /// defaults.
    pub fn new(repo: impl Into<String>) -> Self {
        LanguageEntry {
            repo: repo.into(),
            branch: None,
            directory: None,
            generate: false,
            rewrite_targets: false,
            abi_version: DEFAULT_ABI_VERSION,
            rev: None,
        }
    }
}

/// The full language catalog, keyed by language name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, LanguageEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&LanguageEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: LanguageEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Language names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate entries in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LanguageEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Restrict the catalog to the given languages.
    ///
    /// Names not present in the catalog are a configuration error; the
    /// message lists every unknown name so a typo in a batch invocation
    /// surfaces all at once.
    pub fn subset(&self, names: &[String]) -> crate::error::Result<Catalog> {
        let unknown: Vec<&str> = names
            .iter()
            .filter(|name| !self.entries.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "unknown language(s): {}",
                unknown.join(", ")
            )));
        }
        let entries = names
            .iter()
            .map(|name| (name.clone(), self.entries[name].clone()))
            .collect();
        Ok(Catalog { entries })
    }

    /// Record a pinned commit for a language. Returns false when the
    /// language is not in the catalog.
    pub fn set_revision(&mut self, name: &str, rev: impl Into<String>) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.rev = Some(rev.into());
                true
            }
            None => false,
        }
    }
}

impl IntoIterator for Catalog {
    type Item = (String, LanguageEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, LanguageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, LanguageEntry)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, LanguageEntry)>>(iter: I) -> Self {
        Catalog {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Loads and saves the catalog file on disk.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CatalogStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where `save` keeps the previous catalog contents.
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// Read and parse the catalog.
    pub fn load(&self) -> crate::error::Result<Catalog> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::CatalogNotFound {
                    path: self.path.clone(),
                });
            }
            Err(err) => {
                return Err(PipelineError::CatalogRead {
                    path: self.path.clone(),
                    source: err,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|err| PipelineError::CatalogParse {
            path: self.path.clone(),
            source: err,
        })
    }

    /// Write the catalog back atomically, keeping a `.json.bak` copy of the
    /// previous contents alongside it.
    pub fn save(&self, catalog: &Catalog) -> anyhow::Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        if self.path.exists() {
            let backup = self.backup_path();
            std::fs::copy(&self.path, &backup).with_context(|| {
                format!("failed to back up catalog to {}", backup.display())
            })?;
        } else {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create catalog directory: {}", parent.display())
            })?;
        }

        let mut contents = serde_json::to_string_pretty(catalog)
            .context("failed to serialize language catalog")?;
        contents.push('\n');

        // Write-then-rename so a crash mid-save never truncates the catalog.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .context("failed to create temporary catalog file")?;
        tmp.write_all(contents.as_bytes())
            .context("failed to write temporary catalog file")?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to write catalog: {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert(
            "widgetlang",
            LanguageEntry::new("https://example.com/tree-sitter-widgetlang"),
        );
        catalog.insert("adalang", {
            let mut entry = LanguageEntry::new("https://example.com/tree-sitter-adalang");
            entry.generate = true;
            entry.abi_version = 15;
            entry
        });
        catalog
    }

    #[test]
    fn test_minimal_entry_defaults() {
        let json = r#"{
            "widgetlang": {"repo": "https://example.com/tree-sitter-widgetlang"}
        }"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        let entry = catalog.get("widgetlang").unwrap();
        assert_eq!(entry.repo, "https://example.com/tree-sitter-widgetlang");
        assert_eq!(entry.branch, None);
        assert_eq!(entry.directory, None);
        assert!(!entry.generate);
        assert!(!entry.rewrite_targets);
        assert_eq!(entry.abi_version, DEFAULT_ABI_VERSION);
        assert_eq!(entry.rev, None);
    }

    #[test]
    fn test_default_fields_are_not_serialized() {
        let mut catalog = Catalog::new();
        catalog.insert("widgetlang", LanguageEntry::new("https://example.com/w"));
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.contains("repo"));
        assert!(!json.contains("generate"));
        assert!(!json.contains("abi_version"));
        assert!(!json.contains("rev"));
    }

    #[test]
    fn test_names_are_sorted() {
        let catalog = sample_catalog();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["adalang", "widgetlang"]);
    }

    #[test]
    fn test_subset_rejects_unknown_languages() {
        let catalog = sample_catalog();
        let err = catalog
            .subset(&["widgetlang".to_string(), "nosuch".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("nosuch"));
        assert!(err.is_fatal_to_run());

        let subset = catalog.subset(&["widgetlang".to_string()]).unwrap();
        assert_eq!(subset.len(), 1);
        assert!(subset.contains("widgetlang"));
    }

    #[test]
    fn test_set_revision() {
        let mut catalog = sample_catalog();
        assert!(catalog.set_revision("widgetlang", "deadbeef"));
        assert!(!catalog.set_revision("nosuch", "deadbeef"));
        assert_eq!(
            catalog.get("widgetlang").unwrap().rev.as_deref(),
            Some("deadbeef")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("languages.json"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, PipelineError::CatalogNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("languages.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = CatalogStore::new(&path).load().unwrap_err();
        assert!(matches!(err, PipelineError::CatalogParse { .. }));
    }

    #[test]
    fn test_save_round_trips_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("languages.json"));

        let first = sample_catalog();
        store.save(&first).unwrap();
        assert!(!store.backup_path().exists());
        assert_eq!(store.load().unwrap(), first);

        let mut second = first.clone();
        second.set_revision("widgetlang", "cafe1234");
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), second);
        // The backup holds the catalog as it was before the second save.
        let backup: Catalog =
            serde_json::from_str(&std::fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup, first);
    }
}
