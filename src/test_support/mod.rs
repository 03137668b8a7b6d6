//! Test utilities for langpack tests.
//!
//! The pipeline fetches git repositories and compiles C sources, so its
//! tests need grammar repositories that behave like the real thing without
//! the network. [`GrammarFixture`] builds a local git repository shaped
//! like a tree-sitter grammar checkout: a `src/` directory with a
//! compilable stub parser, optionally nested under a monorepo
//! subdirectory, optionally with a shared `common/` directory referenced
//! through the relative includes the rewriter must fix up.
//!
//! The stub parser exports a `tree_sitter_<name>` symbol returning a
//! buffer whose first word is the ABI version, which is all the grammar
//! runtime inspects before a parse is attempted. Fixtures must never be
//! parsed with.
//!
//! # Example
//!
//! ```rust,ignore
//! use langpack::test_support::GrammarFixture;
//!
//! let dir = tempfile::TempDir::new().unwrap();
//! let rev = GrammarFixture::new("widgetlang")
//!     .with_common()
//!     .create(dir.path())
//!     .unwrap();
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{IndexAddOption, Repository, Signature};

/// Builder for a local grammar repository fixture.
#[derive(Debug, Clone)]
pub struct GrammarFixture {
    /// Language name, used for the exported grammar symbol.
    pub name: String,
    /// Monorepo subdirectory holding the grammar, if any.
    pub subdirectory: Option<String>,
    /// Whether to add a shared `common/` directory and a scanner that
    /// includes from it.
    pub common: bool,
}

impl GrammarFixture {
    pub fn new(name: impl Into<String>) -> Self {
        GrammarFixture {
            name: name.into(),
            subdirectory: None,
            common: false,
        }
    }

    /// Nest the grammar under a monorepo subdirectory.
    pub fn subdirectory(mut self, dir: impl Into<String>) -> Self {
        self.subdirectory = Some(dir.into());
        self
    }

    /// Add a `common/` directory at the repository root and a scanner
    /// source that reaches it through parent-relative includes.
    pub fn with_common(mut self) -> Self {
        self.common = true;
        self
    }

    fn grammar_dir(&self, root: &Path) -> PathBuf {
        match &self.subdirectory {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }

    /// Write the tree and commit it, returning the commit id.
    pub fn create(&self, root: &Path) -> Result<String> {
        let grammar_dir = self.grammar_dir(root);
        let src_dir = grammar_dir.join("src");
        std::fs::create_dir_all(src_dir.join("tree_sitter"))?;

        std::fs::write(
            grammar_dir.join("grammar.js"),
            format!("module.exports = grammar({{ name: '{}' }});\n", self.name),
        )?;
        std::fs::write(
            src_dir.join("tree_sitter").join("parser.h"),
            "#pragma once\n",
        )?;
        std::fs::write(src_dir.join("parser.c"), stub_parser_source(&self.name))?;

        if self.common {
            let common_dir = root.join("common");
            std::fs::create_dir_all(&common_dir)?;
            std::fs::write(
                common_dir.join("scanner.h"),
                "#pragma once\nstatic const int shared_scanner_state = 1;\n",
            )?;
            std::fs::write(
                src_dir.join("scanner.c"),
                "#include \"../../common/scanner.h\"\n\nint stub_scanner(void) { return shared_scanner_state; }\n",
            )?;
        }

        let repo = Repository::init(root)
            .with_context(|| format!("failed to init fixture repo at {}", root.display()))?;
        commit_all(&repo, "add grammar")
    }
}

/// Stage everything and commit, returning the new commit id.
pub fn commit_all(repo: &Repository, message: &str) -> Result<String> {
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let sig = Signature::now("langpack tests", "tests@langpack.invalid")?;
    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let commit_id = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
    Ok(commit_id.to_string())
}

/// Add a file to an existing fixture repository and commit it.
pub fn commit_file(root: &Path, rel_path: &str, contents: &str, message: &str) -> Result<String> {
    let path = root.join(rel_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, contents)?;

    let repo = Repository::open(root)
        .with_context(|| format!("failed to open fixture repo at {}", root.display()))?;
    commit_all(&repo, message)
}

/// Stub parser source exporting `tree_sitter_<name>`.
///
/// The returned buffer's first word is the language ABI version; the rest
/// is zeroed. That satisfies the version check performed when a language
/// is installed into a parser, and nothing else.
pub fn stub_parser_source(name: &str) -> String {
    format!(
        r#"#include "tree_sitter/parser.h"

static const unsigned int language_data[1024] = {{14}};

#ifdef _WIN32
__declspec(dllexport)
#else
__attribute__((visibility("default")))
#endif
const void *tree_sitter_{name}(void) {{
    return language_data;
}}
"#
    )
}

/// Write a catalog file under `root/sources/languages.json`.
pub fn write_catalog(root: &Path, contents: &str) -> Result<PathBuf> {
    let sources = root.join("sources");
    std::fs::create_dir_all(&sources)?;
    let path = sources.join("languages.json");
    std::fs::write(&path, contents)?;
    Ok(path)
}
