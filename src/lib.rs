//! Langpack - a vendoring pipeline and runtime registry for tree-sitter
//! grammars
//!
//! This crate provides the core library functionality for langpack:
//! the language catalog, the fetch/generate/relocate pipeline, the
//! extension build planner and compiler, and the runtime registry that
//! resolves language names to loadable grammar bindings.

pub mod builder;
pub mod catalog;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod util;

/// Test fixtures for langpack tests.
///
/// Builds throwaway grammar repositories with committed parser sources,
/// used by both unit tests and the CLI integration tests.
pub mod test_support;

pub use catalog::{Catalog, CatalogStore, LanguageEntry};
pub use error::{PipelineError, Result};
pub use registry::{get_language, get_parser, supported_names, LookupError, Registry};
pub use util::context::RootContext;
pub use util::Config;
