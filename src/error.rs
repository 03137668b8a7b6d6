//! Pipeline error types.
//!
//! Per-language stage failures (`Clone`, `Generation`, `MissingSource`,
//! `Rewrite`) carry the language name so the orchestrator can report which
//! grammars failed without aborting the rest of the batch. `CatalogNotFound`
//! and `Configuration` are pre-flight errors that abort the whole run before
//! any per-language work is scheduled.

use std::path::PathBuf;

use thiserror::Error;

/// Error from a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("language catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    #[error("failed to read language catalog at {path}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse language catalog at {path}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to clone {url} for `{language}`")]
    Clone {
        language: String,
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("failed to run grammar generation for `{language}`")]
    Generation {
        language: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no generated sources for `{language}`: {path} does not exist")]
    MissingSource { language: String, path: PathBuf },

    #[error("failed to rewrite include paths in {path} for `{language}`")]
    Rewrite {
        language: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile grammar module for `{language}`: {message}")]
    Compile { language: String, message: String },

    #[error("{0}")]
    Configuration(String),

    #[error("I/O error for `{language}`")]
    Io {
        language: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// The language this error belongs to, if it is a per-language failure.
    ///
    /// Pre-flight errors (`CatalogNotFound`, `CatalogParse`, `Configuration`)
    /// return `None`; they abort the run before per-language work starts.
    pub fn language(&self) -> Option<&str> {
        match self {
            PipelineError::Clone { language, .. }
            | PipelineError::Generation { language, .. }
            | PipelineError::MissingSource { language, .. }
            | PipelineError::Rewrite { language, .. }
            | PipelineError::Compile { language, .. }
            | PipelineError::Io { language, .. } => Some(language),
            PipelineError::CatalogNotFound { .. }
            | PipelineError::CatalogRead { .. }
            | PipelineError::CatalogParse { .. }
            | PipelineError::Configuration(_) => None,
        }
    }

    /// Whether this error aborts the whole run rather than one language.
    pub fn is_fatal_to_run(&self) -> bool {
        self.language().is_none()
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_attribution() {
        let err = PipelineError::MissingSource {
            language: "widgetlang".to_string(),
            path: PathBuf::from("/tmp/vendor/widgetlang/src"),
        };
        assert_eq!(err.language(), Some("widgetlang"));
        assert!(!err.is_fatal_to_run());
    }

    #[test]
    fn test_preflight_errors_are_fatal() {
        let err = PipelineError::Configuration("tree-sitter not found on PATH".to_string());
        assert_eq!(err.language(), None);
        assert!(err.is_fatal_to_run());

        let err = PipelineError::CatalogNotFound {
            path: PathBuf::from("sources/languages.json"),
        };
        assert!(err.is_fatal_to_run());
    }

    #[test]
    fn test_error_display_names_language() {
        let err = PipelineError::MissingSource {
            language: "ada".to_string(),
            path: PathBuf::from("vendor/ada/src"),
        };
        let message = err.to_string();
        assert!(message.contains("ada"));
        assert!(message.contains("vendor/ada/src"));
    }
}
