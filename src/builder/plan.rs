//! Build plan generation.
//!
//! A build plan describes one compilation unit per relocated language: the
//! shared binding glue plus every C file directly under
//! `parsers/<language>/`, compiled into `bindings/<language>.<ext>`.
//! Languages are discovered by scanning the parsers directory rather than
//! the catalog, so a plan always reflects what actually survived vendoring
//! and relocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::builder::platform::PlatformProfile;
use crate::error::PipelineError;
use crate::util::context::RootContext;
use crate::util::fs::glob_files;

/// A complete build plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    /// One unit per language, in sorted name order
    pub units: Vec<BuildUnit>,

    /// Languages left out of the plan because their directory held no
    /// compilable sources. The build reports these as failures without
    /// blocking the units that can compile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedLanguage>,
}

/// A language excluded from the plan, with the directory that came up
/// empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedLanguage {
    pub language: String,
    pub path: PathBuf,
}

impl BuildPlan {
    /// Render the plan as pretty JSON for `build --plan`.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}

/// Compilation of one grammar module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildUnit {
    /// Language name the module is built for
    pub language: String,

    /// Source files: the binding glue first, then the parser sources
    pub sources: Vec<PathBuf>,

    /// Include directories (the language's src directory)
    pub include_dirs: Vec<PathBuf>,

    /// Preprocessor defines (name, optional value)
    pub defines: Vec<(String, Option<String>)>,

    /// Compiler flags from the platform profile
    pub cflags: Vec<String>,

    /// Output module path
    pub output: PathBuf,
}

/// Plan builds for every language with relocated sources.
pub fn plan(ctx: &RootContext, profile: &PlatformProfile) -> crate::error::Result<BuildPlan> {
    let binding_source = ctx.binding_source_path();
    if !binding_source.is_file() {
        return Err(PipelineError::Configuration(format!(
            "binding glue not found at {}",
            binding_source.display()
        )));
    }

    let parsers_dir = ctx.parsers_dir();
    let mut languages: Vec<String> = match std::fs::read_dir(&parsers_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => {
            return Err(PipelineError::Configuration(format!(
                "no parser sources at {}; run `langpack vendor` first",
                parsers_dir.display()
            )));
        }
    };
    languages.sort();

    let mut units = Vec::with_capacity(languages.len());
    let mut skipped = Vec::new();
    for language in languages {
        match plan_unit(ctx, profile, &language, &binding_source) {
            Ok(unit) => units.push(unit),
            // Generation failures are advisory, so a language can reach the
            // parsers root with nothing compilable in it. It fails alone.
            Err(PipelineError::MissingSource { language, path }) => {
                warn!("No compilable sources for `{}` under {}", language, path.display());
                skipped.push(SkippedLanguage { language, path });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(BuildPlan { units, skipped })
}

fn plan_unit(
    ctx: &RootContext,
    profile: &PlatformProfile,
    language: &str,
    binding_source: &Path,
) -> crate::error::Result<BuildUnit> {
    let lang_dir = ctx.parsers_dir().join(language);

    // Non-recursive on purpose: files under common/ are pulled in through
    // #include, not compiled standalone.
    let parser_sources = glob_files(&lang_dir, &["*.c".to_string()]).map_err(|err| {
        PipelineError::Io {
            language: language.to_string(),
            source: std::io::Error::other(err.to_string()),
        }
    })?;
    if parser_sources.is_empty() {
        return Err(PipelineError::MissingSource {
            language: language.to_string(),
            path: lang_dir,
        });
    }

    let mut sources = vec![binding_source.to_path_buf()];
    sources.extend(parser_sources);

    let output = ctx
        .bindings_dir()
        .join(format!("{}.{}", language, profile.module_extension()));

    Ok(BuildUnit {
        language: language.to_string(),
        sources,
        include_dirs: vec![lang_dir],
        defines: vec![(
            "TS_LANGUAGE_NAME".to_string(),
            Some(language.to_string()),
        )],
        cflags: profile
            .compile_flags()
            .iter()
            .map(|flag| flag.to_string())
            .collect(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    use crate::builder::platform::Flavor;

    fn scaffold(root: &std::path::Path, languages: &[&str]) {
        fs::create_dir_all(root.join("sources")).unwrap();
        fs::write(root.join("sources").join("language-binding.c"), "// glue").unwrap();
        for language in languages {
            let lang_dir = root.join("parsers").join(language);
            fs::create_dir_all(&lang_dir).unwrap();
            fs::write(lang_dir.join("parser.c"), "int x;").unwrap();
        }
    }

    #[test]
    fn test_plan_orders_languages_and_sources() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path(), &["zig", "ada"]);
        // One language with a scanner as well, plus headers that must not
        // show up as compile inputs.
        fs::write(tmp.path().join("parsers/zig/scanner.c"), "int y;").unwrap();
        fs::create_dir_all(tmp.path().join("parsers/zig/common")).unwrap();
        fs::write(tmp.path().join("parsers/zig/common/scanner.h"), "// h").unwrap();

        let ctx = RootContext::with_root(tmp.path().to_path_buf());
        let profile = PlatformProfile::new(Flavor::Posix);
        let plan = plan(&ctx, &profile).unwrap();

        let names: Vec<&str> = plan.units.iter().map(|u| u.language.as_str()).collect();
        assert_eq!(names, ["ada", "zig"]);

        let zig = &plan.units[1];
        // Glue comes first, then parser sources in sorted order.
        assert_eq!(zig.sources[0], ctx.binding_source_path());
        assert_eq!(zig.sources.len(), 3);
        assert!(zig.sources[1].ends_with("parser.c"));
        assert!(zig.sources[2].ends_with("scanner.c"));
        assert_eq!(zig.include_dirs, vec![tmp.path().join("parsers/zig")]);
        assert_eq!(
            zig.defines,
            vec![("TS_LANGUAGE_NAME".to_string(), Some("zig".to_string()))]
        );
        assert_eq!(zig.cflags, ["-fvisibility=hidden", "-std=c11"]);
        assert!(zig.output.ends_with("bindings/zig.so"));
    }

    #[test]
    fn test_plan_requires_binding_glue() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("parsers/ada")).unwrap();

        let ctx = RootContext::with_root(tmp.path().to_path_buf());
        let err = plan(&ctx, &PlatformProfile::new(Flavor::Posix)).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.is_fatal_to_run());
    }

    #[test]
    fn test_plan_skips_language_without_sources() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path(), &["goodlang"]);
        // A generate-only grammar can relocate metadata without ever
        // producing a .c file; it must not block the others.
        let broken = tmp.path().join("parsers").join("brokenlang");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("node-types.json"), "[]").unwrap();

        let ctx = RootContext::with_root(tmp.path().to_path_buf());
        let plan = plan(&ctx, &PlatformProfile::new(Flavor::Posix)).unwrap();

        let names: Vec<&str> = plan.units.iter().map(|u| u.language.as_str()).collect();
        assert_eq!(names, ["goodlang"]);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].language, "brokenlang");
        assert_eq!(plan.skipped[0].path, broken);
    }

    #[test]
    fn test_plan_serializes_for_inspection() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path(), &["ada"]);

        let ctx = RootContext::with_root(tmp.path().to_path_buf());
        let plan = plan(&ctx, &PlatformProfile::new(Flavor::Posix)).unwrap();
        let json = plan.to_json().unwrap();
        assert!(json.contains("\"language\": \"ada\""));
        assert!(json.contains("TS_LANGUAGE_NAME"));
    }
}
