//! Runtime lookup of grammar bindings by language name.
//!
//! The registry is built once per process from two sources: a fixed list
//! of pre-bundled grammars shipped as ordinary crate dependencies, and
//! the compiled modules found in the bindings directory for languages the
//! catalog names. Lookup never touches the network or the pipeline: a
//! catalog language whose module has not been built yet, and any name the
//! catalog does not know, both fail with the same [`LookupError`].

mod loader;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{LazyLock, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};
use tree_sitter::{Language, Parser};
use tree_sitter_language::LanguageFn;

use crate::builder::PlatformProfile;
use crate::catalog::CatalogStore;
use crate::util::RootContext;

use loader::LoadOutcome;

/// The only user-visible error for an unsupported or unbuilt language.
#[derive(Debug, Clone, Error)]
#[error("language not found: {name}")]
pub struct LookupError {
    pub name: String,
}

impl LookupError {
    fn new(name: impl Into<String>) -> Self {
        LookupError { name: name.into() }
    }
}

/// A resolved grammar constructor.
#[derive(Clone, Copy)]
pub struct Binding {
    raw: LanguageFn,
}

// LanguageFn has no Debug impl, so derive is not an option.
impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").finish_non_exhaustive()
    }
}

impl Binding {
    pub(crate) const fn new(raw: LanguageFn) -> Self {
        Binding { raw }
    }

    /// Instantiate the grammar-runtime language object.
    pub fn language(&self) -> Language {
        Language::new(self.raw)
    }
}

/// Grammars shipped as crate dependencies rather than built by the
/// pipeline. An explicit exception list, never inferred.
const PREBUNDLED: [(&str, LanguageFn); 3] = [
    ("csharp", tree_sitter_c_sharp::LANGUAGE),
    ("embeddedtemplate", tree_sitter_embedded_template::LANGUAGE),
    ("yaml", tree_sitter_yaml::LANGUAGE),
];

enum Entry {
    Static(LanguageFn),
    Module(PathBuf),
}

/// Name-to-binding resolver over the built modules and pre-bundled
/// grammars.
pub struct Registry {
    entries: HashMap<String, Entry>,
    accepted: BTreeSet<String>,
    cache: Mutex<HashMap<String, Binding>>,
}

impl Registry {
    /// Build a registry for the workspace rooted at `ctx`.
    ///
    /// A missing or unreadable catalog is not fatal; the registry then
    /// serves only the pre-bundled grammars.
    pub fn new(ctx: &RootContext) -> Self {
        let catalog_names: Vec<String> = match CatalogStore::new(ctx.catalog_path()).load() {
            Ok(catalog) => catalog.names().map(String::from).collect(),
            Err(err) => {
                warn!("No language catalog, serving pre-bundled grammars only: {}", err);
                Vec::new()
            }
        };

        let bindings_dir = ctx.bindings_dir();
        let extension = PlatformProfile::host().module_extension();
        let built = scan_modules(&bindings_dir, extension);

        let mut entries = HashMap::new();
        let mut accepted = BTreeSet::new();
        for (name, constructor) in PREBUNDLED {
            entries.insert(name.to_string(), Entry::Static(constructor));
            accepted.insert(name.to_string());
        }
        for name in catalog_names {
            if built.contains(&name) {
                let module = bindings_dir.join(format!("{name}.{extension}"));
                entries.insert(name.clone(), Entry::Module(module));
            }
            accepted.insert(name);
        }
        debug!(
            "Registry serves {} of {} accepted languages",
            entries.len(),
            accepted.len()
        );

        Registry {
            entries,
            accepted,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a language name to its binding.
    pub fn resolve(&self, name: &str) -> Result<Binding, LookupError> {
        if let Some(binding) = self.cached(name) {
            return Ok(binding);
        }

        let binding = match self.entries.get(name) {
            Some(Entry::Static(constructor)) => Binding::new(*constructor),
            Some(Entry::Module(module)) => self.load_module(name, module)?,
            None => return Err(LookupError::new(name)),
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), binding);
        Ok(binding)
    }

    fn cached(&self, name: &str) -> Option<Binding> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    fn load_module(&self, name: &str, module: &std::path::Path) -> Result<Binding, LookupError> {
        for strategy in loader::chain() {
            match strategy.load(name, module) {
                LoadOutcome::Loaded(binding) => return Ok(binding),
                LoadOutcome::Missing => {
                    debug!("{} strategy missed for {}", strategy.describe(), name);
                }
            }
        }
        Err(LookupError::new(name))
    }

    /// Every name the registry accepts: catalog languages plus the
    /// pre-bundled list, sorted.
    pub fn supported_names(&self) -> Vec<String> {
        self.accepted.iter().cloned().collect()
    }

    /// Whether `name` is in the accepted set, built or not.
    pub fn is_supported(&self, name: &str) -> bool {
        self.accepted.contains(name)
    }

    /// Resolve a name into the grammar-runtime language object.
    pub fn get_language(&self, name: &str) -> Result<Language, LookupError> {
        Ok(self.resolve(name)?.language())
    }

    /// Resolve a name into a parser ready to use.
    pub fn get_parser(&self, name: &str) -> Result<Parser, LookupError> {
        let language = self.get_language(name)?;
        let mut parser = Parser::new();
        parser.set_language(&language).map_err(|err| {
            warn!("Grammar for {} has an incompatible ABI: {}", name, err);
            LookupError::new(name)
        })?;
        Ok(parser)
    }
}

/// Names with a compiled module present in the bindings directory.
fn scan_modules(bindings_dir: &std::path::Path, extension: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let Ok(entries) = std::fs::read_dir(bindings_dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            found.insert(stem.to_string());
        }
    }
    found
}

static GLOBAL_REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let ctx = RootContext::new().unwrap_or_else(|_| RootContext::with_root(PathBuf::from(".")));
    Registry::new(&ctx)
});

/// Look up a grammar through the process-wide registry.
pub fn get_language(name: &str) -> Result<Language, LookupError> {
    GLOBAL_REGISTRY.get_language(name)
}

/// Build a parser through the process-wide registry.
pub fn get_parser(name: &str) -> Result<Parser, LookupError> {
    GLOBAL_REGISTRY.get_parser(name)
}

/// Accepted language names of the process-wide registry.
pub fn supported_names() -> Vec<String> {
    GLOBAL_REGISTRY.supported_names()
}
