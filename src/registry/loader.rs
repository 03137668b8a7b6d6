//! Loading strategies for compiled grammar modules.
//!
//! Two strategies run in order. The module loader resolves the uniform
//! `langpack_language` entry point every pipeline-built module exports
//! through the shared glue source. The symbol loader is the fallback for
//! modules built outside the pipeline: it resolves the grammar's own
//! `tree_sitter_<name>` constructor directly. A strategy that cannot
//! produce a binding reports a miss and the chain moves on.

use std::path::Path;

use libloading::Library;
use tracing::debug;
use tree_sitter_language::LanguageFn;

use crate::registry::Binding;

/// Entry point exported by the shared binding glue.
const GLUE_SYMBOL: &[u8] = b"langpack_language\0";

/// Raw shape of a grammar constructor symbol.
type RawConstructor = unsafe extern "C" fn() -> *const ();

/// Outcome of one loading strategy.
pub(crate) enum LoadOutcome {
    Loaded(Binding),
    Missing,
}

/// One strategy for turning a module file into a binding.
pub(crate) trait BindingLoader {
    fn describe(&self) -> &'static str;

    fn load(&self, language: &str, module: &Path) -> LoadOutcome;
}

/// Resolves the glue entry point pipeline-built modules export.
pub(crate) struct ModuleLoader;

impl BindingLoader for ModuleLoader {
    fn describe(&self) -> &'static str {
        "module"
    }

    fn load(&self, language: &str, module: &Path) -> LoadOutcome {
        load_constructor(language, module, GLUE_SYMBOL)
    }
}

/// Resolves the grammar's own `tree_sitter_<name>` constructor.
pub(crate) struct SymbolLoader;

impl BindingLoader for SymbolLoader {
    fn describe(&self) -> &'static str {
        "symbol"
    }

    fn load(&self, language: &str, module: &Path) -> LoadOutcome {
        let symbol = format!("tree_sitter_{language}\0");
        load_constructor(language, module, symbol.as_bytes())
    }
}

/// Strategies in resolution order.
pub(crate) fn chain() -> [&'static dyn BindingLoader; 2] {
    [&ModuleLoader, &SymbolLoader]
}

fn load_constructor(language: &str, module: &Path, symbol: &[u8]) -> LoadOutcome {
    if !module.is_file() {
        return LoadOutcome::Missing;
    }

    // SAFETY: the module is a grammar binding; opening it runs no code
    // beyond its initializer table.
    let library = match unsafe { Library::new(module) } {
        Ok(library) => library,
        Err(err) => {
            debug!("Could not open {} for {}: {}", module.display(), language, err);
            return LoadOutcome::Missing;
        }
    };

    // SAFETY: the symbol, when present, is a zero-argument grammar
    // constructor per the binding convention.
    let raw: RawConstructor = match unsafe { library.get::<RawConstructor>(symbol) } {
        Ok(symbol) => *symbol,
        Err(err) => {
            debug!("No constructor in {} for {}: {}", module.display(), language, err);
            return LoadOutcome::Missing;
        }
    };

    // The constructor must stay valid for every Language built from it,
    // so the library stays resident for the process lifetime.
    std::mem::forget(library);

    // SAFETY: the resolved symbol follows the tree-sitter language
    // constructor ABI.
    LoadOutcome::Loaded(Binding::new(unsafe { LanguageFn::from_raw(raw) }))
}
