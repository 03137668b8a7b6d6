//! Grammar module build system.
//!
//! This module plans and runs the compilation of relocated parser sources
//! into loadable shared libraries, one per language.

pub mod compile;
pub mod plan;
pub mod platform;

pub use compile::{build_all, compile_unit};
pub use plan::{plan, BuildPlan, BuildUnit, SkippedLanguage};
pub use platform::{Flavor, PlatformProfile};
