//! Platform-specific compiler and tool conventions.
//!
//! Grammar modules are plain C shared libraries. The flag sets here are the
//! ones the upstream grammars are routinely compiled with; MSVC needs a
//! handful of warning suppressions because several grammars ship UTF-8
//! source with characters MSVC objects to.

use std::path::Path;

use crate::util::process::ProcessBuilder;

/// Compiler flavor for the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// GCC/Clang style drivers (Linux, macOS, MinGW)
    Posix,
    /// Microsoft Visual C++
    Msvc,
}

impl Flavor {
    /// Detect the flavor for the host.
    pub fn host() -> Self {
        if cfg!(all(windows, target_env = "msvc")) {
            Flavor::Msvc
        } else {
            Flavor::Posix
        }
    }
}

/// Platform profile used when planning and compiling grammar modules.
#[derive(Debug, Clone, Copy)]
pub struct PlatformProfile {
    flavor: Flavor,
}

impl PlatformProfile {
    pub fn host() -> Self {
        PlatformProfile {
            flavor: Flavor::host(),
        }
    }

    pub fn new(flavor: Flavor) -> Self {
        PlatformProfile { flavor }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Compiler flags applied to every grammar source file.
    pub fn compile_flags(&self) -> &'static [&'static str] {
        match self.flavor {
            Flavor::Posix => &["-fvisibility=hidden", "-std=c11"],
            Flavor::Msvc => &[
                "/std:c11",
                "/utf-8",
                "/wd4244", // integer type conversion
                "/wd4566", // character representation
                "/wd4819", // source file encoding
            ],
        }
    }

    /// File extension for compiled grammar modules.
    pub fn module_extension(&self) -> &'static str {
        match self.flavor {
            Flavor::Posix => {
                if cfg!(target_os = "macos") {
                    "dylib"
                } else {
                    "so"
                }
            }
            Flavor::Msvc => "dll",
        }
    }

    /// Build an invocation for an external CLI tool.
    ///
    /// On Windows, npm-installed tools like tree-sitter resolve to `.cmd`
    /// shims that only run under the shell, so the invocation goes through
    /// `cmd /c`.
    pub fn tool_invocation(&self, program: &Path, args: &[&str]) -> ProcessBuilder {
        if cfg!(windows) {
            ProcessBuilder::new("cmd")
                .arg("/c")
                .arg(program)
                .args(args)
        } else {
            ProcessBuilder::new(program).args(args)
        }
    }
}
