//! Grammar module compilation.
//!
//! Each build unit is compiled in two stages: object files via the `cc`
//! crate (which handles toolchain discovery, including MSVC environment
//! setup), then a driver link into a shared library. Units are independent,
//! so the batch fans out over blocking tasks with a semaphore bounding
//! parallelism.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::builder::plan::{BuildPlan, BuildUnit};
use crate::builder::platform::{Flavor, PlatformProfile};
use crate::error::PipelineError;
use crate::pipeline::RunReport;
use crate::util::fs::ensure_dir;

/// Target triple for the host, used to keep `cc` from expecting cargo's
/// build-script environment.
fn host_triple() -> String {
    std::env::var("TARGET").unwrap_or_else(|_| {
        let arch = std::env::consts::ARCH;
        if cfg!(target_os = "windows") {
            format!("{arch}-pc-windows-msvc")
        } else if cfg!(target_os = "macos") {
            format!("{arch}-apple-darwin")
        } else {
            format!("{arch}-unknown-linux-gnu")
        }
    })
}

/// Compile one unit into its output module.
pub fn compile_unit(unit: &BuildUnit, profile: &PlatformProfile) -> crate::error::Result<PathBuf> {
    let language = unit.language.as_str();
    let out_dir = unit.output.parent().unwrap_or(unit.output.as_path());
    ensure_dir(out_dir).map_err(|err| compile_error(language, err.to_string()))?;

    let obj_dir = out_dir.join("obj").join(language);
    ensure_dir(&obj_dir).map_err(|err| compile_error(language, err.to_string()))?;

    let triple = host_triple();
    let mut build = cc::Build::new();
    build
        .cargo_metadata(false)
        .warnings(false)
        .opt_level(2)
        .pic(true)
        .host(&triple)
        .target(&triple)
        .out_dir(&obj_dir);

    for flag in &unit.cflags {
        build.flag(flag);
    }
    for dir in &unit.include_dirs {
        build.include(dir);
    }
    for (name, value) in &unit.defines {
        build.define(name, value.as_deref());
    }
    for source in &unit.sources {
        build.file(source);
    }

    let objects = build
        .try_compile_intermediates()
        .map_err(|err| compile_error(language, err.to_string()))?;

    link_module(&build, unit, profile, &objects)?;

    if !unit.output.exists() {
        return Err(compile_error(
            language,
            format!("linker produced no output at {}", unit.output.display()),
        ));
    }

    debug!("Compiled {} -> {}", language, unit.output.display());
    Ok(unit.output.clone())
}

/// Link compiled objects into a shared library with the same driver `cc`
/// resolved for compilation.
fn link_module(
    build: &cc::Build,
    unit: &BuildUnit,
    profile: &PlatformProfile,
    objects: &[PathBuf],
) -> crate::error::Result<()> {
    let language = unit.language.as_str();
    let compiler = build
        .try_get_compiler()
        .map_err(|err| compile_error(language, err.to_string()))?;

    let mut cmd = compiler.to_command();
    match profile.flavor() {
        Flavor::Posix => {
            cmd.arg("-shared").arg("-o").arg(&unit.output);
            cmd.args(objects);
        }
        Flavor::Msvc => {
            cmd.arg("/nologo")
                .arg("/LD")
                .arg(format!("/Fe:{}", unit.output.display()));
            cmd.args(objects);
        }
    }

    let output = cmd
        .output()
        .map_err(|err| compile_error(language, err.to_string()))?;
    if !output.status.success() {
        return Err(compile_error(
            language,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(())
}

fn compile_error(language: &str, message: String) -> PipelineError {
    PipelineError::Compile {
        language: language.to_string(),
        message,
    }
}

/// Compile every unit in the plan, bounded by `workers` concurrent jobs.
///
/// Failures are isolated per language; the report carries every outcome.
pub async fn build_all(plan: BuildPlan, profile: PlatformProfile, workers: usize) -> RunReport {
    let mut report = RunReport::new("build");
    // Languages the planner had to leave out count as failures, without
    // holding up the units that can compile.
    for skipped in plan.skipped {
        report.record_err(PipelineError::MissingSource {
            language: skipped.language,
            path: skipped.path,
        });
    }

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks: JoinSet<crate::error::Result<String>> = JoinSet::new();

    for unit in plan.units {
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // Closed only on runtime shutdown.
            let _permit = semaphore.acquire_owned().await.map_err(|err| {
                PipelineError::Configuration(format!("worker pool closed: {err}"))
            })?;
            let language = unit.language.clone();
            tokio::task::spawn_blocking(move || {
                compile_unit(&unit, &profile).map(|_| unit.language.clone())
            })
            .await
            .map_err(|err| PipelineError::Compile {
                language,
                message: format!("compile task panicked: {err}"),
            })?
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(language)) => {
                info!("Built {}", language);
                report.record_ok(language);
            }
            Ok(Err(err)) => report.record_err(err),
            Err(err) => report.record_err(PipelineError::Configuration(format!(
                "build task failed to join: {err}"
            ))),
        }
    }
    report
}
