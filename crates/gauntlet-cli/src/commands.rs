//! Subcommand implementations.
//!
//! Each command writes its report through the caller's streams and returns
//! the process exit code. Failures that stop a command outright surface as
//! [`AppError`]s.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use gauntlet_config::{Config, EngineConfigEntry, ProjectConfig};
use gauntlet_container::{ContainerRuntime, ExecutionLimits};
use gauntlet_engines::{
    ContainerEngineExecutor, EngineRegistry, EngineRun, EngineRunner, Installer,
    ListenerDispatcher, LogMetricsSink, LoggingListener, MetricsListener, Outcome, ResolvedEngine,
    SourceText, parse_issues,
};
use tracing::warn;

use crate::AppError;

const COMMANDS_TARGET: &str = "gauntlet_cli::commands";

/// Prints the engines published in the manifest, sorted by name.
pub(crate) fn list<W: Write>(registry: &EngineRegistry, stdout: &mut W) -> Result<ExitCode, AppError> {
    writeln!(stdout, "Available engines:").map_err(AppError::WriteOutput)?;
    for entry in registry.entries() {
        writeln!(stdout, "- {}: {}", entry.name(), entry.description())
            .map_err(AppError::WriteOutput)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Pulls the image of every enabled engine in project order.
pub(crate) fn install<R, W, E>(
    config: &Config,
    registry: &EngineRegistry,
    runtime: &R,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    R: ContainerRuntime + ?Sized,
    W: Write,
    E: Write,
{
    let project = ProjectConfig::load(config.project_config())?;
    let report = Installer::new(registry, runtime)
        .with_default_channel(config.default_channel())
        .install(&project.engine_entries(), &mut *stderr)?;
    for engine in report.pulled() {
        writeln!(stdout, "Pulled {engine} ({})", engine.image()).map_err(AppError::WriteOutput)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs every resolvable enabled engine against `source`.
///
/// Prints one summary line per engine followed by the issues it reported.
/// The exit code is a failure unless every engine exited cleanly.
pub(crate) fn run_engines<R, W, E>(
    config: &Config,
    registry: &EngineRegistry,
    runtime: R,
    source: &Path,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    R: ContainerRuntime + 'static,
    W: Write,
    E: Write,
{
    let project = ProjectConfig::load(config.project_config())?;
    let engines = resolve_enabled(
        registry,
        &project.engine_entries(),
        config.default_channel(),
        stderr,
    )?;

    let limits = ExecutionLimits::new(
        config.container_timeout(),
        config.container_max_output_bytes(),
    )
    .with_termination_grace(config.termination_grace());
    let listeners = ListenerDispatcher::new()
        .with_listener(LoggingListener)
        .with_listener(
            MetricsListener::new(LogMetricsSink).with_repo_id(config.repo_id().map(str::to_owned)),
        );
    let runner = EngineRunner::new(ContainerEngineExecutor::new(runtime, source, limits), listeners)
        .with_max_concurrent(config.max_concurrent_engines());

    let async_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    let results = async_runtime.block_on(runner.run_all(&engines));

    let mut all_succeeded = true;
    for (engine, result) in engines.iter().zip(results) {
        match result {
            Ok(run) => {
                all_succeeded &= Outcome::classify(run.result()) == Outcome::Succeeded;
                report_run(&run, source, stdout, stderr)?;
            }
            Err(error) => {
                all_succeeded = false;
                writeln!(stdout, "{engine}: {error}").map_err(AppError::WriteOutput)?;
            }
        }
    }

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn resolve_enabled<E: Write>(
    registry: &EngineRegistry,
    entries: &[EngineConfigEntry],
    default_channel: &str,
    stderr: &mut E,
) -> Result<Vec<ResolvedEngine>, AppError> {
    let mut engines = Vec::new();
    for entry in entries.iter().filter(|entry| entry.is_enabled()) {
        match registry.resolve_entry(entry, default_channel) {
            Ok(engine) => engines.push(engine),
            Err(error) => {
                warn!(
                    target: COMMANDS_TARGET,
                    engine = entry.name(),
                    "skipping unknown engine"
                );
                writeln!(stderr, "{error}").map_err(AppError::WriteOutput)?;
            }
        }
    }
    Ok(engines)
}

/// One-line outcome of a run: `name:channel: outcome (exit N, M ms)`.
pub(crate) fn summary_line(run: &EngineRun) -> String {
    let result = run.result();
    format!(
        "{}: {} (exit {}, {} ms)",
        run.engine(),
        Outcome::classify(result),
        result.exit_status(),
        result.duration().as_millis()
    )
}

fn report_run<W: Write, E: Write>(
    run: &EngineRun,
    source: &Path,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), AppError> {
    writeln!(stdout, "{}", summary_line(run)).map_err(AppError::WriteOutput)?;

    let root = fs::canonicalize(source).ok();
    let mut sources: BTreeMap<String, SourceText> = BTreeMap::new();
    for parsed in parse_issues(run.output()) {
        match parsed {
            Ok(issue) => {
                let text = sources
                    .entry(issue.path().to_owned())
                    .or_insert_with(|| read_source_file(root.as_deref(), issue.path()));
                let location = issue.describe_location(&*text, ":");
                writeln!(stdout, "  {}:{location} {}", issue.path(), issue.description())
                    .map_err(AppError::WriteOutput)?;
            }
            Err(error) => {
                writeln!(stderr, "{}: unreadable engine output: {error}", run.engine())
                    .map_err(AppError::WriteOutput)?;
            }
        }
    }
    Ok(())
}

/// Reads `relative` from the analysed tree at `root`.
///
/// Paths resolving outside the tree, and unreadable files, read as empty so
/// line ranges still render.
fn read_source_file(root: Option<&Path>, relative: &str) -> SourceText {
    let contents = root
        .and_then(|tree| {
            fs::canonicalize(tree.join(relative))
                .ok()
                .filter(|path| path.starts_with(tree))
        })
        .and_then(|path| fs::read_to_string(path).ok())
        .unwrap_or_default();
    SourceText::new(&contents)
}
