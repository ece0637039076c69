//! Command-line interface runtime for gauntlet.
//!
//! The module owns argument parsing, configuration bootstrapping and command
//! dispatch. It is exercised both from the binary entrypoint and from tests,
//! where the configuration loader, the container runtime and the IO streams
//! are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use gauntlet_container::{ContainerRuntime, DockerRuntime};
use gauntlet_engines::EngineRegistry;
use tracing::debug;

mod cli;
mod commands;
mod config;
mod errors;
mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub(crate) use errors::AppError;

const CLI_TARGET: &str = "gauntlet_cli";

/// Runs the CLI using the provided arguments and IO handles.
///
/// Engines run through the `docker` client found on `PATH`.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, &DockerRuntime::new())
}

pub(crate) fn run_with<I, W, E, L, R>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    runtime: &R,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    R: ContainerRuntime + Clone + 'static,
{
    match execute(args, stdout, stderr, loader, runtime) {
        Ok(exit_code) => exit_code,
        // `--help` and `--version` are reported through clap errors.
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            if let Err(write_error) = write!(stdout, "{error}") {
                debug!(target: CLI_TARGET, error = %write_error, "failed to write usage");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            if let Err(write_error) = writeln!(stderr, "{error}") {
                debug!(target: CLI_TARGET, error = %write_error, "failed to report error");
            }
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W, E, L, R>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    runtime: &R,
) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    R: ContainerRuntime + Clone + 'static,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);
    let cli = Cli::try_parse_from(&split.command_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    let registry = EngineRegistry::load(config.engines_manifest())?;
    match cli.command {
        CliCommand::List => commands::list(&registry, stdout),
        CliCommand::Install => commands::install(&config, &registry, runtime, stdout, stderr),
        CliCommand::Run { source } => commands::run_engines(
            &config,
            &registry,
            runtime.clone(),
            &source,
            stdout,
            stderr,
        ),
    }
}
