//! CLI entrypoint for the gauntlet engine orchestrator.
//!
//! The binary delegates to [`gauntlet_cli::run`], which loads configuration,
//! parses the subcommand and drives the engines through Docker.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: engine runs log to stderr from runtime worker threads.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    gauntlet_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
