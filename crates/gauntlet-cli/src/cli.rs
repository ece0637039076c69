//! CLI argument definitions for gauntlet.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface for the gauntlet engine orchestrator.
#[derive(Parser, Debug)]
#[command(name = "gauntlet", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands understood by `gauntlet`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Lists the engines published in the manifest.
    List,
    /// Pulls the images of every enabled engine.
    Install,
    /// Runs every enabled engine against a source tree.
    Run {
        /// Directory mounted into the engine containers.
        #[arg(long, value_name = "DIR", default_value = ".")]
        source: PathBuf,
    },
}
