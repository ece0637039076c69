//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use gauntlet_config::ProjectConfigError;
use gauntlet_engines::{EngineError, ManifestError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to load engine manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Project(#[from] ProjectConfigError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("failed to start the async runtime: {0}")]
    Runtime(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
