//! Domain errors raised while resolving, installing and running engines.
//!
//! Execution outcomes such as timeouts or non-zero exits are data on
//! [`ExecutionResult`](gauntlet_container::ExecutionResult); the variants here
//! mean an engine could not be resolved, installed or started.

use std::path::PathBuf;
use std::sync::Arc;

use gauntlet_container::ContainerError;
use thiserror::Error;

/// Errors arising from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The manifest has no such engine, or the engine has no such channel.
    #[error("unknown engine <{name}:{channel}>")]
    UnknownEngine {
        /// Engine name that was looked up.
        name: String,
        /// Channel that was looked up.
        channel: String,
    },

    /// The container runtime failed to pull a resolved image.
    #[error("unable to pull image {image}")]
    ImagePullFailure {
        /// Image reference that failed.
        image: String,
        /// Runtime failure.
        #[source]
        source: ContainerError,
    },

    /// The engine container could not be started or supervised.
    #[error("engine '{engine}' could not run: {source}")]
    Execution {
        /// Engine name.
        engine: String,
        /// Runtime failure.
        #[source]
        source: ContainerError,
    },

    /// The run was cancelled before the engine started.
    #[error("engine '{engine}' was cancelled before it started")]
    Cancelled {
        /// Engine name.
        engine: String,
    },

    /// The engine manifest could not be loaded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Errors raised while loading the engine manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read engine manifest {path}: {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The manifest is not valid YAML of the expected shape.
    #[error("failed to parse engine manifest: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// The manifest parsed but describes an unusable engine.
    #[error("invalid engine manifest: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}
