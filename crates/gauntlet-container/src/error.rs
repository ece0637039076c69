//! Domain errors raised while pulling or running engine containers.
//!
//! These errors mean the infrastructure could not run an engine. Timeouts,
//! output overruns and non-zero exits are outcomes carried on
//! [`ExecutionResult`](crate::ExecutionResult), never errors.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised by the container runtime boundary and the executor.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container process could not be started.
    #[error("failed to start container '{name}': {source}")]
    Spawn {
        /// Container name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A standard stream was not captured when the process started.
    #[error("container '{name}' started without a captured {stream} pipe")]
    MissingPipe {
        /// Container name.
        name: String,
        /// Stream that was missing.
        stream: &'static str,
    },

    /// Reading output from or waiting on the process failed.
    #[error("I/O error while supervising container '{name}': {source}")]
    Io {
        /// Container name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The runtime's pull command could not be launched.
    #[error("failed to launch image pull for '{image}': {source}")]
    PullUnavailable {
        /// Image reference being pulled.
        image: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The runtime reported a failed pull.
    #[error("pulling image '{image}' exited with status {status}")]
    PullFailed {
        /// Image reference being pulled.
        image: String,
        /// Exit status reported by the runtime.
        status: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_failure_names_the_image() {
        let error = ContainerError::PullFailed {
            image: String::from("gauntlet/madeup:beta"),
            status: 1,
        };
        let message = error.to_string();
        assert!(
            message.contains("gauntlet/madeup:beta"),
            "expected image in message: {message}"
        );
    }

    #[test]
    fn spawn_failure_exposes_source() {
        let error = ContainerError::Spawn {
            name: String::from("gauntlet-engines-structure-1"),
            source: Arc::new(io::Error::new(io::ErrorKind::NotFound, "docker missing")),
        };
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.to_string().contains("docker missing"));
    }
}
