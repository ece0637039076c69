//! The container runtime boundary.
//!
//! [`ContainerRuntime`] is the seam between the orchestrator and whatever
//! actually pulls and runs images. [`DockerRuntime`] shells out to the
//! `docker` CLI; tests substitute doubles that run plain shell commands.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;

use tokio::process::Command;
use tracing::debug;

use crate::error::ContainerError;
use crate::invocation::InvocationSpec;

const RUNTIME_TARGET: &str = "gauntlet_container::runtime";

/// Pulls images and prepares container processes.
///
/// Implementations must be safe to share between concurrent runs; the
/// underlying runtime daemon is assumed to serialise its own work.
pub trait ContainerRuntime: Send + Sync {
    /// Pulls `image`, blocking until the runtime reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::PullFailed`] when the runtime reports a
    /// failure, or [`ContainerError::PullUnavailable`] when the pull could
    /// not be started at all.
    fn pull(&self, image: &str) -> Result<(), ContainerError>;

    /// Builds the command that runs `image` as described by `spec`.
    ///
    /// The executor configures the standard streams and spawns it.
    fn command(&self, image: &str, spec: &InvocationSpec) -> Command;

    /// Builds the command that forcibly stops the container called `name`.
    ///
    /// The executor runs it whenever a run ends early. Signalling the client
    /// process alone does not reach a container the runtime daemon owns. The
    /// container may already be gone, in which case the command is expected
    /// to fail.
    fn kill_command(&self, name: &str) -> Command;
}

/// Runtime backed by the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    program: PathBuf,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerRuntime {
    /// Uses `docker` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Uses a specific client binary.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Client binary invoked for pulls and runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ContainerRuntime for DockerRuntime {
    fn pull(&self, image: &str) -> Result<(), ContainerError> {
        debug!(target: RUNTIME_TARGET, image, "pulling image");
        let status = std::process::Command::new(&self.program)
            .arg("pull")
            .arg(image)
            .status()
            .map_err(|err| ContainerError::PullUnavailable {
                image: image.to_owned(),
                source: Arc::new(err),
            })?;
        if status.success() {
            return Ok(());
        }
        Err(ContainerError::PullFailed {
            image: image.to_owned(),
            status: exit_code(status),
        })
    }

    fn command(&self, image: &str, spec: &InvocationSpec) -> Command {
        let mut command = Command::new(&self.program);
        command.args(docker_run_arguments(image, spec));
        command
    }

    fn kill_command(&self, name: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("kill").arg(name);
        command
    }
}

/// Returns the `docker` arguments that run `image` under `spec`.
#[must_use]
pub fn docker_run_arguments(image: &str, spec: &InvocationSpec) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "run".into(),
        "--rm".into(),
        "--cap-drop".into(),
        "all".into(),
    ];
    for (key, value) in spec.labels() {
        args.push("--label".into());
        args.push(format!("{key}={value}"));
    }
    if let Some(bytes) = spec.memory_limit_bytes() {
        args.push("--memory".into());
        args.push(bytes.to_string());
        args.push("--memory-swap".into());
        args.push("-1".into());
    }
    if spec.network_policy().is_denied() {
        args.push("--net".into());
        args.push("none".into());
    }
    args.push("--name".into());
    args.push(spec.name().to_owned());
    for mount in spec.mounts() {
        let mode = if mount.is_read_only() { ":ro" } else { "" };
        args.push("--volume".into());
        args.push(format!(
            "{}:{}{mode}",
            mount.source().display(),
            mount.target().display()
        ));
    }
    for (key, value) in spec.environment() {
        args.push("--env".into());
        args.push(format!("{key}={value}"));
    }
    if let Some(user) = spec.user() {
        args.push("--user".into());
        args.push(user.to_owned());
    }
    args.push(image.to_owned());
    args
}

/// Converts an exit status into the integer a container runtime reports.
///
/// Processes killed by a signal report `128 + signal`, matching shells and
/// container runtimes.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| signal_exit_code(status))
        .unwrap_or(-1)
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| 128 + signal)
}

#[cfg(not(unix))]
const fn signal_exit_code(_status: ExitStatus) -> Option<i32> {
    None
}
