//! Sandboxed container execution for gauntlet engines.
//!
//! Engines are third-party analysis tools packaged as container images. This
//! crate owns the boundary with the container runtime:
//!
//! - [`ContainerRuntime`] pulls images and builds run commands.
//!   [`DockerRuntime`] is the production implementation.
//! - [`InvocationSpec`] describes the sandbox for one run (mounts,
//!   environment, labels, memory, network and user).
//! - [`ContainerExecutor`] runs an image under [`ExecutionLimits`] and returns
//!   an [`ExecutionResult`]. Timeouts, output overruns and cancellation are
//!   outcomes on the result, never errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use gauntlet_container::{
//!     CancellationToken, CapturedOutput, ContainerExecutor, DockerRuntime, ExecutionLimits,
//!     InvocationSpec, container_name,
//! };
//!
//! # async fn demo() -> Result<(), gauntlet_container::ContainerError> {
//! let executor = ContainerExecutor::new(DockerRuntime::new());
//! let spec = InvocationSpec::new(container_name("structure"))
//!     .allow_read_path("/srv/repo", "/code");
//! let limits = ExecutionLimits::new(Duration::from_secs(900), 500_000_000);
//! let mut output = CapturedOutput::new();
//! let result = executor
//!     .run("gauntlet/structure:stable", &spec, limits, &mut output, &CancellationToken::new())
//!     .await?;
//! println!("exit {} after {:?}", result.exit_status(), result.duration());
//! # Ok(())
//! # }
//! ```

mod error;
mod executor;
mod invocation;
mod output;
mod result;
mod runtime;

#[cfg(test)]
mod tests;

pub use self::error::ContainerError;
pub use self::executor::ContainerExecutor;
pub use self::invocation::{
    DEFAULT_CONTAINER_USER, DEFAULT_MEMORY_LIMIT_BYTES, InvocationSpec, Mount, NetworkPolicy,
    container_name,
};
pub use self::output::{CapturedOutput, DiscardOutput, OutputSink};
pub use self::result::{ExecutionLimits, ExecutionResult, STDERR_CAPTURE_LIMIT, Termination};
pub use self::runtime::{ContainerRuntime, DockerRuntime, docker_run_arguments, exit_code};
pub use tokio_util::sync::CancellationToken;
