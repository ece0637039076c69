//! Supervised execution of one engine container.
//!
//! [`ContainerExecutor::run`] starts the process and races four outcomes:
//! caller cancellation, the wall-clock deadline, stdout crossing its byte
//! ceiling, and natural exit. The first to resolve wins. Forced outcomes send
//! SIGTERM to the client and wait out the grace period, then kill the
//! container through the runtime and the client if it is still alive. After a
//! natural exit, stdout is drained for at most the grace period.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ContainerError;
use crate::invocation::InvocationSpec;
use crate::output::{Metered, OutputMeter, OutputSink};
use crate::result::{ExecutionLimits, ExecutionResult, STDERR_CAPTURE_LIMIT, Termination};
use crate::runtime::{ContainerRuntime, DockerRuntime, exit_code};

const EXECUTOR_TARGET: &str = "gauntlet_container::executor";

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Runs engine images under a [`ContainerRuntime`] with limits enforced.
#[derive(Debug, Clone, Default)]
pub struct ContainerExecutor<R = DockerRuntime> {
    runtime: R,
}

enum RaceOutcome {
    Exited(ExitStatus),
    Forced(Termination),
}

impl<R> ContainerExecutor<R> {
    /// Creates an executor over `runtime`.
    #[must_use]
    pub const fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Runtime used to build container commands.
    #[must_use]
    pub const fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R: ContainerRuntime> ContainerExecutor<R> {
    /// Runs `image` as described by `spec`, streaming stdout into `sink`.
    ///
    /// Timeouts, output overruns, cancellation and non-zero exits are all
    /// reported on the returned [`ExecutionResult`].
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] only when the process cannot be started or
    /// supervised: spawn failures, missing pipes, read or wait failures, and
    /// sink write failures.
    pub async fn run(
        &self,
        image: &str,
        spec: &InvocationSpec,
        limits: ExecutionLimits,
        sink: &mut (dyn OutputSink + Send),
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ContainerError> {
        let name = spec.name();
        let mut command = self.runtime.command(image, spec);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            target: EXECUTOR_TARGET,
            container = name,
            image,
            timeout_ms = millis(limits.timeout()),
            max_output_bytes = limits.max_output_bytes(),
            "starting container"
        );

        let started = Instant::now();
        let mut child = command.spawn().map_err(|err| ContainerError::Spawn {
            name: name.to_owned(),
            source: Arc::new(err),
        })?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ContainerError::MissingPipe {
                name: name.to_owned(),
                stream: "stdout",
            })?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| ContainerError::MissingPipe {
                name: name.to_owned(),
                stream: "stderr",
            })?;
        let mut stderr_task = tokio::spawn(capture_stderr(stderr_pipe));

        let deadline = tokio::time::sleep(limits.timeout());
        tokio::pin!(deadline);
        let mut stream = StdoutStream {
            name,
            meter: OutputMeter::new(limits.max_output_bytes()),
            buffer: [0_u8; READ_CHUNK_BYTES],
            open: true,
        };

        let outcome = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break RaceOutcome::Forced(Termination::Cancelled),
                () = &mut deadline => break RaceOutcome::Forced(Termination::TimedOut),
                read = stdout.read(&mut stream.buffer), if stream.open => {
                    if stream.deliver(read, sink)? == Delivery::Exceeded {
                        break RaceOutcome::Forced(Termination::OutputExceeded);
                    }
                }
                status = child.wait() => {
                    break RaceOutcome::Exited(status.map_err(|err| io_error(name, err))?);
                }
            }
        };
        let duration = started.elapsed();

        let (termination, exit_status) = match outcome {
            RaceOutcome::Exited(status) => {
                // Descendants may keep the pipe open after the process exits.
                let drain_until = deadline
                    .deadline()
                    .min(tokio::time::Instant::now() + limits.termination_grace());
                let termination = stream.drain(&mut stdout, sink, drain_until).await?;
                (termination, exit_code(status))
            }
            RaceOutcome::Forced(termination) => {
                warn!(
                    target: EXECUTOR_TARGET,
                    container = name,
                    ?termination,
                    elapsed_ms = millis(duration),
                    "stopping container"
                );
                let status = self
                    .terminate(&mut child, name, limits.termination_grace())
                    .await?;
                (termination, status)
            }
        };

        let stderr = match tokio::time::timeout(limits.termination_grace(), &mut stderr_task).await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(_)) => Vec::new(),
            Err(_) => {
                stderr_task.abort();
                Vec::new()
            }
        };

        info!(
            target: EXECUTOR_TARGET,
            container = name,
            exit_status,
            ?termination,
            elapsed_ms = millis(duration),
            output_bytes = stream.meter.seen(),
            "container finished"
        );

        Ok(
            ExecutionResult::new(name, exit_status, duration, termination)
                .with_output_byte_count(stream.meter.seen())
                .with_stderr(stderr),
        )
    }
}

impl<R: ContainerRuntime> ContainerExecutor<R> {
    /// Stops a run that ended early.
    ///
    /// The client gets SIGTERM and `grace` to exit. The container is then
    /// killed through the runtime, and a client still running after that is
    /// killed too.
    async fn terminate(
        &self,
        child: &mut Child,
        name: &str,
        grace: Duration,
    ) -> Result<i32, ContainerError> {
        let mut graceful = child.try_wait().map_err(|err| io_error(name, err))?;
        if graceful.is_none() {
            if let Some(pid) = child.id() {
                send_sigterm(pid, name);
            }
            graceful = tokio::time::timeout(grace, child.wait())
                .await
                .ok()
                .transpose()
                .map_err(|err| io_error(name, err))?;
        }

        self.kill_container(name, grace).await;

        if let Some(status) = graceful {
            return Ok(exit_code(status));
        }
        warn!(
            target: EXECUTOR_TARGET,
            container = name,
            grace_ms = millis(grace),
            "container ignored SIGTERM, killing"
        );
        child.kill().await.map_err(|err| io_error(name, err))?;
        let killed = child.wait().await.map_err(|err| io_error(name, err))?;
        Ok(exit_code(killed))
    }

    async fn kill_container(&self, name: &str, grace: Duration) {
        let mut command = self.runtime.kill_command(name);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        match tokio::time::timeout(grace, command.status()).await {
            Ok(Ok(status)) => debug!(
                target: EXECUTOR_TARGET,
                container = name,
                status = exit_code(status),
                "container kill finished"
            ),
            Ok(Err(err)) => warn!(
                target: EXECUTOR_TARGET,
                container = name,
                error = %err,
                "failed to run container kill"
            ),
            Err(_) => warn!(
                target: EXECUTOR_TARGET,
                container = name,
                grace_ms = millis(grace),
                "container kill did not finish"
            ),
        }
    }
}

/// Stdout of one run, metered against the output ceiling.
struct StdoutStream<'a> {
    name: &'a str,
    meter: OutputMeter,
    buffer: [u8; READ_CHUNK_BYTES],
    open: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Continue,
    Exceeded,
}

impl StdoutStream<'_> {
    /// Forwards one read to `sink`, holding back bytes past the ceiling.
    fn deliver(
        &mut self,
        read: std::io::Result<usize>,
        sink: &mut (dyn OutputSink + Send),
    ) -> Result<Delivery, ContainerError> {
        let count = read.map_err(|err| io_error(self.name, err))?;
        if count == 0 {
            self.open = false;
            return Ok(Delivery::Continue);
        }
        let allowed = match self.meter.record(count) {
            Metered::Within => count,
            Metered::Exceeded { allowed } => allowed,
        };
        let chunk = self.buffer.get(..allowed).unwrap_or_default();
        if !chunk.is_empty() {
            sink.write_chunk(chunk)
                .map_err(|err| io_error(self.name, err))?;
        }
        Ok(if allowed < count {
            Delivery::Exceeded
        } else {
            Delivery::Continue
        })
    }

    /// Reads what is left after the process exited, until end of file or
    /// `until`.
    async fn drain(
        &mut self,
        stdout: &mut ChildStdout,
        sink: &mut (dyn OutputSink + Send),
        until: tokio::time::Instant,
    ) -> Result<Termination, ContainerError> {
        while self.open {
            let Ok(read) = tokio::time::timeout_at(until, stdout.read(&mut self.buffer)).await
            else {
                debug!(
                    target: EXECUTOR_TARGET,
                    container = self.name,
                    "stdout still open after exit, abandoning it"
                );
                break;
            };
            if self.deliver(read, sink)? == Delivery::Exceeded {
                return Ok(Termination::OutputExceeded);
            }
        }
        Ok(Termination::Exited)
    }
}

fn send_sigterm(pid: u32, name: &str) {
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(errno) => warn!(
            target: EXECUTOR_TARGET,
            container = name,
            pid,
            %errno,
            "failed to deliver SIGTERM"
        ),
    }
}

/// Keeps the stderr pipe drained, retaining the first
/// [`STDERR_CAPTURE_LIMIT`] bytes.
async fn capture_stderr(mut stderr: ChildStderr) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buffer = [0_u8; READ_CHUNK_BYTES];
    loop {
        match stderr.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(count) => {
                let room = STDERR_CAPTURE_LIMIT.saturating_sub(captured.len());
                let keep = count.min(room);
                captured.extend_from_slice(buffer.get(..keep).unwrap_or_default());
            }
        }
    }
    captured
}

fn io_error(name: &str, err: std::io::Error) -> ContainerError {
    ContainerError::Io {
        name: name.to_owned(),
        source: Arc::new(err),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
