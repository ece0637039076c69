//! Execution limits and the outcome of a single engine run.

use std::time::Duration;

/// Stderr bytes retained per run; the rest is drained and discarded.
pub const STDERR_CAPTURE_LIMIT: usize = 64 * 1024;

/// Bounds applied to one engine run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    timeout: Duration,
    max_output_bytes: u64,
    termination_grace: Duration,
}

impl ExecutionLimits {
    /// Creates limits with the given wall-clock timeout and stdout ceiling.
    ///
    /// The termination grace period defaults to ten seconds.
    #[must_use]
    pub const fn new(timeout: Duration, max_output_bytes: u64) -> Self {
        Self {
            timeout,
            max_output_bytes,
            termination_grace: Duration::from_secs(10),
        }
    }

    /// Overrides how long a terminated process may take to exit before it
    /// is killed outright.
    #[must_use]
    pub const fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    /// Wall-clock timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maximum number of stdout bytes accepted.
    #[must_use]
    pub const fn max_output_bytes(&self) -> u64 {
        self.max_output_bytes
    }

    /// SIGTERM to SIGKILL escalation window.
    #[must_use]
    pub const fn termination_grace(&self) -> Duration {
        self.termination_grace
    }
}

/// How a run ended.
///
/// A run is ended by the first condition it meets, so at most one forced
/// termination cause is ever recorded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The process exited on its own.
    Exited,
    /// The wall-clock timeout elapsed first.
    TimedOut,
    /// Stdout crossed the byte ceiling first.
    OutputExceeded,
    /// The caller cancelled the run.
    Cancelled,
}

impl Termination {
    /// Returns true when the run was stopped by the orchestrator rather than
    /// exiting on its own.
    #[must_use]
    pub const fn is_forced(self) -> bool {
        !matches!(self, Self::Exited)
    }
}

/// Structured outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    container_name: String,
    exit_status: i32,
    duration: Duration,
    termination: Termination,
    output_byte_count: u64,
    stderr: Vec<u8>,
}

impl ExecutionResult {
    /// Assembles a result.
    #[must_use]
    pub fn new(
        container_name: impl Into<String>,
        exit_status: i32,
        duration: Duration,
        termination: Termination,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            exit_status,
            duration,
            termination,
            output_byte_count: 0,
            stderr: Vec::new(),
        }
    }

    /// Records how many stdout bytes the process wrote.
    #[must_use]
    pub const fn with_output_byte_count(mut self, count: u64) -> Self {
        self.output_byte_count = count;
        self
    }

    /// Attaches captured stderr.
    #[must_use]
    pub fn with_stderr(mut self, stderr: Vec<u8>) -> Self {
        self.stderr = stderr;
        self
    }

    /// Container the run used.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Exit status as reported by the runtime, including after forced
    /// termination.
    #[must_use]
    pub const fn exit_status(&self) -> i32 {
        self.exit_status
    }

    /// Wall-clock time from start to exit or termination.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// How the run ended.
    #[must_use]
    pub const fn termination(&self) -> Termination {
        self.termination
    }

    /// True when the run hit its timeout or was cancelled.
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        matches!(self.termination, Termination::TimedOut | Termination::Cancelled)
    }

    /// True when the run was stopped for writing too much output.
    #[must_use]
    pub const fn maximum_output_exceeded(&self) -> bool {
        matches!(self.termination, Termination::OutputExceeded)
    }

    /// True when the run was cancelled by the caller.
    #[must_use]
    pub const fn cancelled(&self) -> bool {
        matches!(self.termination, Termination::Cancelled)
    }

    /// True when the process exited on its own with status zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.termination, Termination::Exited) && self.exit_status == 0
    }

    /// Total stdout bytes read from the process, including any beyond the
    /// ceiling.
    #[must_use]
    pub const fn output_byte_count(&self) -> u64 {
        self.output_byte_count
    }

    /// Captured stderr, truncated to [`STDERR_CAPTURE_LIMIT`].
    #[must_use]
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }
}
