//! Executor tests against real processes.
//!
//! [`ShellRuntime`] treats the image reference as an `sh -c` script so the
//! race between exit, deadline, output ceiling and cancellation can be
//! exercised without a container daemon.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::ContainerError;
use crate::executor::ContainerExecutor;
use crate::invocation::InvocationSpec;
use crate::output::CapturedOutput;
use crate::result::{ExecutionLimits, Termination};
use crate::runtime::ContainerRuntime;

#[derive(Debug, Default)]
struct ShellRuntime;

impl ContainerRuntime for ShellRuntime {
    fn pull(&self, _image: &str) -> Result<(), ContainerError> {
        Ok(())
    }

    fn command(&self, image: &str, _spec: &InvocationSpec) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(image);
        command
    }

    fn kill_command(&self, _name: &str) -> Command {
        Command::new("true")
    }
}

/// Starts a workload that outlives its client, the way a daemon-owned
/// container does, and kills it by the pid it records.
struct DetachedRuntime {
    pid_file: PathBuf,
}

impl ContainerRuntime for DetachedRuntime {
    fn pull(&self, _image: &str) -> Result<(), ContainerError> {
        Ok(())
    }

    fn command(&self, _image: &str, _spec: &InvocationSpec) -> Command {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(r#"sh -c 'echo $$ > "$1"; exec sleep 30' workload "$0" >/dev/null 2>&1 & wait"#)
            .arg(&self.pid_file);
        command
    }

    fn kill_command(&self, _name: &str) -> Command {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(r#"kill -KILL "$(cat "$0")""#)
            .arg(&self.pid_file);
        command
    }
}

struct MissingBinaryRuntime;

impl ContainerRuntime for MissingBinaryRuntime {
    fn pull(&self, _image: &str) -> Result<(), ContainerError> {
        Ok(())
    }

    fn command(&self, _image: &str, _spec: &InvocationSpec) -> Command {
        Command::new("/nonexistent/gauntlet-runtime")
    }

    fn kill_command(&self, _name: &str) -> Command {
        Command::new("/nonexistent/gauntlet-runtime")
    }
}

#[fixture]
fn executor() -> ContainerExecutor<ShellRuntime> {
    ContainerExecutor::new(ShellRuntime)
}

fn spec() -> InvocationSpec {
    InvocationSpec::new("gauntlet-engines-test")
}

/// Live means present in the process table and not a zombie.
fn is_running(pid: &str) -> bool {
    fs::read_to_string(Path::new("/proc").join(pid).join("stat")).is_ok_and(|stat| {
        stat.rsplit_once(") ")
            .is_some_and(|(_, fields)| !fields.starts_with('Z'))
    })
}

fn limits(timeout_ms: u64, max_output_bytes: u64) -> ExecutionLimits {
    ExecutionLimits::new(Duration::from_millis(timeout_ms), max_output_bytes)
        .with_termination_grace(Duration::from_millis(500))
}

// ---------------------------------------------------------------------------
// Natural exit
// ---------------------------------------------------------------------------

#[rstest]
#[tokio::test]
async fn natural_exit_reports_status_and_output(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "printf hello; exit 3",
            &spec(),
            limits(10_000, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert_eq!(result.termination(), Termination::Exited);
    assert_eq!(result.exit_status(), 3);
    assert!(!result.timed_out());
    assert!(!result.maximum_output_exceeded());
    assert_eq!(output.as_bytes(), b"hello");
    assert_eq!(result.output_byte_count(), 5);
    assert_eq!(result.container_name(), "gauntlet-engines-test");
}

#[rstest]
#[tokio::test]
async fn exit_is_seen_while_a_descendant_holds_stdout(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let started = Instant::now();
    let result = executor
        .run(
            "sleep 3 & exit 0",
            &spec(),
            limits(5_000, 1024).with_termination_grace(Duration::from_millis(200)),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert_eq!(result.termination(), Termination::Exited);
    assert_eq!(result.exit_status(), 0);
    assert!(result.duration() < Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[rstest]
#[tokio::test]
async fn output_written_just_before_exit_is_kept(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "(sleep 0.1; printf late) & printf early",
            &spec(),
            limits(5_000, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert!(result.is_success());
    assert_eq!(output.as_bytes(), b"earlylate");
}

#[rstest]
#[tokio::test]
async fn output_at_the_ceiling_is_accepted(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "printf 12345678",
            &spec(),
            limits(10_000, 8),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert!(result.is_success());
    assert_eq!(output.len(), 8);
}

#[rstest]
#[tokio::test]
async fn stderr_is_captured(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "echo oops >&2",
            &spec(),
            limits(10_000, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert_eq!(result.stderr(), b"oops\n");
    assert!(output.is_empty());
}

// ---------------------------------------------------------------------------
// Forced termination
// ---------------------------------------------------------------------------

#[rstest]
#[tokio::test]
async fn timeout_terminates_a_process_that_never_exits(
    executor: ContainerExecutor<ShellRuntime>,
) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "exec sleep 30",
            &spec(),
            limits(100, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert_eq!(result.termination(), Termination::TimedOut);
    assert!(result.timed_out());
    assert!(!result.maximum_output_exceeded());
    assert_eq!(result.exit_status(), 143);
    assert!(result.duration() >= Duration::from_millis(100));
    assert!(result.duration() < Duration::from_secs(10));
}

#[rstest]
#[tokio::test]
async fn ignored_sigterm_escalates_to_kill(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "trap '' TERM; while :; do :; done",
            &spec(),
            limits(100, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert!(result.timed_out());
    assert_eq!(result.exit_status(), 137);
    assert!(result.duration() < Duration::from_millis(100 + 500));
}

#[tokio::test]
async fn timeout_kills_a_workload_that_outlives_its_client() {
    let scratch = tempfile::tempdir().expect("temp dir");
    let pid_file = scratch.path().join("workload.pid");
    let executor = ContainerExecutor::new(DetachedRuntime {
        pid_file: pid_file.clone(),
    });
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "img",
            &spec(),
            limits(500, 1024).with_termination_grace(Duration::from_millis(200)),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert!(result.timed_out());
    let recorded = fs::read_to_string(&pid_file).expect("workload pid");
    let pid = recorded.trim();
    let mut polls = 0;
    while is_running(pid) && polls < 40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        polls += 1;
    }
    assert!(!is_running(pid), "workload {pid} survived the run");
}

#[rstest]
#[tokio::test]
async fn output_ceiling_terminates_the_process(executor: ContainerExecutor<ShellRuntime>) {
    let mut output = CapturedOutput::new();
    let result = executor
        .run(
            "exec yes",
            &spec(),
            limits(10_000, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("run should complete");

    assert_eq!(result.termination(), Termination::OutputExceeded);
    assert!(result.maximum_output_exceeded());
    assert!(!result.timed_out());
    assert_eq!(output.len(), 1024);
    assert!(result.output_byte_count() > 1024);
    assert_ne!(result.exit_status(), 0);
}

#[rstest]
#[tokio::test]
async fn cancellation_yields_a_timed_out_result(executor: ContainerExecutor<ShellRuntime>) {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut output = CapturedOutput::new();
    let result = executor
        .run("exec sleep 30", &spec(), limits(10_000, 1024), &mut output, &token)
        .await
        .expect("run should complete");
    canceller.await.expect("canceller task");

    assert!(result.cancelled());
    assert!(result.timed_out());
    assert!(result.duration() < Duration::from_secs(10));
}

// ---------------------------------------------------------------------------
// Infrastructure failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spawn_failure_is_an_error() {
    let executor = ContainerExecutor::new(MissingBinaryRuntime);
    let mut output = CapturedOutput::new();
    let err = executor
        .run(
            "img",
            &spec(),
            limits(1000, 1024),
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect_err("spawn should fail");

    assert!(matches!(err, ContainerError::Spawn { .. }));
}
