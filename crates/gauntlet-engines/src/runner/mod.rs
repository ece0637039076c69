//! Engine runner orchestrating container execution and lifecycle events.
//!
//! The [`EngineRunner`] wraps an [`EngineExecutor`] with listener
//! notifications and bounded concurrency. The executor abstraction lets tests
//! supply canned results without starting containers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gauntlet_container::{
    CancellationToken, CapturedOutput, ContainerExecutor, ContainerRuntime, ExecutionLimits,
    ExecutionResult, InvocationSpec, container_name,
};
use tracing::debug;

use crate::error::EngineError;
use crate::listener::{ContainerListener, EngineDetails, EngineIdentity, ListenerDispatcher};
use crate::registry::ResolvedEngine;

const RUNNER_TARGET: &str = "gauntlet_engines::runner";

/// Mount point of the analysed source tree inside engine containers.
pub const SOURCE_MOUNT: &str = "/code";

/// A completed engine run: the result and the stdout it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRun {
    engine: ResolvedEngine,
    result: ExecutionResult,
    output: Vec<u8>,
}

impl EngineRun {
    /// Bundles a run.
    #[must_use]
    pub const fn new(engine: ResolvedEngine, result: ExecutionResult, output: Vec<u8>) -> Self {
        Self {
            engine,
            result,
            output,
        }
    }

    /// Engine that ran.
    #[must_use]
    pub const fn engine(&self) -> &ResolvedEngine {
        &self.engine
    }

    /// Execution outcome.
    #[must_use]
    pub const fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// Stdout up to the output ceiling.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }
}

/// Runs one resolved engine.
///
/// [`ContainerEngineExecutor`] is the production implementation.
#[async_trait]
pub trait EngineExecutor: Send + Sync {
    /// Runs `engine` to completion or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Execution`] when the engine container cannot be
    /// started or supervised.
    async fn execute(
        &self,
        engine: &ResolvedEngine,
        cancel: &CancellationToken,
    ) -> Result<EngineRun, EngineError>;
}

/// Runs engines as containers with the source tree mounted read-only.
#[derive(Debug)]
pub struct ContainerEngineExecutor<R> {
    executor: ContainerExecutor<R>,
    source_dir: PathBuf,
    limits: ExecutionLimits,
}

impl<R: ContainerRuntime> ContainerEngineExecutor<R> {
    /// Creates an executor analysing `source_dir` under `limits`.
    #[must_use]
    pub fn new(runtime: R, source_dir: impl Into<PathBuf>, limits: ExecutionLimits) -> Self {
        Self {
            executor: ContainerExecutor::new(runtime),
            source_dir: source_dir.into(),
            limits,
        }
    }

    /// Directory mounted at [`SOURCE_MOUNT`].
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Builds the sandbox description for one run of `engine`.
    #[must_use]
    pub fn invocation_spec(&self, engine: &ResolvedEngine) -> InvocationSpec {
        InvocationSpec::new(container_name(engine.name()))
            .with_label("gauntlet.engine", engine.name())
            .with_label("gauntlet.channel", engine.channel())
            .allow_read_path(&self.source_dir, SOURCE_MOUNT)
    }
}

#[async_trait]
impl<R: ContainerRuntime> EngineExecutor for ContainerEngineExecutor<R> {
    async fn execute(
        &self,
        engine: &ResolvedEngine,
        cancel: &CancellationToken,
    ) -> Result<EngineRun, EngineError> {
        let spec = self.invocation_spec(engine);
        let mut output = CapturedOutput::new();
        let result = self
            .executor
            .run(engine.image(), &spec, self.limits, &mut output, cancel)
            .await
            .map_err(|source| EngineError::Execution {
                engine: engine.name().to_owned(),
                source,
            })?;
        Ok(EngineRun::new(engine.clone(), result, output.into_bytes()))
    }
}

/// Runs engines with lifecycle notifications and bounded concurrency.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use gauntlet_container::{DockerRuntime, ExecutionLimits};
/// use gauntlet_engines::{
///     ContainerEngineExecutor, EngineRunner, ListenerDispatcher, LoggingListener, ResolvedEngine,
/// };
///
/// # async fn demo() {
/// let limits = ExecutionLimits::new(Duration::from_secs(900), 500_000_000);
/// let executor = ContainerEngineExecutor::new(DockerRuntime::new(), "/srv/repo", limits);
/// let listeners = ListenerDispatcher::new().with_listener(LoggingListener);
/// let runner = EngineRunner::new(executor, listeners).with_max_concurrent(2);
/// let engines = [ResolvedEngine::new("structure", "stable", "gauntlet/structure:stable")];
/// for run in runner.run_all(&engines).await {
///     let _ = run;
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct EngineRunner<E> {
    executor: E,
    listeners: ListenerDispatcher,
    max_concurrent: usize,
    cancel: CancellationToken,
}

impl<E> EngineRunner<E> {
    /// Creates a runner that runs one engine at a time.
    #[must_use]
    pub fn new(executor: E, listeners: ListenerDispatcher) -> Self {
        Self {
            executor,
            listeners,
            max_concurrent: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Allows up to `max_concurrent` engines at once; zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Uses `cancel` to abort in-flight and pending runs.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts this runner's runs.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Concurrency bound.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl<E: EngineExecutor> EngineRunner<E> {
    /// Runs one engine, notifying listeners around it.
    ///
    /// `started` fires before the executor is called; `finished` fires only
    /// when the executor produced a result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] when the runner was cancelled before
    /// the engine started, or the executor's error.
    pub async fn run(&self, engine: &ResolvedEngine) -> Result<EngineRun, EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled {
                engine: engine.name().to_owned(),
            });
        }

        let identity = EngineIdentity::from(engine);
        let mut details = EngineDetails::new();
        details.insert(String::from("image"), engine.image().to_owned());

        self.listeners.started(&identity, &details);
        let run = self.executor.execute(engine, &self.cancel).await?;
        details.insert(
            String::from("container"),
            run.result().container_name().to_owned(),
        );
        self.listeners.finished(&identity, &details, run.result());
        Ok(run)
    }

    /// Runs every engine with at most [`max_concurrent`](Self::max_concurrent)
    /// in flight.
    ///
    /// Returns one entry per engine, in input order. A failing engine does
    /// not stop the others.
    pub async fn run_all(&self, engines: &[ResolvedEngine]) -> Vec<Result<EngineRun, EngineError>> {
        debug!(
            target: RUNNER_TARGET,
            engines = engines.len(),
            max_concurrent = self.max_concurrent,
            "running engines"
        );
        let mut indexed: Vec<(usize, Result<EngineRun, EngineError>)> =
            stream::iter(engines.iter().enumerate())
                .map(|(index, engine)| async move { (index, self.run(engine).await) })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, run)| run).collect()
    }
}
