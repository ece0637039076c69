//! Metrics observer.

use gauntlet_container::ExecutionResult;
use tracing::debug;

use super::{ContainerListener, EngineDetails, EngineIdentity, Outcome};

const METRICS_TARGET: &str = "gauntlet_engines::metrics";

/// Destination for counters and timings, in the shape of a statsd client.
pub trait MetricsSink: Send + Sync {
    /// Increments counter `name`.
    fn increment(&self, name: &str, tags: &[String]);

    /// Records a timing sample in milliseconds.
    fn timing(&self, name: &str, millis: u64, tags: &[String]);
}

/// Emits metrics as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn increment(&self, name: &str, tags: &[String]) {
        debug!(target: METRICS_TARGET, metric = name, ?tags, "increment");
    }

    fn timing(&self, name: &str, millis: u64, tags: &[String]) {
        debug!(target: METRICS_TARGET, metric = name, millis, ?tags, "timing");
    }
}

/// Counts engine starts, finishes and outcomes.
///
/// Metric names are `engines.<action>`. Every metric is tagged with
/// `engine:<name>`, `channel:<channel>` when known, and `repo_id:<id>` when
/// configured.
#[derive(Debug)]
pub struct MetricsListener<S> {
    sink: S,
    repo_id: Option<String>,
}

impl<S: MetricsSink> MetricsListener<S> {
    /// Creates a listener reporting to `sink`.
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            repo_id: None,
        }
    }

    /// Tags every metric with a repository identifier.
    #[must_use]
    pub fn with_repo_id(mut self, repo_id: Option<String>) -> Self {
        self.repo_id = repo_id;
        self
    }

    fn tags(&self, engine: &EngineIdentity) -> Vec<String> {
        let mut tags = vec![format!("engine:{}", engine.name())];
        if let Some(channel) = engine.channel() {
            tags.push(format!("channel:{channel}"));
        }
        if let Some(repo_id) = &self.repo_id {
            tags.push(format!("repo_id:{repo_id}"));
        }
        tags
    }
}

impl<S: MetricsSink> ContainerListener for MetricsListener<S> {
    fn started(&self, engine: &EngineIdentity, _details: &EngineDetails) {
        self.sink.increment("engines.started", &self.tags(engine));
    }

    fn finished(&self, engine: &EngineIdentity, _details: &EngineDetails, result: &ExecutionResult) {
        let tags = self.tags(engine);
        let millis = u64::try_from(result.duration().as_millis()).unwrap_or(u64::MAX);
        self.sink.timing("engines.time", millis, &tags);
        self.sink.increment("engines.finished", &tags);

        match Outcome::classify(result) {
            Outcome::TimedOut => {
                self.sink.increment("engines.result.error", &tags);
                self.sink.increment("engines.result.error.timeout", &tags);
            }
            Outcome::OutputExceeded => {
                self.sink.increment("engines.result.error", &tags);
                self.sink
                    .increment("engines.result.error.output_exceeded", &tags);
            }
            Outcome::Failed => self.sink.increment("engines.result.error", &tags),
            Outcome::Succeeded => self.sink.increment("engines.result.success", &tags),
        }
    }
}
