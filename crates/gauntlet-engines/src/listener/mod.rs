//! Lifecycle observers for engine runs.
//!
//! Every engine run reports `started` once and, when the container actually
//! produced a result, `finished` once. [`ListenerDispatcher`] fans each
//! event out to its registered listeners in registration order.

mod logging;
mod metrics;

use std::collections::BTreeMap;
use std::fmt;

use gauntlet_container::ExecutionResult;

use crate::registry::ResolvedEngine;

pub use self::logging::LoggingListener;
pub use self::metrics::{LogMetricsSink, MetricsListener, MetricsSink};

/// Free-form details attached to lifecycle events.
pub type EngineDetails = BTreeMap<String, String>;

/// Identity of the engine an event concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIdentity {
    name: String,
    channel: Option<String>,
}

impl EngineIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(name: impl Into<String>, channel: Option<String>) -> Self {
        Self {
            name: name.into(),
            channel,
        }
    }

    /// Engine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel, when the engine exposes one.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }
}

impl From<&ResolvedEngine> for EngineIdentity {
    fn from(engine: &ResolvedEngine) -> Self {
        Self::new(engine.name(), Some(engine.channel().to_owned()))
    }
}

/// How a finished run is classified, in priority order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Timed out or cancelled.
    TimedOut,
    /// Stopped for writing too much output.
    OutputExceeded,
    /// Exited on its own with a non-zero status.
    Failed,
    /// Exited on its own with status zero.
    Succeeded,
}

impl Outcome {
    /// Classifies a result. A timeout takes precedence over an output
    /// overrun, which takes precedence over a non-zero exit.
    #[must_use]
    pub const fn classify(result: &ExecutionResult) -> Self {
        if result.timed_out() {
            Self::TimedOut
        } else if result.maximum_output_exceeded() {
            Self::OutputExceeded
        } else if result.exit_status() != 0 {
            Self::Failed
        } else {
            Self::Succeeded
        }
    }

    /// Short label used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimedOut => "timeout",
            Self::OutputExceeded => "output_exceeded",
            Self::Failed => "error",
            Self::Succeeded => "success",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of engine run lifecycle events.
///
/// Both hooks default to no-ops so listeners only implement what they need.
pub trait ContainerListener: Send + Sync {
    /// Called once before the engine container starts.
    fn started(&self, _engine: &EngineIdentity, _details: &EngineDetails) {}

    /// Called once after the engine container finished or was stopped.
    fn finished(
        &self,
        _engine: &EngineIdentity,
        _details: &EngineDetails,
        _result: &ExecutionResult,
    ) {
    }
}

/// Ordered fan-out of lifecycle events.
#[derive(Default)]
pub struct ListenerDispatcher {
    listeners: Vec<Box<dyn ContainerListener>>,
}

impl fmt::Debug for ListenerDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerDispatcher {
    /// Creates a dispatcher with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener.
    pub fn register(&mut self, listener: impl ContainerListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Appends a listener, builder style.
    #[must_use]
    pub fn with_listener(mut self, listener: impl ContainerListener + 'static) -> Self {
        self.register(listener);
        self
    }

    /// Number of registered listeners.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl ContainerListener for ListenerDispatcher {
    fn started(&self, engine: &EngineIdentity, details: &EngineDetails) {
        for listener in &self.listeners {
            listener.started(engine, details);
        }
    }

    fn finished(&self, engine: &EngineIdentity, details: &EngineDetails, result: &ExecutionResult) {
        for listener in &self.listeners {
            listener.finished(engine, details, result);
        }
    }
}

#[cfg(test)]
mod tests;
