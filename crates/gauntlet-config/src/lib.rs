//! Shared configuration for the gauntlet engine orchestrator.
//!
//! [`Config`] is assembled by `ortho_config` from command-line flags,
//! `GAUNTLET_*` environment variables and an optional configuration file.
//! Every field is optional; the accessor methods resolve unset fields to the
//! values in [`defaults`], so callers never see a half-populated config.
//!
//! The [`project`] module reads the per-repository `.gauntlet.yml` file that
//! decides which engines are enabled and on which channel.

pub mod defaults;
mod logging;
pub mod project;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CHANNEL, DEFAULT_CONTAINER_MAX_OUTPUT_BYTES, DEFAULT_CONTAINER_TIMEOUT,
    DEFAULT_ENGINES, DEFAULT_ENGINES_MANIFEST, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONCURRENT_ENGINES,
    DEFAULT_PROJECT_CONFIG, DEFAULT_TERMINATION_GRACE, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use project::{EngineConfigEntry, ProjectConfig, ProjectConfigError};

/// Orchestrator configuration merged from flags, environment and file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GAUNTLET")]
pub struct Config {
    /// Tracing filter expression, e.g. `info` or `gauntlet_container=debug`.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Log output format.
    #[serde(default)]
    pub log_format: Option<LogFormat>,
    /// Path to the engine registry manifest.
    #[serde(default)]
    pub engines_manifest: Option<PathBuf>,
    /// Path to the project file listing enabled engines.
    #[serde(default)]
    pub project_config: Option<PathBuf>,
    /// Channel used for engine entries that omit one.
    #[serde(default)]
    pub default_channel: Option<String>,
    /// Wall-clock limit for one engine run, in seconds.
    #[serde(default)]
    pub container_timeout_secs: Option<u64>,
    /// Stdout byte ceiling for one engine run.
    #[serde(default)]
    pub container_max_output_bytes: Option<u64>,
    /// Seconds between SIGTERM and SIGKILL when stopping an engine.
    #[serde(default)]
    pub termination_grace_secs: Option<u64>,
    /// Upper bound on engines running at the same time.
    #[serde(default)]
    pub max_concurrent_engines: Option<usize>,
    /// Repository identifier attached to emitted metrics.
    #[serde(default)]
    pub repo_id: Option<String>,
}

impl Config {
    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Returns the log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Returns the registry manifest path.
    #[must_use]
    pub fn engines_manifest(&self) -> &Path {
        self.engines_manifest
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_ENGINES_MANIFEST))
    }

    /// Returns the project file path.
    #[must_use]
    pub fn project_config(&self) -> &Path {
        self.project_config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROJECT_CONFIG))
    }

    /// Returns the channel applied when an engine entry names none.
    #[must_use]
    pub fn default_channel(&self) -> &str {
        self.default_channel.as_deref().unwrap_or(DEFAULT_CHANNEL)
    }

    /// Returns the wall-clock limit for one engine run.
    #[must_use]
    pub fn container_timeout(&self) -> Duration {
        self.container_timeout_secs
            .map_or(DEFAULT_CONTAINER_TIMEOUT, Duration::from_secs)
    }

    /// Returns the stdout byte ceiling for one engine run.
    #[must_use]
    pub fn container_max_output_bytes(&self) -> u64 {
        self.container_max_output_bytes
            .unwrap_or(DEFAULT_CONTAINER_MAX_OUTPUT_BYTES)
    }

    /// Returns the SIGTERM to SIGKILL escalation window.
    #[must_use]
    pub fn termination_grace(&self) -> Duration {
        self.termination_grace_secs
            .map_or(DEFAULT_TERMINATION_GRACE, Duration::from_secs)
    }

    /// Returns the number of engines allowed to run concurrently.
    ///
    /// A configured value of zero is treated as one.
    #[must_use]
    pub fn max_concurrent_engines(&self) -> usize {
        self.max_concurrent_engines
            .unwrap_or(DEFAULT_MAX_CONCURRENT_ENGINES)
            .max(1)
    }

    /// Returns the repository identifier used to tag metrics, if any.
    #[must_use]
    pub fn repo_id(&self) -> Option<&str> {
        self.repo_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.engines_manifest(), Path::new("engines.yml"));
        assert_eq!(config.project_config(), Path::new(".gauntlet.yml"));
        assert_eq!(config.default_channel(), "stable");
        assert_eq!(config.container_timeout(), Duration::from_secs(900));
        assert_eq!(config.container_max_output_bytes(), 500_000_000);
        assert_eq!(config.termination_grace(), Duration::from_secs(10));
        assert_eq!(config.max_concurrent_engines(), 1);
        assert_eq!(config.repo_id(), None);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = Config {
            default_channel: Some(String::from("beta")),
            container_timeout_secs: Some(5),
            container_max_output_bytes: Some(1024),
            max_concurrent_engines: Some(4),
            repo_id: Some(String::from("repo-42")),
            ..Config::default()
        };
        assert_eq!(config.default_channel(), "beta");
        assert_eq!(config.container_timeout(), Duration::from_secs(5));
        assert_eq!(config.container_max_output_bytes(), 1024);
        assert_eq!(config.max_concurrent_engines(), 4);
        assert_eq!(config.repo_id(), Some("repo-42"));
    }

    #[test]
    fn zero_concurrency_is_clamped_to_one() {
        let config = Config {
            max_concurrent_engines: Some(0),
            ..Config::default()
        };
        assert_eq!(config.max_concurrent_engines(), 1);
    }

    #[test]
    fn blank_repo_id_is_ignored() {
        let config = Config {
            repo_id: Some(String::from("  ")),
            ..Config::default()
        };
        assert_eq!(config.repo_id(), None);
    }
}
