//! Default values applied when a configuration layer leaves a field unset.

use std::time::Duration;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Manifest consulted when no `engines_manifest` path is configured.
pub const DEFAULT_ENGINES_MANIFEST: &str = "engines.yml";

/// Project file consulted when no `project_config` path is configured.
pub const DEFAULT_PROJECT_CONFIG: &str = ".gauntlet.yml";

/// Channel applied to engine entries that do not name one.
pub const DEFAULT_CHANNEL: &str = "stable";

/// Wall-clock budget for a single engine container.
pub const DEFAULT_CONTAINER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Stdout ceiling for a single engine container.
pub const DEFAULT_CONTAINER_MAX_OUTPUT_BYTES: u64 = 500_000_000;

/// Time an engine gets to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(10);

/// Number of engine containers allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_ENGINES: usize = 1;

/// Engines enabled for every project unless the project file overrides them.
///
/// Each pair is `(engine name, channel)`.
pub const DEFAULT_ENGINES: &[(&str, &str)] = &[("structure", "stable"), ("duplication", "cronopio")];

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}
