//! Declarative description of how an engine container is started.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Memory ceiling applied to engine containers unless overridden.
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 1_024_000_000;

/// Unprivileged user engines run as inside the container.
pub const DEFAULT_CONTAINER_USER: &str = "9000:9000";

/// Network access policy applied to an engine container.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NetworkPolicy {
    /// Run without a network (`--net none`).
    #[default]
    Deny,
    /// Use the runtime's default network.
    Allow,
}

impl NetworkPolicy {
    /// Returns true when networking is denied.
    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Deny)
    }
}

/// A host path exposed inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    source: PathBuf,
    target: PathBuf,
    read_only: bool,
}

impl Mount {
    /// Host path.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path inside the container.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether the container may only read the mount.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// Everything the runtime needs to start one engine container besides the
/// image reference.
///
/// The defaults are restrictive: no network, an unprivileged user, and a
/// fixed memory ceiling. Mounts and environment must be granted explicitly.
///
/// ```
/// use gauntlet_container::InvocationSpec;
///
/// let spec = InvocationSpec::new("gauntlet-engines-structure-1")
///     .allow_read_path("/srv/repo", "/code")
///     .with_label("gauntlet.engine", "structure");
/// assert!(spec.network_policy().is_denied());
/// assert_eq!(spec.mounts().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    name: String,
    labels: BTreeMap<String, String>,
    mounts: Vec<Mount>,
    environment: BTreeMap<String, String>,
    memory_limit_bytes: Option<u64>,
    network: NetworkPolicy,
    user: Option<String>,
}

impl InvocationSpec {
    /// Creates a spec for a container with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            mounts: Vec::new(),
            environment: BTreeMap::new(),
            memory_limit_bytes: Some(DEFAULT_MEMORY_LIMIT_BYTES),
            network: NetworkPolicy::default(),
            user: Some(DEFAULT_CONTAINER_USER.to_owned()),
        }
    }

    /// Attaches a label to the container.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Mounts `source` read-only at `target`.
    #[must_use]
    pub fn allow_read_path(
        mut self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        self.mounts.push(Mount {
            source: source.into(),
            target: target.into(),
            read_only: true,
        });
        self
    }

    /// Mounts `source` read-write at `target`.
    #[must_use]
    pub fn allow_read_write_path(
        mut self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        self.mounts.push(Mount {
            source: source.into(),
            target: target.into(),
            read_only: false,
        });
        self
    }

    /// Sets an environment variable inside the container.
    #[must_use]
    pub fn with_environment_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Overrides the memory ceiling; `None` lets the runtime decide.
    #[must_use]
    pub const fn with_memory_limit(mut self, bytes: Option<u64>) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Overrides the container user; `None` keeps the image default.
    #[must_use]
    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Gives the container network access.
    #[must_use]
    pub const fn allow_networking(mut self) -> Self {
        self.network = NetworkPolicy::Allow;
        self
    }

    /// Container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels in key order.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Mounts in the order they were granted.
    #[must_use]
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Environment variables in key order.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Memory ceiling in bytes, if any.
    #[must_use]
    pub const fn memory_limit_bytes(&self) -> Option<u64> {
        self.memory_limit_bytes
    }

    /// Network policy.
    #[must_use]
    pub const fn network_policy(&self) -> NetworkPolicy {
        self.network
    }

    /// Container user, if overridden.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// Builds a unique container name for a run of `engine`.
///
/// Characters outside `[A-Za-z0-9_.-]` are replaced so the result is a valid
/// container name.
#[must_use]
pub fn container_name(engine: &str) -> String {
    let sanitised: String = engine
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("gauntlet-engines-{sanitised}-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spec_is_restrictive() {
        let spec = InvocationSpec::new("c");
        assert_eq!(spec.name(), "c");
        assert!(spec.network_policy().is_denied());
        assert_eq!(spec.memory_limit_bytes(), Some(DEFAULT_MEMORY_LIMIT_BYTES));
        assert_eq!(spec.user(), Some(DEFAULT_CONTAINER_USER));
        assert!(spec.mounts().is_empty());
        assert!(spec.environment().is_empty());
    }

    #[test]
    fn mounts_record_access_mode() {
        let spec = InvocationSpec::new("c")
            .allow_read_path("/src", "/code")
            .allow_read_write_path("/tmp/out", "/out");
        let modes: Vec<bool> = spec.mounts().iter().map(Mount::is_read_only).collect();
        assert_eq!(modes, [true, false]);
        assert_eq!(
            spec.mounts().first().map(Mount::target),
            Some(Path::new("/code"))
        );
    }

    #[test]
    fn container_names_are_unique_and_sanitised() {
        let first = container_name("eslint/beta");
        let second = container_name("eslint/beta");
        assert!(first.starts_with("gauntlet-engines-eslint-beta-"));
        assert_ne!(first, second);
    }
}
